//! Sidecar store that keeps a history of every save.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use super::call_log::lock;
use crate::job::{FsSidecarStore, JobRecord, SidecarError, SidecarStore, Stage};

/// An [`FsSidecarStore`] that records each saved record.
///
/// Tests use the history to check that transitions were persisted one at a
/// time and in order, and [`RecordingSidecarStore::wait_for_stage`] to
/// synchronize with a running job.
#[derive(Debug)]
pub struct RecordingSidecarStore {
    inner: FsSidecarStore,
    saved: Mutex<Vec<JobRecord>>,
    version: watch::Sender<u64>,
}

impl RecordingSidecarStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: FsSidecarStore::new(root),
            saved: Mutex::new(Vec::new()),
            version,
        }
    }

    pub fn root(&self) -> &Path {
        self.inner.root()
    }

    /// Every record saved for `job_id`, oldest first.
    pub fn history(&self, job_id: &str) -> Vec<JobRecord> {
        lock(&self.saved)
            .iter()
            .filter(|r| r.id == job_id)
            .cloned()
            .collect()
    }

    /// Stages of the saved records for `job_id`, oldest first.
    pub fn saved_stages(&self, job_id: &str) -> Vec<Stage> {
        self.history(job_id).iter().map(|r| r.stage).collect()
    }

    pub fn save_count(&self) -> usize {
        lock(&self.saved).len()
    }

    /// Waits until a record at `stage` or later has been saved for `job_id`.
    pub async fn wait_for_stage(&self, job_id: &str, stage: Stage) {
        let mut rx = self.version.subscribe();
        loop {
            let reached = lock(&self.saved)
                .iter()
                .any(|r| r.id == job_id && r.stage >= stage);
            if reached {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[async_trait]
impl SidecarStore for RecordingSidecarStore {
    async fn load(&self, job_id: &str) -> Result<Option<JobRecord>, SidecarError> {
        self.inner.load(job_id).await
    }

    async fn save(&self, record: &JobRecord) -> Result<(), SidecarError> {
        self.inner.save(record).await?;
        lock(&self.saved).push(record.clone());
        self.version.send_modify(|v| *v += 1);
        Ok(())
    }

    async fn delete(&self, job_id: &str) -> Result<(), SidecarError> {
        self.inner.delete(job_id).await
    }

    async fn list(&self) -> Result<Vec<JobRecord>, SidecarError> {
        self.inner.list().await
    }

    fn job_dir(&self, job_id: &str) -> PathBuf {
        self.inner.job_dir(job_id)
    }
}
