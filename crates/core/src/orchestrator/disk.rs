//! Disk budget policy.
//!
//! A job holds at most one heavy media file (audio or video) at a time.
//! Heavy files live in the job's `media/` directory, are admitted only right
//! before the step that consumes them and released right after that step's
//! output exists. Anything in `media/` the persisted record does not point
//! at is an orphan left by a crash or a failure and is swept.
//!
//! The `rtt_heavy_files_resident` gauge counts files held through a
//! [`DiskBudget`]. Whatever a budget still holds when it is dropped is taken
//! off the gauge, so failed, panicked and aborted jobs do not leak counts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use thiserror::Error;
use tracing::{debug, warn};

use crate::downloader::MediaKind;
use crate::job::JobRecord;
use crate::metrics;

/// Directory inside a job's work dir that holds heavy media.
pub const MEDIA_DIR: &str = "media";

/// Violations of the one-heavy-file rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiskBudgetError {
    /// A heavy file is already recorded for the job.
    #[error("job {job_id} already holds {path}")]
    AlreadyHolding { job_id: String, path: PathBuf },

    /// Local sources are read in place and never hold heavy files.
    #[error("job {job_id} reads a local file and cannot hold downloaded media")]
    LocalSource { job_id: String },

    /// Both audio and video are recorded at once.
    #[error("job {job_id} records both audio and video")]
    BothResident { job_id: String },
}

/// The disk budget of one job run.
#[derive(Debug)]
pub struct DiskBudget {
    media_dir: PathBuf,
    held: AtomicI64,
}

impl DiskBudget {
    pub fn for_job(job_dir: &Path) -> Self {
        Self {
            media_dir: job_dir.join(MEDIA_DIR),
            held: AtomicI64::new(0),
        }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Heavy files currently counted against this budget.
    pub fn held(&self) -> i64 {
        self.held.load(Ordering::Relaxed)
    }

    /// Takes over the heavy file a resumed record already points at.
    pub fn adopt(&self, record: &JobRecord) {
        let count = record.artifacts.heavy_paths().count() as i64;
        if count > 0 {
            self.add_held(count);
        }
    }

    fn add_held(&self, delta: i64) {
        self.held.fetch_add(delta, Ordering::Relaxed);
        metrics::HEAVY_FILES_RESIDENT.add(delta);
    }

    /// Checks the heavy-file invariants of a record.
    pub fn check(record: &JobRecord) -> Result<(), DiskBudgetError> {
        let audio = record.artifacts.audio_path.is_some();
        let video = record.artifacts.video_path.is_some();

        if (audio || video) && !record.source.is_remote() {
            return Err(DiskBudgetError::LocalSource {
                job_id: record.id.clone(),
            });
        }
        if audio && video {
            return Err(DiskBudgetError::BothResident {
                job_id: record.id.clone(),
            });
        }
        Ok(())
    }

    /// Admits a new heavy file for `record`, returning the directory it must
    /// be written to.
    pub fn admit(&self, record: &JobRecord, kind: MediaKind) -> Result<&Path, DiskBudgetError> {
        if !record.source.is_remote() {
            return Err(DiskBudgetError::LocalSource {
                job_id: record.id.clone(),
            });
        }
        if let Some(path) = record.artifacts.heavy_paths().next() {
            return Err(DiskBudgetError::AlreadyHolding {
                job_id: record.id.clone(),
                path: path.clone(),
            });
        }
        debug!(job_id = %record.id, kind = %kind, "Heavy file admitted");
        Ok(&self.media_dir)
    }

    /// Records a fetched heavy file on the record.
    pub fn hold(
        &self,
        record: &mut JobRecord,
        kind: MediaKind,
        path: PathBuf,
    ) -> Result<(), DiskBudgetError> {
        self.admit(record, kind)?;
        match kind {
            MediaKind::Audio => record.artifacts.audio_path = Some(path),
            MediaKind::Video => record.artifacts.video_path = Some(path),
        }
        self.add_held(1);
        Ok(())
    }

    /// Clears a heavy file from the record and returns its path. The caller
    /// deletes it with [`DiskBudget::discard`] once the cleared record is
    /// durable (or immediately, when the file was never persisted).
    pub fn release(&self, record: &mut JobRecord, kind: MediaKind) -> Option<PathBuf> {
        let released = match kind {
            MediaKind::Audio => record.artifacts.audio_path.take(),
            MediaKind::Video => record.artifacts.video_path.take(),
        };
        if released.is_some() && self.held() > 0 {
            self.add_held(-1);
        }
        released
    }

    /// Deletes a released heavy file. Failures are logged, never returned.
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Heavy file deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete heavy file"),
        }
    }

    /// Deletes every file in the media directory that `record` does not
    /// reference. Returns the removed paths.
    pub async fn sweep_orphans(&self, record: &JobRecord) -> Vec<PathBuf> {
        let mut entries = match tokio::fs::read_dir(&self.media_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.media_dir.display(), error = %e, "Cannot scan media dir");
                return Vec::new();
            }
        };

        let keep: Vec<&PathBuf> = record.artifacts.heavy_paths().collect();
        let mut removed = Vec::new();

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(path = %self.media_dir.display(), error = %e, "Cannot scan media dir");
                    break;
                }
            };
            let path = entry.path();
            if keep.iter().any(|k| k.as_path() == path) {
                continue;
            }

            let result = match entry.file_type().await {
                Ok(t) if t.is_dir() => tokio::fs::remove_dir_all(&path).await,
                _ => tokio::fs::remove_file(&path).await,
            };
            match result {
                Ok(()) => {
                    warn!(job_id = %record.id, path = %path.display(), "Removed orphaned media");
                    removed.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove orphaned media"),
            }
        }

        removed
    }
}

impl Drop for DiskBudget {
    fn drop(&mut self) {
        let held = *self.held.get_mut();
        if held > 0 {
            metrics::HEAVY_FILES_RESIDENT.sub(held);
        }
    }
}
