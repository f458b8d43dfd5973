//! Sidecar storage trait and error type.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use super::types::JobRecord;

/// Error type for sidecar operations.
#[derive(Debug, Error)]
pub enum SidecarError {
    /// Reading or writing the sidecar failed.
    #[error("sidecar I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sidecar exists but does not parse.
    #[error("corrupt sidecar at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl SidecarError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Durable per-job progress records.
///
/// `save` must be atomic with respect to process termination: after a crash
/// a reader observes either the previous record or the new one, never a mix.
#[async_trait]
pub trait SidecarStore: Send + Sync {
    /// Loads a job's record. `Ok(None)` when the job has no sidecar.
    async fn load(&self, job_id: &str) -> Result<Option<JobRecord>, SidecarError>;

    /// Atomically replaces a job's record.
    async fn save(&self, record: &JobRecord) -> Result<(), SidecarError>;

    /// Removes a job's sidecar. Missing sidecars are not an error.
    async fn delete(&self, job_id: &str) -> Result<(), SidecarError>;

    /// Every record that can be discovered, sorted by job id.
    async fn list(&self) -> Result<Vec<JobRecord>, SidecarError>;

    /// Working directory holding the job's sidecar and intermediates.
    fn job_dir(&self, job_id: &str) -> PathBuf;
}
