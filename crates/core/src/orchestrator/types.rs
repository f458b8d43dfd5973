//! Types for the job orchestrator.

use std::path::PathBuf;

use thiserror::Error;

use super::disk::DiskBudgetError;
use super::retry::Exhausted;
use crate::error::{CollaboratorError, ErrorKind};
use crate::job::{JobFailure, JobRecordError, SidecarError};

/// Errors that can stop a job.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A collaborator call failed permanently or ran out of retries.
    #[error("{capability} failed after {attempts} attempt(s): {source}")]
    Collaborator {
        capability: &'static str,
        attempts: u32,
        #[source]
        source: CollaboratorError,
    },

    /// The input cannot be processed (no speech, missing local file, ...).
    #[error("invalid input: {0}")]
    FatalInput(String),

    /// The sidecar disagrees with what is on disk.
    #[error("resume conflict: {0}")]
    ResumeConflict(String),

    /// Sidecar or segment table I/O failed.
    #[error("sidecar error: {0}")]
    Sidecar(#[from] SidecarError),

    /// Stage regression attempted.
    #[error(transparent)]
    Record(#[from] JobRecordError),

    /// Heavy-file invariant violated.
    #[error(transparent)]
    DiskBudget(#[from] DiskBudgetError),
}

impl OrchestratorError {
    pub(crate) fn collaborator(capability: &'static str, exhausted: Exhausted) -> Self {
        Self::Collaborator {
            capability,
            attempts: exhausted.attempts,
            source: exhausted.error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Collaborator { source, .. } => source.kind(),
            Self::FatalInput(_) => ErrorKind::FatalInput,
            Self::ResumeConflict(_) => ErrorKind::ResumeConflict,
            Self::Sidecar(SidecarError::Corrupt { .. }) => ErrorKind::ResumeConflict,
            Self::Sidecar(SidecarError::Io { .. }) => ErrorKind::Disk,
            Self::Record(_) => ErrorKind::ResumeConflict,
            Self::DiskBudget(_) => ErrorKind::ResumeConflict,
        }
    }

    /// Number of attempts made by the failing operation.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Collaborator { attempts, .. } => *attempts,
            _ => 1,
        }
    }

    /// Whether running the job again later may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientService
    }
}

/// How a single job run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The job was driven to `Ready` in this run.
    Packaged { artifact: PathBuf },
    /// The artifact already existed; no collaborator was called.
    AlreadyPackaged { artifact: PathBuf },
    /// The job stopped; its sidecar keeps the last good stage.
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, JobOutcome::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Packaged { .. } => "packaged",
            JobOutcome::AlreadyPackaged { .. } => "skipped",
            JobOutcome::Failed(_) => "failed",
        }
    }
}
