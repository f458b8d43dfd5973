//! Job orchestrator: moves one job through the pipeline stages.
//!
//! Every transition is persisted to the job's sidecar before the next step
//! starts, so a killed process resumes at the last completed stage. Heavy
//! media is governed by [`DiskBudget`]; collaborator calls go through
//! [`with_retry`].

mod config;
mod disk;
mod retry;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use disk::{DiskBudget, DiskBudgetError, MEDIA_DIR};
pub use retry::{with_retry, Exhausted, RetryPolicy};
pub use runner::{JobOrchestrator, EMBEDDINGS_FILE, ENRICHED_FILE, FRAMES_DIR, TRANSCRIPT_FILE};
pub use types::{JobOutcome, OrchestratorError};
