//! Batch scheduler: runs many jobs with bounded concurrency.
//!
//! Each job gets its own orchestrator run. Failures are isolated, recorded
//! in the job's sidecar and appended to the failure log. A shutdown handle
//! stops admission while in-flight jobs finish.

mod config;
mod failure_log;
mod runner;
mod types;

pub use config::SchedulerConfig;
pub use failure_log::{FailureEntry, FailureLog};
pub use runner::Scheduler;
pub use types::{BatchReport, ShutdownHandle};
