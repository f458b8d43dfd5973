//! Resumable ingestion pipeline turning videos into searchable transcript
//! archives.
//!
//! A [`Scheduler`] runs batches of [`JobSpec`]s through a [`JobOrchestrator`],
//! which calls the [`Collaborators`] stage by stage and persists progress in
//! a per-job sidecar.

pub mod collaborators;
pub mod config;
pub mod downloader;
pub mod embedder;
pub mod enricher;
pub mod error;
pub mod frames;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod packager;
pub mod scheduler;
pub mod source;
pub mod testing;
pub mod transcriber;

pub use collaborators::{build_channel_lister, build_collaborators, Collaborators, PreflightCheck};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError,
};
pub use error::{CollaboratorError, ErrorKind};
pub use job::{FsSidecarStore, JobFailure, JobRecord, JobSource, JobSpec, SidecarStore, Stage};
pub use orchestrator::{JobOrchestrator, JobOutcome, OrchestratorConfig, OrchestratorError, RetryPolicy};
pub use scheduler::{BatchReport, Scheduler, SchedulerConfig, ShutdownHandle};
pub use source::{resolve_inputs, SourceDefaults, SourceError};
