//! Input resolution: files, directories, manifests and URLs into job specs.

mod ids;
mod manifest;
mod resolve;

use std::path::PathBuf;

use thiserror::Error;

use crate::error::CollaboratorError;

pub use ids::{local_job_id, remote_job_id, sanitize, youtube_channel_handle, youtube_video_id};
pub use manifest::{parse_manifest, read_manifest, ManifestEntry};
pub use resolve::{classify, resolve_inputs, InputKind, SourceDefaults, VIDEO_EXTENSIONS};

/// Errors raised while resolving inputs.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot list channel {url}: {source}")]
    Channel {
        url: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("unsupported source: {0:?}")]
    Unsupported(String),

    #[error("no jobs found in the given inputs")]
    NoJobs,
}
