//! Error taxonomy shared by every collaborator.
//!
//! Collaborators (downloader, transcriber, enricher, embedder, frame extractor,
//! packager) all report failures through [`CollaboratorError`], so the
//! orchestrator can decide between retrying, failing fast, and recording a
//! disk problem without knowing which implementation produced the error.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failure, persisted in the job's sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network or service error; retried with backoff.
    TransientService,
    /// Corrupt, unsupported or unreachable input; never retried.
    FatalInput,
    /// I/O failure while writing artifacts or cleaning up.
    Disk,
    /// The sidecar disagrees with what is on disk.
    ResumeConflict,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientService => "transient_service",
            ErrorKind::FatalInput => "fatal_input",
            ErrorKind::Disk => "disk",
            ErrorKind::ResumeConflict => "resume_conflict",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by collaborator implementations.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Retryable service failure (timeouts, 5xx, rate limits, dropped connections).
    #[error("{service} unavailable: {message}")]
    TransientService { service: String, message: String },

    /// The input cannot be processed no matter how often we try.
    #[error("invalid input: {message}")]
    FatalInput { message: String },

    /// Failed to write or remove a file.
    #[error("disk error at {path}: {source}")]
    Disk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CollaboratorError {
    pub fn transient(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::FatalInput {
            message: message.into(),
        }
    }

    pub fn disk(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Disk {
            path: path.into(),
            source,
        }
    }

    /// Classifies a `reqwest` failure. Connection problems, timeouts, 429 and
    /// 5xx responses are transient; every other status is fatal.
    pub fn from_http(service: &str, err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 429 || status.is_server_error() => {
                Self::transient(service, err.to_string())
            }
            Some(status) => Self::fatal(format!("{} returned {}: {}", service, status, err)),
            None => Self::transient(service, err.to_string()),
        }
    }

    /// Classifies an HTTP status returned with a body we already read.
    pub fn from_status(service: &str, status: u16, body: &str) -> Self {
        if status == 429 || (500..600).contains(&status) {
            Self::transient(service, format!("HTTP {}: {}", status, body))
        } else {
            Self::fatal(format!("{} returned HTTP {}: {}", service, status, body))
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransientService { .. } => ErrorKind::TransientService,
            Self::FatalInput { .. } => ErrorKind::FatalInput,
            Self::Disk { .. } => ErrorKind::Disk,
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientService { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_retryable() {
        let err = CollaboratorError::transient("ollama", "connection refused");
        assert_eq!(err.kind(), ErrorKind::TransientService);
        assert!(err.is_retryable());

        let err = CollaboratorError::fatal("corrupt media");
        assert_eq!(err.kind(), ErrorKind::FatalInput);
        assert!(!err.is_retryable());

        let err = CollaboratorError::disk(
            "/tmp/x.rtt",
            std::io::Error::new(std::io::ErrorKind::Other, "full"),
        );
        assert_eq!(err.kind(), ErrorKind::Disk);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_status_classification() {
        assert!(CollaboratorError::from_status("anthropic", 529, "overloaded").is_retryable());
        assert!(CollaboratorError::from_status("anthropic", 429, "slow down").is_retryable());
        assert!(!CollaboratorError::from_status("anthropic", 400, "bad request").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = CollaboratorError::transient("assemblyai", "timeout");
        assert_eq!(err.to_string(), "assemblyai unavailable: timeout");
        assert_eq!(ErrorKind::ResumeConflict.to_string(), "resume_conflict");
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::FatalInput).unwrap();
        assert_eq!(json, "\"fatal_input\"");
    }
}
