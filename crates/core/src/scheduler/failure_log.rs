//! Append-only JSON-lines log of failed jobs.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::ErrorKind;
use crate::job::{JobFailure, JobSpec, Stage};

/// One line of the failure log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub job_id: String,
    pub source: String,
    pub title: String,
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
    pub attempt_count: u32,
    pub at: DateTime<Utc>,
}

impl FailureEntry {
    pub fn new(spec: &JobSpec, failure: &JobFailure) -> Self {
        Self {
            job_id: spec.id.clone(),
            source: spec.source.locator(),
            title: spec.title.clone(),
            stage: failure.stage,
            kind: failure.kind,
            message: failure.message.clone(),
            attempt_count: failure.attempt_count,
            at: failure.at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry, creating the file and its directory if needed.
    pub async fn append(&self, entry: &FailureEntry) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await
    }
}
