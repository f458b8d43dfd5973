//! Mock packager for testing.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::call_log::{lock, CallLog};
use super::faults::Faults;
use crate::error::CollaboratorError;
use crate::job::Segment;
use crate::packager::{JobMetadata, Packager};

/// What one `package` call received.
#[derive(Debug, Clone)]
pub struct PackagedJob {
    pub metadata: JobMetadata,
    pub segments: Vec<Segment>,
    /// Frame file names present in `frames_dir` at packaging time.
    pub frame_files: Vec<String>,
    pub output: PathBuf,
}

/// Writes the metadata and segments as JSON to the output path.
#[derive(Debug)]
pub struct MockPackager {
    log: CallLog,
    faults: Faults,
    packaged: Mutex<Vec<PackagedJob>>,
}

impl MockPackager {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            faults: Faults::default(),
            packaged: Mutex::new(Vec::new()),
        }
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    pub fn packaged(&self) -> Vec<PackagedJob> {
        lock(&self.packaged).clone()
    }
}

async fn list_frames(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    names
}

#[async_trait]
impl Packager for MockPackager {
    fn name(&self) -> &str {
        "mock"
    }

    async fn package(
        &self,
        metadata: &JobMetadata,
        segments: &[Segment],
        frames_dir: Option<&Path>,
        output: &Path,
    ) -> Result<PathBuf, CollaboratorError> {
        self.log.record("package", metadata.job_id.clone());
        self.faults.check("package", &metadata.job_id)?;

        let frame_files = match frames_dir {
            Some(dir) => list_frames(dir).await,
            None => Vec::new(),
        };

        let body = json!({ "job": metadata, "segments": segments });
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CollaboratorError::disk(parent, e))?;
        }
        tokio::fs::write(output, body.to_string())
            .await
            .map_err(|e| CollaboratorError::disk(output, e))?;

        lock(&self.packaged).push(PackagedJob {
            metadata: metadata.clone(),
            segments: segments.to_vec(),
            frame_files,
            output: output.to_path_buf(),
        });
        Ok(output.to_path_buf())
    }
}
