//! Trait definitions for the frame extractor module.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::CollaboratorError;

/// Pulls still frames out of a video.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Returns the name of this extractor implementation.
    fn name(&self) -> &str;

    /// Extracts one JPEG per timestamp (milliseconds) into `out_dir`.
    ///
    /// Timestamps that could not be decoded are absent from the returned map.
    /// An unreadable input fails the whole call with `FatalInput`.
    async fn extract(
        &self,
        media_path: &Path,
        timestamps_ms: &[u64],
        out_dir: &Path,
    ) -> Result<BTreeMap<u64, PathBuf>, CollaboratorError>;

    /// Validates that the extractor is properly configured and ready.
    async fn validate(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// File name used for the frame at `timestamp_ms`.
pub fn frame_file_name(timestamp_ms: u64) -> String {
    format!("{:09}.jpg", timestamp_ms)
}
