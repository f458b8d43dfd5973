//! Trait definitions for the packager module.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::types::JobMetadata;
use crate::error::CollaboratorError;
use crate::job::Segment;

/// Bundles a finished job into its portable artifact.
#[async_trait]
pub trait Packager: Send + Sync {
    /// Returns the name of this packager implementation.
    fn name(&self) -> &str;

    /// Writes the artifact to `output` and returns its path.
    ///
    /// Segment `frame_path`s are relative to `frames_dir`'s parent. The
    /// artifact is either fully written or absent; failures are `Disk` errors.
    async fn package(
        &self,
        metadata: &JobMetadata,
        segments: &[Segment],
        frames_dir: Option<&Path>,
        output: &Path,
    ) -> Result<PathBuf, CollaboratorError>;

    /// Validates that the packager is properly configured and ready.
    async fn validate(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}
