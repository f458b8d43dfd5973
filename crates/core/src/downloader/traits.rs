//! Trait definitions for the downloader module.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::job::JobSource;

/// Which representation of a remote source to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Audio only, enough for transcription.
    Audio,
    /// Full video, needed for frame extraction.
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetches remote media into a job's media directory.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Returns the name of this downloader implementation.
    fn name(&self) -> &str;

    /// Downloads `kind` of `source` into `dest_dir` and returns the file path.
    ///
    /// The returned file must live inside `dest_dir`.
    async fn fetch(
        &self,
        source: &JobSource,
        kind: MediaKind,
        dest_dir: &Path,
    ) -> Result<PathBuf, CollaboratorError>;

    /// Validates that the downloader is properly configured and ready.
    async fn validate(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// One video found on a channel page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
}

/// Enumerates the videos of a channel.
#[async_trait]
pub trait ChannelLister: Send + Sync {
    async fn list_channel(&self, channel_url: &str) -> Result<Vec<ChannelEntry>, CollaboratorError>;
}
