//! Trait definitions for the transcriber module.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

/// One timed span of recognized speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSpan {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

impl TranscriptSpan {
    pub fn new(start_seconds: f64, end_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: text.into(),
        }
    }
}

/// Turns a media file into an ordered sequence of transcript spans.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Returns the name of this transcriber implementation.
    fn name(&self) -> &str;

    /// Transcribes the media at `media_path`. Spans are ordered by start time.
    async fn transcribe(&self, media_path: &Path) -> Result<Vec<TranscriptSpan>, CollaboratorError>;

    /// Validates that the transcriber is properly configured and ready.
    async fn validate(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}
