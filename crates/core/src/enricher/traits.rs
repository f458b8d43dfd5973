//! Trait definitions for the enricher module.

use async_trait::async_trait;

use crate::error::CollaboratorError;

/// Rewrites a transcript segment into a richer, more searchable text.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Returns the name of this enricher implementation.
    fn name(&self) -> &str;

    /// Enriches `text`. `context` is free text describing the video and may be empty.
    async fn enrich(&self, text: &str, context: &str) -> Result<String, CollaboratorError>;

    /// Validates that the enricher is properly configured and ready.
    async fn validate(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}
