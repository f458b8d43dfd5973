//! Trait definitions for the embedder module.

use async_trait::async_trait;

use crate::error::CollaboratorError;

/// Computes fixed-dimension vectors for text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the name of this embedder implementation.
    fn name(&self) -> &str;

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError>;

    /// Validates that the embedder is properly configured and ready.
    async fn validate(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}
