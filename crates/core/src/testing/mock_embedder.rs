//! Mock embedder for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::call_log::CallLog;
use super::faults::Faults;
use crate::embedder::Embedder;
use crate::error::CollaboratorError;

/// Deterministic vectors derived from the text bytes.
#[derive(Debug)]
pub struct MockEmbedder {
    log: CallLog,
    faults: Faults,
    dimension: usize,
    /// Length of returned vectors; differs from `dimension` only when a
    /// test wants a mismatch.
    returned_len: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(log: CallLog, dimension: usize) -> Self {
        Self {
            log,
            faults: Faults::default(),
            dimension,
            returned_len: AtomicUsize::new(dimension),
        }
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Makes `embed` return vectors of `len` entries.
    pub fn set_returned_len(&self, len: usize) {
        self.returned_len.store(len, Ordering::SeqCst);
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn name(&self) -> &str {
        "mock"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        self.log.record("embed", text);
        self.faults.check("embed", text)?;

        let seed = text.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        let len = self.returned_len.load(Ordering::SeqCst);
        Ok((0..len)
            .map(|i| ((seed.wrapping_add(i as u32) % 1000) as f32) / 1000.0)
            .collect())
    }
}
