//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;

/// Configuration for the job orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Run the enricher. When disabled, enriched text equals the raw
    /// transcript and the stage still advances.
    #[serde(default = "default_enrich")]
    pub enrich: bool,

    /// Maximum in-flight enrich/embed calls per job.
    /// Independent from (and usually larger than) the job concurrency.
    #[serde(default = "default_segment_concurrency")]
    pub segment_concurrency: usize,

    /// Retry policy for transient collaborator failures.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_enrich() -> bool {
    true
}

fn default_segment_concurrency() -> usize {
    8
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enrich: default_enrich(),
            segment_concurrency: default_segment_concurrency(),
            retry: RetryPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Enables or disables enrichment.
    pub fn with_enrich(mut self, enrich: bool) -> Self {
        self.enrich = enrich;
        self
    }

    /// Sets the per-job segment fan-out.
    pub fn with_segment_concurrency(mut self, n: usize) -> Self {
        self.segment_concurrency = n;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
