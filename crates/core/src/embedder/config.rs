//! Embedder configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the Ollama embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// Ollama server URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Embedding model.
    #[serde(default = "default_model")]
    pub model: String,

    /// Expected vector length for the model.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_dimension() -> usize {
    768
}

fn default_timeout() -> u64 {
    60
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_model(),
            dimension: default_dimension(),
            timeout_secs: default_timeout(),
        }
    }
}
