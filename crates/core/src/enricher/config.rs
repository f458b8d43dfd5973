//! Enricher configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the LLM enricher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnricherConfig {
    /// Anthropic API key. Falls back to `ANTHROPIC_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens for one enriched segment.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API base URL (for proxies).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "claude-haiku-4-5".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_base: default_api_base(),
            timeout_secs: default_timeout(),
        }
    }
}
