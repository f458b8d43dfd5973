//! Configuration for the transcriber module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Available transcription backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriberBackend {
    /// Local whisper CLI.
    #[default]
    Whisper,
    /// AssemblyAI cloud API.
    AssemblyAi,
}

/// Configuration for transcription.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriberConfig {
    #[serde(default)]
    pub backend: TranscriberBackend,

    #[serde(default)]
    pub whisper: WhisperConfig,

    #[serde(default)]
    pub assembly_ai: AssemblyAiConfig,
}

/// Local whisper CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    /// Path to the whisper binary.
    #[serde(default = "default_whisper_path")]
    pub binary: PathBuf,

    /// Model name (tiny, base, small, medium, large-v3, ...).
    #[serde(default = "default_whisper_model")]
    pub model: String,

    /// Spoken language hint.
    #[serde(default = "default_language")]
    pub language: String,

    /// Timeout for a single transcription in seconds.
    #[serde(default = "default_whisper_timeout")]
    pub timeout_secs: u64,
}

fn default_whisper_path() -> PathBuf {
    PathBuf::from("whisper")
}

fn default_whisper_model() -> String {
    "large-v3".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_whisper_timeout() -> u64 {
    4 * 3600 // 4 hours
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            binary: default_whisper_path(),
            model: default_whisper_model(),
            language: default_language(),
            timeout_secs: default_whisper_timeout(),
        }
    }
}

/// AssemblyAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyAiConfig {
    /// API key. Falls back to `ASSEMBLYAI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_assembly_base")]
    pub api_base: String,

    /// How often to poll a pending transcript (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Give up on a transcript after this many seconds.
    #[serde(default = "default_assembly_timeout")]
    pub timeout_secs: u64,
}

fn default_assembly_base() -> String {
    "https://api.assemblyai.com".to_string()
}

fn default_poll_interval() -> u64 {
    3000 // 3 seconds
}

fn default_assembly_timeout() -> u64 {
    2 * 3600 // 2 hours
}

impl Default for AssemblyAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_assembly_base(),
            poll_interval_ms: default_poll_interval(),
            timeout_secs: default_assembly_timeout(),
        }
    }
}
