//! Configuration for the downloader module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Available download backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloaderBackend {
    /// yt-dlp subprocess; handles YouTube and most media pages.
    #[default]
    YtDlp,
    /// Plain HTTP GET of direct media URLs.
    Http,
}

/// Configuration for media downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    #[serde(default)]
    pub backend: DownloaderBackend,

    /// Path to the yt-dlp binary.
    #[serde(default = "default_yt_dlp_path")]
    pub yt_dlp_path: PathBuf,

    /// yt-dlp format selector for audio-only downloads.
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// yt-dlp format selector for full video downloads.
    #[serde(default = "default_video_format")]
    pub video_format: String,

    /// Timeout for a single download in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Additional yt-dlp arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_yt_dlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_audio_format() -> String {
    "bestaudio".to_string()
}

fn default_video_format() -> String {
    "bestvideo[height<=720]+bestaudio/best[height<=720]/best".to_string()
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            backend: DownloaderBackend::default(),
            yt_dlp_path: default_yt_dlp_path(),
            audio_format: default_audio_format(),
            video_format: default_video_format(),
            timeout_secs: default_timeout(),
            extra_args: Vec::new(),
        }
    }
}
