//! Configuration for the frame extractor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the FFmpeg-based frame extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramesConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Maximum ffmpeg processes per job.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// JPEG quality passed to `-q:v` (2 is best, 31 worst).
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Timeout for a single frame in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_max_parallel() -> usize {
    4
}

fn default_quality() -> u8 {
    2
}

fn default_timeout() -> u64 {
    60
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            max_parallel: default_max_parallel(),
            quality: default_quality(),
            timeout_secs: default_timeout(),
        }
    }
}
