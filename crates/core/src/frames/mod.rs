//! Frame extraction module.
//!
//! One still per segment, taken at the segment's start timestamp.

mod config;
mod ffmpeg;
mod traits;

pub use config::FramesConfig;
pub use ffmpeg::FfmpegFrameExtractor;
pub use traits::{frame_file_name, FrameExtractor};
