//! Downloader module for fetching remote media.
//!
//! Remote jobs are downloaded twice: an audio-only copy for transcription,
//! and later the full video for frame extraction. The orchestrator decides
//! when each happens; implementations only fetch into the directory they
//! are given.

mod config;
mod http;
mod traits;
mod ytdlp;

pub use config::{DownloaderBackend, DownloaderConfig};
pub use http::HttpDownloader;
pub use traits::{ChannelEntry, ChannelLister, Downloader, MediaKind};
pub use ytdlp::YtDlpDownloader;
