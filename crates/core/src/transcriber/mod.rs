//! Transcriber module for turning audio into timed text.

mod assemblyai;
mod config;
mod traits;
mod whisper;

pub use assemblyai::AssemblyAiTranscriber;
pub use config::{AssemblyAiConfig, TranscriberBackend, TranscriberConfig, WhisperConfig};
pub use traits::{TranscriptSpan, Transcriber};
pub use whisper::WhisperCliTranscriber;
