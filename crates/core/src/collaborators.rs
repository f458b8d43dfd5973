//! The set of collaborator implementations a pipeline runs with.

use std::sync::Arc;

use crate::config::Config;
use crate::downloader::{
    ChannelLister, Downloader, DownloaderBackend, HttpDownloader, YtDlpDownloader,
};
use crate::embedder::{Embedder, OllamaEmbedder};
use crate::enricher::{AnthropicEnricher, Enricher};
use crate::error::CollaboratorError;
use crate::frames::{FfmpegFrameExtractor, FrameExtractor};
use crate::packager::{Packager, ZipPackager};
use crate::transcriber::{
    AssemblyAiTranscriber, Transcriber, TranscriberBackend, WhisperCliTranscriber,
};

/// One implementation per capability. The orchestrator only sees these traits.
#[derive(Clone)]
pub struct Collaborators {
    pub downloader: Arc<dyn Downloader>,
    pub transcriber: Arc<dyn Transcriber>,
    pub enricher: Arc<dyn Enricher>,
    pub embedder: Arc<dyn Embedder>,
    pub frame_extractor: Arc<dyn FrameExtractor>,
    pub packager: Arc<dyn Packager>,
}

/// Result of a single preflight check.
#[derive(Debug)]
pub struct PreflightCheck {
    pub capability: &'static str,
    pub implementation: String,
    pub result: Result<(), CollaboratorError>,
}

impl Collaborators {
    /// Runs every collaborator's `validate()`.
    ///
    /// The enricher is skipped when `enrich` is false.
    pub async fn preflight(&self, enrich: bool) -> Vec<PreflightCheck> {
        let mut checks = vec![
            PreflightCheck {
                capability: "downloader",
                implementation: self.downloader.name().to_string(),
                result: self.downloader.validate().await,
            },
            PreflightCheck {
                capability: "transcriber",
                implementation: self.transcriber.name().to_string(),
                result: self.transcriber.validate().await,
            },
        ];
        if enrich {
            checks.push(PreflightCheck {
                capability: "enricher",
                implementation: self.enricher.name().to_string(),
                result: self.enricher.validate().await,
            });
        }
        checks.extend([
            PreflightCheck {
                capability: "embedder",
                implementation: self.embedder.name().to_string(),
                result: self.embedder.validate().await,
            },
            PreflightCheck {
                capability: "frame_extractor",
                implementation: self.frame_extractor.name().to_string(),
                result: self.frame_extractor.validate().await,
            },
            PreflightCheck {
                capability: "packager",
                implementation: self.packager.name().to_string(),
                result: self.packager.validate().await,
            },
        ]);
        checks
    }
}

/// Builds the collaborators selected by `config`.
///
/// Missing API keys do not fail here; `validate()` reports them, so that
/// commands which never call the service (like `status`) still work.
pub fn build_collaborators(config: &Config) -> Collaborators {
    let downloader: Arc<dyn Downloader> = match config.downloader.backend {
        DownloaderBackend::YtDlp => Arc::new(YtDlpDownloader::new(config.downloader.clone())),
        DownloaderBackend::Http => Arc::new(HttpDownloader::new(&config.downloader)),
    };

    let transcriber: Arc<dyn Transcriber> = match config.transcriber.backend {
        TranscriberBackend::Whisper => Arc::new(WhisperCliTranscriber::new(
            config.transcriber.whisper.clone(),
        )),
        TranscriberBackend::AssemblyAi => {
            let api_key = config
                .transcriber
                .assembly_ai
                .api_key
                .clone()
                .unwrap_or_default();
            Arc::new(AssemblyAiTranscriber::new(
                api_key,
                &config.transcriber.assembly_ai,
            ))
        }
    };

    let enricher = Arc::new(AnthropicEnricher::new(
        config.enricher.api_key.clone().unwrap_or_default(),
        &config.enricher,
    ));

    Collaborators {
        downloader,
        transcriber,
        enricher,
        embedder: Arc::new(OllamaEmbedder::new(&config.embedder)),
        frame_extractor: Arc::new(FfmpegFrameExtractor::new(config.frames.clone())),
        packager: Arc::new(ZipPackager::new(config.packager.clone())),
    }
}

/// Builds the channel lister used to expand channel URLs.
pub fn build_channel_lister(config: &Config) -> Arc<dyn ChannelLister> {
    Arc::new(YtDlpDownloader::new(config.downloader.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default_collaborators() {
        let collaborators = build_collaborators(&Config::default());
        assert_eq!(collaborators.downloader.name(), "yt-dlp");
        assert_eq!(collaborators.transcriber.name(), "whisper");
        assert_eq!(collaborators.enricher.name(), "anthropic");
        assert_eq!(collaborators.embedder.name(), "ollama");
        assert_eq!(collaborators.embedder.dimension(), 768);
        assert_eq!(collaborators.frame_extractor.name(), "ffmpeg");
        assert_eq!(collaborators.packager.name(), "zip");
    }

    #[test]
    fn test_build_cloud_and_http_backends() {
        let mut config = Config::default();
        config.downloader.backend = DownloaderBackend::Http;
        config.transcriber.backend = TranscriberBackend::AssemblyAi;
        config.transcriber.assembly_ai.api_key = Some("aai".to_string());

        let collaborators = build_collaborators(&config);
        assert_eq!(collaborators.downloader.name(), "http");
        assert_eq!(collaborators.transcriber.name(), "assemblyai");
    }
}
