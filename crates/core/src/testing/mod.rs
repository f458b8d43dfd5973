//! Testing utilities and mock collaborators.
//!
//! Every mock records its calls into a shared [`CallLog`], so tests can
//! assert the global order of collaborator calls across a job or a batch.
//!
//! # Example
//!
//! ```rust,ignore
//! use rtt_core::testing::{FailureMode, MockCollaborators, RecordingSidecarStore};
//!
//! let mocks = MockCollaborators::new();
//! mocks.transcriber.faults().fail_matching("job-b", FailureMode::Fatal);
//!
//! let orchestrator = JobOrchestrator::new(config, out_dir, store, mocks.collaborators());
//! // ...
//! assert_eq!(mocks.log.count("package"), 2);
//! ```

mod call_log;
mod faults;
mod mock_downloader;
mod mock_embedder;
mod mock_enricher;
mod mock_frame_extractor;
mod mock_packager;
mod mock_transcriber;
mod recording_store;

use std::sync::Arc;

pub use call_log::{Call, CallLog};
pub use faults::{FailureMode, Faults};
pub use mock_downloader::MockDownloader;
pub use mock_embedder::MockEmbedder;
pub use mock_enricher::MockEnricher;
pub use mock_frame_extractor::MockFrameExtractor;
pub use mock_packager::{MockPackager, PackagedJob};
pub use mock_transcriber::{default_spans, MockTranscriber};
pub use recording_store::RecordingSidecarStore;

use crate::collaborators::Collaborators;

/// Dimension of [`MockEmbedder`] vectors built by [`MockCollaborators::new`].
pub const MOCK_DIMENSION: usize = 8;

/// One mock per capability, all sharing a call log.
#[derive(Debug, Clone)]
pub struct MockCollaborators {
    pub log: CallLog,
    pub downloader: Arc<MockDownloader>,
    pub transcriber: Arc<MockTranscriber>,
    pub enricher: Arc<MockEnricher>,
    pub embedder: Arc<MockEmbedder>,
    pub frame_extractor: Arc<MockFrameExtractor>,
    pub packager: Arc<MockPackager>,
}

impl Default for MockCollaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCollaborators {
    pub fn new() -> Self {
        let log = CallLog::new();
        Self {
            downloader: Arc::new(MockDownloader::new(log.clone())),
            transcriber: Arc::new(MockTranscriber::new(log.clone())),
            enricher: Arc::new(MockEnricher::new(log.clone())),
            embedder: Arc::new(MockEmbedder::new(log.clone(), MOCK_DIMENSION)),
            frame_extractor: Arc::new(MockFrameExtractor::new(log.clone())),
            packager: Arc::new(MockPackager::new(log.clone())),
            log,
        }
    }

    /// The mocks as the orchestrator sees them.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            downloader: self.downloader.clone(),
            transcriber: self.transcriber.clone(),
            enricher: self.enricher.clone(),
            embedder: self.embedder.clone(),
            frame_extractor: self.frame_extractor.clone(),
            packager: self.packager.clone(),
        }
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::job::{JobSource, JobSpec};

    /// A remote job with a direct media URL.
    pub fn remote_spec(id: &str) -> JobSpec {
        JobSpec {
            id: id.to_string(),
            source: JobSource::RemoteUrl {
                url: format!("https://media.example.com/{}.mp4", id),
            },
            collection: "example".to_string(),
            title: format!("Video {}", id),
            context: "A test lecture series".to_string(),
        }
    }

    /// A local job. Writes a placeholder video at `dir/<id>.mp4`.
    pub fn local_spec(dir: &Path, id: &str) -> JobSpec {
        let path = dir.join(format!("{}.mp4", id));
        std::fs::write(&path, b"placeholder video").expect("write fixture video");
        JobSpec {
            id: id.to_string(),
            source: JobSource::LocalFile { path },
            collection: "local".to_string(),
            title: format!("Local {}", id),
            context: String::new(),
        }
    }
}
