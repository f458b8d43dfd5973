//! Mock transcriber for testing.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use super::call_log::{lock, CallLog};
use super::faults::Faults;
use crate::error::CollaboratorError;
use crate::transcriber::{TranscriptSpan, Transcriber};

/// Returns a fixed transcript. Fails with `FatalInput` when the media file
/// does not exist, so a prematurely deleted audio file is caught.
#[derive(Debug)]
pub struct MockTranscriber {
    log: CallLog,
    faults: Faults,
    spans: Mutex<Vec<TranscriptSpan>>,
}

impl MockTranscriber {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            faults: Faults::default(),
            spans: Mutex::new(default_spans()),
        }
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Replaces the transcript returned for every file.
    pub fn set_spans(&self, spans: Vec<TranscriptSpan>) {
        *lock(&self.spans) = spans;
    }
}

/// Three short spans plus one blank span that must be dropped.
pub fn default_spans() -> Vec<TranscriptSpan> {
    vec![
        TranscriptSpan::new(0.0, 4.5, "Welcome to the lecture."),
        TranscriptSpan::new(4.5, 9.0, "Today we talk about rivers."),
        TranscriptSpan::new(9.0, 9.5, "   "),
        TranscriptSpan::new(9.5, 15.25, "Rivers carve valleys over time."),
    ]
}

#[async_trait]
impl Transcriber for MockTranscriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcribe(&self, media_path: &Path) -> Result<Vec<TranscriptSpan>, CollaboratorError> {
        let subject = media_path.display().to_string();
        self.log.record("transcribe", subject.clone());
        self.faults.check("transcribe", &subject)?;

        if !tokio::fs::try_exists(media_path).await.unwrap_or(false) {
            return Err(CollaboratorError::fatal(format!(
                "media not found: {}",
                subject
            )));
        }
        Ok(lock(&self.spans).clone())
    }
}
