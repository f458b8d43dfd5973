//! Mock frame extractor for testing.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::call_log::{lock, CallLog};
use super::faults::Faults;
use crate::error::CollaboratorError;
use crate::frames::{frame_file_name, FrameExtractor};

/// Writes a placeholder JPEG per timestamp.
#[derive(Debug)]
pub struct MockFrameExtractor {
    log: CallLog,
    faults: Faults,
    undecodable: Mutex<BTreeSet<u64>>,
}

impl MockFrameExtractor {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            faults: Faults::default(),
            undecodable: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Timestamps that will be left out of the result.
    pub fn set_undecodable(&self, timestamps_ms: impl IntoIterator<Item = u64>) {
        *lock(&self.undecodable) = timestamps_ms.into_iter().collect();
    }
}

#[async_trait]
impl FrameExtractor for MockFrameExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract(
        &self,
        media_path: &Path,
        timestamps_ms: &[u64],
        out_dir: &Path,
    ) -> Result<BTreeMap<u64, PathBuf>, CollaboratorError> {
        let subject = media_path.display().to_string();
        self.log.record("extract_frames", subject.clone());
        self.faults.check("extract_frames", &subject)?;

        if !tokio::fs::try_exists(media_path).await.unwrap_or(false) {
            return Err(CollaboratorError::fatal(format!(
                "media not found: {}",
                subject
            )));
        }

        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| CollaboratorError::disk(out_dir, e))?;

        let skipped = lock(&self.undecodable).clone();
        let mut frames = BTreeMap::new();
        for &ts in timestamps_ms {
            if skipped.contains(&ts) || frames.contains_key(&ts) {
                continue;
            }
            let path = out_dir.join(frame_file_name(ts));
            tokio::fs::write(&path, b"\xFF\xD8\xFF\xD9")
                .await
                .map_err(|e| CollaboratorError::disk(&path, e))?;
            frames.insert(ts, path);
        }
        Ok(frames)
    }
}
