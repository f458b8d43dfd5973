//! Mock downloader for testing.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::call_log::{lock, CallLog};
use super::faults::Faults;
use crate::downloader::{Downloader, MediaKind};
use crate::error::CollaboratorError;
use crate::job::JobSource;

/// Writes a small placeholder file instead of downloading.
///
/// Call subjects are `<kind>:<locator>`, e.g. `audio:https://example.com/a.mp4`.
/// Every fetch also records how many files already sat in the destination
/// directory, and how many media files existed across all job directories
/// once it finished, so tests can assert the one-heavy-file rule per job and
/// for a whole batch.
#[derive(Debug)]
pub struct MockDownloader {
    log: CallLog,
    faults: Faults,
    resident_before_fetch: Mutex<Vec<usize>>,
    resident_across_jobs: Mutex<Vec<usize>>,
}

impl MockDownloader {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            faults: Faults::default(),
            resident_before_fetch: Mutex::new(Vec::new()),
            resident_across_jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Highest number of files found in a media dir when a fetch started.
    pub fn max_resident_before_fetch(&self) -> usize {
        lock(&self.resident_before_fetch)
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Highest number of media files on disk across every job directory
    /// right after a fetch completed.
    pub fn peak_resident_across_jobs(&self) -> usize {
        lock(&self.resident_across_jobs)
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
    }

    fn file_name(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Audio => "audio.m4a",
            MediaKind::Video => "video.mp4",
        }
    }
}

async fn count_files(dir: &Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(_)) = entries.next_entry().await {
        count += 1;
    }
    count
}

/// Counts files in `<work>/*/<media>` given one job's `<work>/<id>/<media>`.
async fn count_across_jobs(dest_dir: &Path) -> usize {
    let (Some(media), Some(work)) = (dest_dir.file_name(), dest_dir.parent().and_then(Path::parent))
    else {
        return 0;
    };
    let Ok(mut jobs) = tokio::fs::read_dir(work).await else {
        return 0;
    };
    let mut count = 0;
    while let Ok(Some(job)) = jobs.next_entry().await {
        count += count_files(&job.path().join(media)).await;
    }
    count
}

#[async_trait]
impl Downloader for MockDownloader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        source: &JobSource,
        kind: MediaKind,
        dest_dir: &Path,
    ) -> Result<PathBuf, CollaboratorError> {
        let subject = format!("{}:{}", kind, source.locator());
        self.log.record("download", subject.clone());
        self.faults.check("download", &subject)?;

        if !source.is_remote() {
            return Err(CollaboratorError::fatal("local sources are not downloaded"));
        }

        let resident = count_files(dest_dir).await;
        lock(&self.resident_before_fetch).push(resident);

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| CollaboratorError::disk(dest_dir, e))?;
        let path = dest_dir.join(Self::file_name(kind));
        tokio::fs::write(&path, subject.as_bytes())
            .await
            .map_err(|e| CollaboratorError::disk(&path, e))?;

        let across = count_across_jobs(dest_dir).await;
        lock(&self.resident_across_jobs).push(across);
        Ok(path)
    }
}
