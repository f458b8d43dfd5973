//! Core job data types.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

// ============================================================================
// Source
// ============================================================================

/// Where a job's media comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobSource {
    /// A file already on local disk. Never downloaded, never deleted.
    LocalFile { path: PathBuf },

    /// A direct media URL.
    RemoteUrl { url: String },

    /// A single YouTube video, optionally discovered through a channel.
    YouTubeVideo {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
        video_id: String,
    },
}

impl JobSource {
    /// Remote sources go through the audio/video download steps.
    pub fn is_remote(&self) -> bool {
        !matches!(self, JobSource::LocalFile { .. })
    }

    /// The local path of a local source.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            JobSource::LocalFile { path } => Some(path),
            _ => None,
        }
    }

    /// A URL or path identifying this source to humans and downstream consumers.
    pub fn locator(&self) -> String {
        match self {
            JobSource::LocalFile { path } => path.display().to_string(),
            JobSource::RemoteUrl { url } => url.clone(),
            JobSource::YouTubeVideo { video_id, .. } => youtube_watch_url(video_id),
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator())
    }
}

/// Canonical watch URL for a YouTube video id.
pub fn youtube_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

// ============================================================================
// Stage
// ============================================================================

/// Position of a job in the pipeline. Ordered; a record's stage never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    New,
    Downloaded,
    Transcribed,
    Enriched,
    Embedded,
    Ready,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::New => "new",
            Stage::Downloaded => "downloaded",
            Stage::Transcribed => "transcribed",
            Stage::Enriched => "enriched",
            Stage::Embedded => "embedded",
            Stage::Ready => "ready",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Ready)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// Intermediate resources of a job. A field is set only while the resource
/// exists on disk and is owned by the job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    /// Downloaded audio-only media (remote sources, between Downloaded and Transcribed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,

    /// Downloaded full video (remote sources, only while frames are extracted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames_dir: Option<PathBuf>,

    /// Segment table with raw transcript text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<PathBuf>,

    /// Segment table with enriched text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched_segments: Option<PathBuf>,

    /// Segment table with embeddings and frame paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<PathBuf>,
}

impl Artifacts {
    /// Heavy media paths currently recorded.
    pub fn heavy_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.audio_path.iter().chain(self.video_path.iter())
    }

    /// Every recorded path, heavy or not.
    pub fn all_paths(&self) -> Vec<&PathBuf> {
        [
            &self.audio_path,
            &self.video_path,
            &self.frames_dir,
            &self.transcript,
            &self.enriched_segments,
            &self.embeddings,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// ============================================================================
// Failure
// ============================================================================

/// Last failure of a job, persisted alongside its last good stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    /// The stage the job was trying to reach.
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
    pub attempt_count: u32,
    pub at: DateTime<Utc>,
}

// ============================================================================
// Segment
// ============================================================================

/// One timestamped span of a video's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub transcript_raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_enriched: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Relative path inside the packaged archive (`frames/<name>.jpg`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_path: Option<String>,
}

impl Segment {
    pub fn new(job_id: &str, index: usize, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            segment_id: format!("{}_{:05}", job_id, index),
            start_seconds: start,
            end_seconds: end,
            transcript_raw: text.into(),
            transcript_enriched: None,
            embedding: None,
            frame_path: None,
        }
    }

    /// Text used for embedding: enriched when available, raw otherwise.
    pub fn index_text(&self) -> &str {
        self.transcript_enriched
            .as_deref()
            .unwrap_or(&self.transcript_raw)
    }

    /// Start timestamp in whole milliseconds, used to key frames.
    pub fn start_millis(&self) -> u64 {
        (self.start_seconds.max(0.0) * 1000.0).round() as u64
    }
}

// ============================================================================
// Job spec & record
// ============================================================================

/// A resolved unit of work handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: String,
    pub source: JobSource,
    pub collection: String,
    pub title: String,
    /// Free text given to the enricher alongside each segment.
    pub context: String,
}

/// Whether `id` names exactly one directory inside the work dir.
///
/// Job ids become directory and file names, so separators, drive prefixes
/// and the `.`/`..` components are rejected.
pub fn is_valid_job_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(&['/', '\\', ':', '\0'][..])
}

/// Errors raised by invalid record mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobRecordError {
    #[error("job {job_id}: stage cannot move from {from} back to {to}")]
    StageRegression { job_id: String, from: Stage, to: Stage },
}

/// Durable progress record of one job. The sidecar file holding it is the
/// only authority on the job's stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub source: JobSource,
    pub collection: String,
    pub title: String,
    #[serde(default)]
    pub context: String,
    pub stage: Stage,
    #[serde(default)]
    pub artifacts: Artifacts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Creates a fresh record at [`Stage::New`].
    pub fn new(spec: &JobSpec) -> Self {
        let now = Utc::now();
        Self {
            id: spec.id.clone(),
            source: spec.source.clone(),
            collection: spec.collection.clone(),
            title: spec.title.clone(),
            context: spec.context.clone(),
            stage: Stage::New,
            artifacts: Artifacts::default(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds the spec this record was created from.
    pub fn spec(&self) -> JobSpec {
        JobSpec {
            id: self.id.clone(),
            source: self.source.clone(),
            collection: self.collection.clone(),
            title: self.title.clone(),
            context: self.context.clone(),
        }
    }

    /// Moves the record forward. Clears any previous error.
    pub fn advance(&mut self, to: Stage) -> Result<(), JobRecordError> {
        if to < self.stage {
            return Err(JobRecordError::StageRegression {
                job_id: self.id.clone(),
                from: self.stage,
                to,
            });
        }
        self.stage = to;
        self.error = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Attaches a failure without touching the stage.
    pub fn fail(&mut self, failure: JobFailure) {
        self.error = Some(failure);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> JobSpec {
        JobSpec {
            id: "abc123".to_string(),
            source: JobSource::YouTubeVideo {
                channel: Some("@prelinger".to_string()),
                video_id: "abc123".to_string(),
            },
            collection: "@prelinger".to_string(),
            title: "Duck and Cover".to_string(),
            context: "1951 civil defense film".to_string(),
        }
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::New < Stage::Downloaded);
        assert!(Stage::Downloaded < Stage::Transcribed);
        assert!(Stage::Transcribed < Stage::Enriched);
        assert!(Stage::Enriched < Stage::Embedded);
        assert!(Stage::Embedded < Stage::Ready);
        assert!(Stage::Ready.is_terminal());
    }

    #[test]
    fn test_advance_rejects_regression() {
        let mut record = JobRecord::new(&spec());
        record.advance(Stage::Transcribed).unwrap();

        let err = record.advance(Stage::Downloaded).unwrap_err();
        assert_eq!(
            err,
            JobRecordError::StageRegression {
                job_id: "abc123".to_string(),
                from: Stage::Transcribed,
                to: Stage::Downloaded,
            }
        );
        assert_eq!(record.stage, Stage::Transcribed);
    }

    #[test]
    fn test_advance_clears_error() {
        let mut record = JobRecord::new(&spec());
        record.fail(JobFailure {
            stage: Stage::Downloaded,
            kind: ErrorKind::TransientService,
            message: "timeout".to_string(),
            attempt_count: 3,
            at: Utc::now(),
        });
        assert!(record.error.is_some());

        record.advance(Stage::Downloaded).unwrap();
        assert!(record.error.is_none());
    }

    #[test]
    fn test_source_serialization() {
        let source = JobSource::LocalFile {
            path: PathBuf::from("/videos/film.mp4"),
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["type"], "local_file");
        assert!(!source.is_remote());

        let source = JobSource::YouTubeVideo {
            channel: None,
            video_id: "dQw4w9WgXcQ".to_string(),
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["type"], "you_tube_video");
        assert!(json.get("channel").is_none());
        assert_eq!(
            source.locator(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_segment_ids_and_index_text() {
        let mut segment = Segment::new("film-1a2b3c4d", 7, 12.3456, 15.0, "hello");
        assert_eq!(segment.segment_id, "film-1a2b3c4d_00007");
        assert_eq!(segment.start_millis(), 12346);
        assert_eq!(segment.index_text(), "hello");

        segment.transcript_enriched = Some("hello, greeting".to_string());
        assert_eq!(segment.index_text(), "hello, greeting");
    }

    #[test]
    fn test_record_roundtrip_skips_empty_artifacts() {
        let record = JobRecord::new(&spec());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["stage"], "new");
        assert_eq!(json["artifacts"], serde_json::json!({}));
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_job_id_validation() {
        for id in ["dQw4w9WgXcQ", "film-1a2b3c4d", "b-custom", "v1.2"] {
            assert!(is_valid_job_id(id), "{}", id);
        }
        for id in ["", ".", "..", "/", "/etc", "a/b", "../x", "a\\b", "C:", "a\0b"] {
            assert!(!is_valid_job_id(id), "{:?}", id);
        }
    }
}
