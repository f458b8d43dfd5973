//! Types written into the packaged artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job-level metadata stored in `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub job_id: String,
    pub title: String,
    /// URL or path the video came from.
    pub source_url: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    pub duration_seconds: f64,
    pub segment_count: usize,
    pub embedding_dimension: usize,
    pub packaged_at: DateTime<Utc>,
}

/// Per-segment entry in `manifest.json`. Embeddings live in `segments.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment_id: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_path: Option<String>,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub job: JobMetadata,
    pub segments: Vec<SegmentSummary>,
}

/// Current artifact layout version.
pub const FORMAT_VERSION: u32 = 1;

/// Extension of packaged artifacts.
pub const ARTIFACT_EXTENSION: &str = "rtt";
