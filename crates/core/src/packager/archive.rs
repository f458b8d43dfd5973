//! Zip-based packager.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::config::PackagerConfig;
use super::traits::Packager;
use super::types::{JobMetadata, Manifest, SegmentSummary, FORMAT_VERSION};
use crate::error::CollaboratorError;
use crate::job::Segment;

/// Writes artifacts as zip archives.
pub struct ZipPackager {
    config: PackagerConfig,
}

impl ZipPackager {
    pub fn new(config: PackagerConfig) -> Self {
        Self { config }
    }

    fn manifest(metadata: &JobMetadata, segments: &[Segment]) -> Manifest {
        Manifest {
            format_version: FORMAT_VERSION,
            job: metadata.clone(),
            segments: segments
                .iter()
                .map(|s| SegmentSummary {
                    segment_id: s.segment_id.clone(),
                    start_seconds: s.start_seconds,
                    end_seconds: s.end_seconds,
                    frame_path: s.frame_path.clone(),
                })
                .collect(),
        }
    }

    fn write_archive(
        path: &Path,
        manifest: &Manifest,
        segments: &[Segment],
        frames_dir: Option<&Path>,
        compression_level: i64,
    ) -> Result<(), CollaboratorError> {
        let disk = |e: std::io::Error| CollaboratorError::disk(path, e);
        let zip_err = |e: zip::result::ZipError| CollaboratorError::disk(path, std::io::Error::other(e));

        let file = File::create(path).map_err(disk)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));

        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(compression_level));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        zip.start_file("manifest.json", deflated).map_err(zip_err)?;
        serde_json::to_writer_pretty(&mut zip, manifest)
            .map_err(|e| disk(std::io::Error::other(e)))?;

        zip.start_file("segments.json", deflated).map_err(zip_err)?;
        serde_json::to_writer(&mut zip, segments).map_err(|e| disk(std::io::Error::other(e)))?;

        if let Some(frames_dir) = frames_dir {
            for frame in segments.iter().filter_map(|s| s.frame_path.as_deref()) {
                let Some(name) = Path::new(frame).file_name() else {
                    continue;
                };
                let source = frames_dir.join(name);
                let bytes = match std::fs::read(&source) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(path = %source.display(), error = %e, "Frame missing, not packaged");
                        continue;
                    }
                };
                zip.start_file(frame, stored).map_err(zip_err)?;
                zip.write_all(&bytes).map_err(disk)?;
            }
        }

        let mut writer = zip.finish().map_err(zip_err)?;
        writer.flush().map_err(disk)?;
        writer
            .into_inner()
            .map_err(|e| disk(e.into_error()))?
            .sync_all()
            .map_err(disk)?;
        Ok(())
    }
}

#[async_trait]
impl Packager for ZipPackager {
    fn name(&self) -> &str {
        "zip"
    }

    async fn package(
        &self,
        metadata: &JobMetadata,
        segments: &[Segment],
        frames_dir: Option<&Path>,
        output: &Path,
    ) -> Result<PathBuf, CollaboratorError> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CollaboratorError::disk(parent, e))?;
        }

        let file_name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| metadata.job_id.clone());
        let temp = output.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        let manifest = Self::manifest(metadata, segments);
        let segments = segments.to_vec();
        let frames_dir = frames_dir.map(Path::to_path_buf);
        let level = self.config.compression_level;
        let temp_path = temp.clone();

        let written = tokio::task::spawn_blocking(move || {
            Self::write_archive(&temp_path, &manifest, &segments, frames_dir.as_deref(), level)
        })
        .await
        .map_err(|e| CollaboratorError::disk(&temp, std::io::Error::other(e)))?;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&temp, output).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(CollaboratorError::disk(output, e));
        }

        debug!(artifact = %output.display(), "Artifact written");
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io::Read;
    use tempfile::TempDir;

    fn metadata(segment_count: usize) -> JobMetadata {
        JobMetadata {
            job_id: "lecture-1a2b3c4d".to_string(),
            title: "Lecture".to_string(),
            source_url: "/videos/lecture.mp4".to_string(),
            collection: "videos".to_string(),
            context: String::new(),
            duration_seconds: 12.0,
            segment_count,
            embedding_dimension: 3,
            packaged_at: Utc::now(),
        }
    }

    fn segments() -> Vec<Segment> {
        let mut first = Segment::new("lecture-1a2b3c4d", 0, 0.0, 5.0, "hello");
        first.transcript_enriched = Some("hello greeting".to_string());
        first.embedding = Some(vec![0.1, 0.2, 0.3]);
        first.frame_path = Some("frames/000000000.jpg".to_string());

        let mut second = Segment::new("lecture-1a2b3c4d", 1, 5.0, 12.0, "world");
        second.transcript_enriched = Some("world planet".to_string());
        second.embedding = Some(vec![0.4, 0.5, 0.6]);
        vec![first, second]
    }

    #[tokio::test]
    async fn test_package_writes_archive() {
        let dir = TempDir::new().unwrap();
        let frames = dir.path().join("frames");
        std::fs::create_dir_all(&frames).unwrap();
        std::fs::write(frames.join("000000000.jpg"), b"\xFF\xD8jpeg").unwrap();

        let output = dir.path().join("out").join("lecture-1a2b3c4d.rtt");
        let packager = ZipPackager::new(PackagerConfig::default());
        let segments = segments();
        let path = packager
            .package(&metadata(2), &segments, Some(&frames), &output)
            .await
            .unwrap();
        assert_eq!(path, output);

        let mut archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
        assert_eq!(archive.len(), 3);

        let mut manifest = String::new();
        archive
            .by_name("manifest.json")
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        let manifest: Manifest = serde_json::from_str(&manifest).unwrap();
        assert_eq!(manifest.format_version, FORMAT_VERSION);
        assert_eq!(manifest.segments.len(), 2);
        assert_eq!(manifest.job.segment_count, 2);

        let mut table = String::new();
        archive
            .by_name("segments.json")
            .unwrap()
            .read_to_string(&mut table)
            .unwrap();
        let table: Vec<Segment> = serde_json::from_str(&table).unwrap();
        assert_eq!(table, segments);

        assert!(archive.by_name("frames/000000000.jpg").is_ok());
    }

    #[tokio::test]
    async fn test_package_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("a.rtt");
        let packager = ZipPackager::new(PackagerConfig::default());
        packager
            .package(&metadata(2), &segments(), None, &output)
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.rtt".to_string()]);
    }

    #[tokio::test]
    async fn test_unwritable_output_is_disk_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let packager = ZipPackager::new(PackagerConfig::default());
        let err = packager
            .package(&metadata(2), &segments(), None, &blocker.join("x.rtt"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Disk);
    }
}
