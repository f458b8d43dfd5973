//! Filesystem sidecar store.
//!
//! Layout: `<root>/<job_id>/job.json`. Writes go to a uniquely named
//! temporary file in the same directory, are flushed to disk, and are then
//! renamed over the sidecar, so a reader never observes a partial record.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::store::{SidecarError, SidecarStore};
use super::types::JobRecord;

/// File name of the sidecar inside a job directory.
pub const SIDECAR_FILE: &str = "job.json";

/// Sidecar store rooted at the configured work directory.
#[derive(Debug, Clone)]
pub struct FsSidecarStore {
    root: PathBuf,
}

impl FsSidecarStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sidecar_path(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join(SIDECAR_FILE)
    }
}

#[async_trait]
impl SidecarStore for FsSidecarStore {
    async fn load(&self, job_id: &str) -> Result<Option<JobRecord>, SidecarError> {
        let path = self.sidecar_path(job_id);
        read_json(&path).await
    }

    async fn save(&self, record: &JobRecord) -> Result<(), SidecarError> {
        let path = self.sidecar_path(&record.id);
        write_json_atomic(&path, record).await?;
        debug!(job_id = %record.id, stage = %record.stage, "Sidecar saved");
        Ok(())
    }

    async fn delete(&self, job_id: &str) -> Result<(), SidecarError> {
        let path = self.sidecar_path(job_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SidecarError::io(path, e)),
        }
    }

    async fn list(&self) -> Result<Vec<JobRecord>, SidecarError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SidecarError::io(&self.root, e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SidecarError::io(&self.root, e))?
        {
            let path = entry.path().join(SIDECAR_FILE);
            match read_json::<JobRecord>(&path).await {
                Ok(Some(record)) if entry.file_name().to_str() == Some(record.id.as_str()) => {
                    records.push(record)
                }
                Ok(Some(record)) => warn!(
                    path = %path.display(),
                    job_id = %record.id,
                    "Skipping sidecar whose id does not match its directory"
                ),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable sidecar"),
            }
        }

        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn job_dir(&self, job_id: &str) -> PathBuf {
        self.root.join(job_id)
    }
}

/// Reads a JSON document, returning `None` if the file does not exist.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SidecarError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SidecarError::io(path, e)),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| SidecarError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Writes a JSON document with write-to-temp, fsync, rename.
pub async fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), SidecarError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| SidecarError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SidecarError::io(dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "sidecar".to_string());
    let tmp_path = dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(SidecarError::io(path, e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobSource, JobSpec, Stage};
    use tempfile::TempDir;

    fn record(id: &str) -> JobRecord {
        JobRecord::new(&JobSpec {
            id: id.to_string(),
            source: JobSource::RemoteUrl {
                url: format!("https://archive.org/download/{}.mp4", id),
            },
            collection: "archive.org".to_string(),
            title: id.to_string(),
            context: String::new(),
        })
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = FsSidecarStore::new(dir.path());
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FsSidecarStore::new(dir.path());

        let mut rec = record("film");
        rec.advance(Stage::Downloaded).unwrap();
        store.save(&rec).await.unwrap();

        let loaded = store.load("film").await.unwrap().unwrap();
        assert_eq!(loaded, rec);
        assert!(dir.path().join("film").join(SIDECAR_FILE).exists());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FsSidecarStore::new(dir.path());
        store.save(&record("film")).await.unwrap();
        store.save(&record("film")).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path().join("film"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec![SIDECAR_FILE.to_string()]);
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_and_empty_dirs() {
        let dir = TempDir::new().unwrap();
        let store = FsSidecarStore::new(dir.path());
        store.save(&record("b")).await.unwrap();
        store.save(&record("a")).await.unwrap();

        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        std::fs::create_dir_all(dir.path().join("broken")).unwrap();
        std::fs::write(dir.path().join("broken").join(SIDECAR_FILE), b"{\"id\": \"bro").unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_list_skips_sidecar_naming_another_directory() {
        let dir = TempDir::new().unwrap();
        let store = FsSidecarStore::new(dir.path().join("work"));
        store.save(&record("film")).await.unwrap();

        let planted = dir.path().join("work").join("planted");
        std::fs::create_dir_all(&planted).unwrap();
        let escaping = serde_json::to_vec(&record("..")).unwrap();
        std::fs::write(planted.join(SIDECAR_FILE), escaping).unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["film".to_string()]);
    }

    #[tokio::test]
    async fn test_list_missing_root() {
        let dir = TempDir::new().unwrap();
        let store = FsSidecarStore::new(dir.path().join("does-not-exist"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_sidecar_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = FsSidecarStore::new(dir.path());
        std::fs::create_dir_all(dir.path().join("film")).unwrap();
        std::fs::write(dir.path().join("film").join(SIDECAR_FILE), b"not json").unwrap();

        let err = store.load("film").await.unwrap_err();
        assert!(matches!(err, SidecarError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FsSidecarStore::new(dir.path());
        store.save(&record("film")).await.unwrap();
        store.delete("film").await.unwrap();
        store.delete("film").await.unwrap();
        assert!(store.load("film").await.unwrap().is_none());
    }
}
