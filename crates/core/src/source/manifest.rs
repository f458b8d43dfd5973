//! Bulk job manifests.
//!
//! A manifest is a JSON file holding either one entry or an array of them:
//!
//! ```json
//! [
//!   { "source_url": "https://archive.org/download/x/x.mp4", "title": "X" },
//!   { "path": "talks/keynote.mp4", "collection": "conf-2024", "context": "Opening keynote" }
//! ]
//! ```
//!
//! Relative `path`s are resolved against the manifest's directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::SourceError;
use crate::job::is_valid_job_id;

/// One job described by a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestDocument {
    Many(Vec<ManifestEntry>),
    One(ManifestEntry),
}

/// Parses manifest text.
pub fn parse_manifest(text: &str, origin: &Path) -> Result<Vec<ManifestEntry>, SourceError> {
    let document: ManifestDocument =
        serde_json::from_str(text).map_err(|e| SourceError::Manifest {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;

    let entries = match document {
        ManifestDocument::Many(entries) => entries,
        ManifestDocument::One(entry) => vec![entry],
    };

    let base = origin.parent().unwrap_or_else(|| Path::new("."));
    entries
        .into_iter()
        .enumerate()
        .map(|(i, mut entry)| {
            match (&entry.path, &entry.source_url) {
                (None, None) => {
                    return Err(SourceError::Manifest {
                        path: origin.to_path_buf(),
                        reason: format!("entry {} has neither `path` nor `source_url`", i),
                    })
                }
                (Some(_), Some(_)) => {
                    return Err(SourceError::Manifest {
                        path: origin.to_path_buf(),
                        reason: format!("entry {} has both `path` and `source_url`", i),
                    })
                }
                _ => {}
            }
            entry.id = entry.id.take().filter(|id| !id.trim().is_empty());
            if let Some(id) = &entry.id {
                if !is_valid_job_id(id) {
                    return Err(SourceError::Manifest {
                        path: origin.to_path_buf(),
                        reason: format!("entry {} has an invalid id {:?}", i, id),
                    });
                }
            }
            if let Some(path) = entry.path.take() {
                entry.path = Some(if path.is_relative() { base.join(path) } else { path });
            }
            Ok(entry)
        })
        .collect()
}

/// Reads and parses a manifest file.
pub async fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, SourceError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SourceError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    parse_manifest(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array() {
        let text = r#"[
            {"source_url": "https://example.com/a.mp4", "title": "A"},
            {"path": "clips/b.mp4", "collection": "clips", "id": "b-custom"}
        ]"#;
        let entries = parse_manifest(text, Path::new("/data/batch.json")).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title.as_deref(), Some("A"));
        assert_eq!(entries[1].path, Some(PathBuf::from("/data/clips/b.mp4")));
        assert_eq!(entries[1].id.as_deref(), Some("b-custom"));
    }

    #[test]
    fn test_parse_rejects_ids_that_escape_the_work_dir() {
        for id in ["..", ".", "/", "/tmp/x", "../sibling", "a/b"] {
            let text = format!(
                r#"[{{"id": {:?}, "source_url": "https://media.example.com/a.mp4"}}]"#,
                id
            );
            let err = parse_manifest(&text, Path::new("/data/batch.json")).unwrap_err();
            assert!(
                matches!(&err, SourceError::Manifest { reason, .. } if reason.contains("invalid id")),
                "{}: {}",
                id,
                err
            );
        }
    }

    #[test]
    fn test_parse_blank_id_is_ignored() {
        let text = r#"{"id": "  ", "source_url": "https://media.example.com/a.mp4"}"#;
        let entries = parse_manifest(text, Path::new("/data/batch.json")).unwrap();
        assert!(entries[0].id.is_none());
    }

    #[test]
    fn test_parse_single_object() {
        let text = r#"{"path": "/abs/c.mkv", "context": "lecture"}"#;
        let entries = parse_manifest(text, Path::new("/data/one.json")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, Some(PathBuf::from("/abs/c.mkv")));
        assert_eq!(entries[0].context.as_deref(), Some("lecture"));
    }

    #[test]
    fn test_entry_needs_exactly_one_source() {
        let err = parse_manifest(r#"[{"title": "nothing"}]"#, Path::new("m.json")).unwrap_err();
        assert!(matches!(err, SourceError::Manifest { .. }));

        let both = r#"{"path": "a.mp4", "source_url": "https://example.com/a.mp4"}"#;
        assert!(parse_manifest(both, Path::new("m.json")).is_err());
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_manifest("not json", Path::new("m.json")).unwrap_err();
        assert!(err.to_string().contains("m.json"));
    }
}
