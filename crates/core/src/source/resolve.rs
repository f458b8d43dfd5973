//! Turns command-line inputs into job specs.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::ids::{
    is_http_url, local_job_id, parent_dir_name, remote_job_id, url_host, url_stem,
    youtube_channel_handle, youtube_video_id,
};
use super::manifest::{read_manifest, ManifestEntry};
use super::SourceError;
use crate::downloader::ChannelLister;
use crate::job::{is_valid_job_id, JobSource, JobSpec};

/// Extensions picked up when an input is a directory.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv"];

/// Values applied to every resolved job unless the input says otherwise.
#[derive(Debug, Clone, Default)]
pub struct SourceDefaults {
    /// Title override. Only applied when the inputs resolve to a single job.
    pub title: Option<String>,
    /// Collection override.
    pub collection: Option<String>,
    /// Enrichment context for jobs that do not carry their own.
    pub context: String,
}

/// What a single input string refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Manifest(PathBuf),
    Directory(PathBuf),
    LocalFile(PathBuf),
    YouTubeVideo(String),
    YouTubeChannel(String),
    RemoteUrl(String),
    Unknown,
}

/// Classifies an input. Existing paths win over URL patterns.
pub fn classify(input: &str) -> InputKind {
    let path = Path::new(input);
    if path.is_dir() {
        return InputKind::Directory(path.to_path_buf());
    }
    if path.is_file() {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        return if is_json {
            InputKind::Manifest(path.to_path_buf())
        } else {
            InputKind::LocalFile(path.to_path_buf())
        };
    }
    if let Some(video_id) = youtube_video_id(input) {
        return InputKind::YouTubeVideo(video_id.to_string());
    }
    if youtube_channel_handle(input).is_some() {
        return InputKind::YouTubeChannel(input.to_string());
    }
    if is_http_url(input) {
        return InputKind::RemoteUrl(input.to_string());
    }
    InputKind::Unknown
}

/// Resolves every input into job specs, in input order.
///
/// Unrecognized inputs are skipped with a warning. Resolving to no jobs at
/// all is an error.
pub async fn resolve_inputs(
    inputs: &[String],
    defaults: &SourceDefaults,
    channel_lister: &dyn ChannelLister,
) -> Result<Vec<JobSpec>, SourceError> {
    let mut jobs = Vec::new();

    for input in inputs {
        let resolved = match classify(input) {
            InputKind::Manifest(path) => {
                let entries = read_manifest(&path).await?;
                entries
                    .into_iter()
                    .map(|entry| from_manifest_entry(entry, defaults))
                    .collect::<Result<Vec<_>, _>>()?
            }
            InputKind::Directory(dir) => scan_directory(&dir, defaults).await?,
            InputKind::LocalFile(path) => vec![local_job(&path, defaults)?],
            InputKind::YouTubeVideo(video_id) => vec![youtube_job(video_id, None, None, defaults)],
            InputKind::YouTubeChannel(url) => expand_channel(&url, defaults, channel_lister).await?,
            InputKind::RemoteUrl(url) => vec![remote_job(url, defaults)],
            InputKind::Unknown => {
                warn!(input = %input, "Skipping input: not a file, directory or URL");
                Vec::new()
            }
        };
        debug!(input = %input, jobs = resolved.len(), "Input resolved");
        jobs.extend(resolved);
    }

    if jobs.is_empty() {
        return Err(SourceError::NoJobs);
    }

    if let Some(title) = &defaults.title {
        if let [job] = jobs.as_mut_slice() {
            job.title = title.clone();
        } else {
            warn!(jobs = jobs.len(), "Ignoring title override for a multi-job batch");
        }
    }

    info!(inputs = inputs.len(), jobs = jobs.len(), "Resolved inputs");
    Ok(jobs)
}

fn collection_or(defaults: &SourceDefaults, derived: impl FnOnce() -> String) -> String {
    defaults.collection.clone().unwrap_or_else(derived)
}

fn local_job(path: &Path, defaults: &SourceDefaults) -> Result<JobSpec, SourceError> {
    let absolute = std::path::absolute(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let title = absolute
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(JobSpec {
        id: local_job_id(&absolute),
        collection: collection_or(defaults, || {
            parent_dir_name(&absolute).unwrap_or_else(|| "local".to_string())
        }),
        title,
        context: defaults.context.clone(),
        source: JobSource::LocalFile { path: absolute },
    })
}

fn remote_job(url: String, defaults: &SourceDefaults) -> JobSpec {
    JobSpec {
        id: remote_job_id(&url),
        collection: collection_or(defaults, || {
            url_host(&url).unwrap_or("remote").to_string()
        }),
        title: url_stem(&url).unwrap_or_else(|| url.clone()),
        context: defaults.context.clone(),
        source: JobSource::RemoteUrl { url },
    }
}

fn youtube_job(
    video_id: String,
    channel: Option<&str>,
    title: Option<String>,
    defaults: &SourceDefaults,
) -> JobSpec {
    JobSpec {
        id: video_id.clone(),
        collection: collection_or(defaults, || channel.unwrap_or("youtube").to_string()),
        title: title.filter(|t| !t.is_empty()).unwrap_or_else(|| video_id.clone()),
        context: defaults.context.clone(),
        source: JobSource::YouTubeVideo {
            channel: channel.map(str::to_string),
            video_id,
        },
    }
}

async fn scan_directory(dir: &Path, defaults: &SourceDefaults) -> Result<Vec<JobSpec>, SourceError> {
    let io_err = |e| SourceError::Io {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                VIDEO_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if is_video && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        warn!(dir = %dir.display(), "Directory contains no video files");
    }
    files.iter().map(|path| local_job(path, defaults)).collect()
}

async fn expand_channel(
    url: &str,
    defaults: &SourceDefaults,
    channel_lister: &dyn ChannelLister,
) -> Result<Vec<JobSpec>, SourceError> {
    let handle = youtube_channel_handle(url);
    let entries = channel_lister
        .list_channel(url)
        .await
        .map_err(|source| SourceError::Channel {
            url: url.to_string(),
            source,
        })?;
    info!(channel = %url, videos = entries.len(), "Channel listed");

    Ok(entries
        .into_iter()
        .filter(|entry| {
            let valid = is_valid_job_id(&entry.video_id);
            if !valid {
                warn!(
                    channel = %url,
                    video_id = %entry.video_id,
                    "Skipping channel entry with unusable id"
                );
            }
            valid
        })
        .map(|entry| youtube_job(entry.video_id, handle, Some(entry.title), defaults))
        .collect())
}

fn from_manifest_entry(
    entry: ManifestEntry,
    defaults: &SourceDefaults,
) -> Result<JobSpec, SourceError> {
    let mut spec = match (entry.path, entry.source_url) {
        (Some(path), _) => local_job(&path, defaults)?,
        (None, Some(url)) => {
            if let Some(video_id) = youtube_video_id(&url) {
                youtube_job(video_id.to_string(), None, None, defaults)
            } else if is_http_url(&url) {
                remote_job(url, defaults)
            } else {
                return Err(SourceError::Unsupported(url));
            }
        }
        (None, None) => return Err(SourceError::Unsupported(String::new())),
    };

    if let Some(id) = entry.id {
        spec.id = id;
    }
    if let Some(title) = entry.title {
        spec.title = title;
    }
    if let Some(context) = entry.context {
        spec.context = context;
    }
    if let Some(collection) = entry.collection {
        spec.collection = collection;
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::ChannelEntry;
    use crate::error::CollaboratorError;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FixedLister(Vec<ChannelEntry>);

    #[async_trait]
    impl ChannelLister for FixedLister {
        async fn list_channel(&self, _url: &str) -> Result<Vec<ChannelEntry>, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    fn no_channels() -> FixedLister {
        FixedLister(Vec::new())
    }

    fn inputs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_resolve_youtube_and_remote_urls() {
        let jobs = resolve_inputs(
            &inputs(&[
                "https://youtu.be/dQw4w9WgXcQ",
                "https://archive.org/download/duck/duck_and_cover.mp4",
            ]),
            &SourceDefaults::default(),
            &no_channels(),
        )
        .await
        .unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, "dQw4w9WgXcQ");
        assert_eq!(jobs[0].collection, "youtube");
        assert!(matches!(jobs[0].source, JobSource::YouTubeVideo { .. }));

        assert!(jobs[1].id.starts_with("duck-and-cover-"));
        assert_eq!(jobs[1].collection, "archive.org");
        assert_eq!(jobs[1].title, "duck_and_cover");
    }

    #[tokio::test]
    async fn test_resolve_directory_picks_videos_sorted() {
        let dir = TempDir::new().unwrap();
        let lectures = dir.path().join("lectures");
        std::fs::create_dir(&lectures).unwrap();
        for name in ["b.mkv", "a.MP4", "notes.txt", "c.webm"] {
            std::fs::write(lectures.join(name), b"x").unwrap();
        }

        let jobs = resolve_inputs(
            &inputs(&[lectures.to_str().unwrap()]),
            &SourceDefaults::default(),
            &no_channels(),
        )
        .await
        .unwrap();

        let titles: Vec<&str> = jobs.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert!(jobs.iter().all(|j| j.collection == "lectures"));
        assert!(jobs.iter().all(|j| !j.source.is_remote()));
    }

    #[tokio::test]
    async fn test_resolve_manifest_with_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"x").unwrap();
        let manifest = dir.path().join("batch.json");
        std::fs::write(
            &manifest,
            r#"[
                {"path": "clip.mp4", "id": "clip-1", "title": "Clip", "collection": "clips"},
                {"source_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "context": "music video"}
            ]"#,
        )
        .unwrap();

        let defaults = SourceDefaults {
            context: "default context".to_string(),
            ..Default::default()
        };
        let jobs = resolve_inputs(&inputs(&[manifest.to_str().unwrap()]), &defaults, &no_channels())
            .await
            .unwrap();

        assert_eq!(jobs[0].id, "clip-1");
        assert_eq!(jobs[0].title, "Clip");
        assert_eq!(jobs[0].collection, "clips");
        assert_eq!(jobs[0].context, "default context");
        assert_eq!(jobs[1].id, "dQw4w9WgXcQ");
        assert_eq!(jobs[1].context, "music video");
    }

    #[tokio::test]
    async fn test_manifest_id_outside_work_dir_is_rejected() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("batch.json");
        std::fs::write(
            &manifest,
            r#"[{"id": "..", "source_url": "https://media.example.com/a.mp4"}]"#,
        )
        .unwrap();

        let err = resolve_inputs(
            &inputs(&[manifest.to_str().unwrap()]),
            &SourceDefaults::default(),
            &no_channels(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SourceError::Manifest { .. }), "{}", err);
    }

    #[tokio::test]
    async fn test_channel_entries_with_unusable_ids_are_skipped() {
        let lister = FixedLister(vec![
            ChannelEntry {
                video_id: "../escape".to_string(),
                title: "Bad".to_string(),
            },
            ChannelEntry {
                video_id: "ccccccccccc".to_string(),
                title: "Good".to_string(),
            },
        ]);

        let jobs = resolve_inputs(
            &inputs(&["https://www.youtube.com/@someone"]),
            &SourceDefaults::default(),
            &lister,
        )
        .await
        .unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "ccccccccccc");
    }

    #[tokio::test]
    async fn test_resolve_channel_uses_lister() {
        let lister = FixedLister(vec![
            ChannelEntry {
                video_id: "aaaaaaaaaaa".to_string(),
                title: "First".to_string(),
            },
            ChannelEntry {
                video_id: "bbbbbbbbbbb".to_string(),
                title: String::new(),
            },
        ]);

        let jobs = resolve_inputs(
            &inputs(&["https://www.youtube.com/@someone"]),
            &SourceDefaults::default(),
            &lister,
        )
        .await
        .unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "First");
        assert_eq!(jobs[1].title, "bbbbbbbbbbb");
        assert!(jobs.iter().all(|j| j.collection == "someone"));
        assert_eq!(
            jobs[0].source,
            JobSource::YouTubeVideo {
                channel: Some("someone".to_string()),
                video_id: "aaaaaaaaaaa".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_title_and_collection_overrides() {
        let defaults = SourceDefaults {
            title: Some("Custom".to_string()),
            collection: Some("mine".to_string()),
            context: String::new(),
        };
        let jobs = resolve_inputs(
            &inputs(&["https://example.com/v.mp4"]),
            &defaults,
            &no_channels(),
        )
        .await
        .unwrap();
        assert_eq!(jobs[0].title, "Custom");
        assert_eq!(jobs[0].collection, "mine");
    }

    #[tokio::test]
    async fn test_unknown_inputs_only_is_an_error() {
        let err = resolve_inputs(
            &inputs(&["not-a-thing", "/definitely/not/here.mp4"]),
            &SourceDefaults::default(),
            &no_channels(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SourceError::NoJobs));
    }
}
