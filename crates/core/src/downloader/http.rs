//! Direct HTTP downloader for plain media URLs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::time::Duration;
use tracing::debug;

use super::config::DownloaderConfig;
use super::traits::{Downloader, MediaKind};
use crate::error::CollaboratorError;
use crate::job::JobSource;

const SERVICE: &str = "http";

/// Streams a direct URL to disk. It cannot extract an audio-only stream, so
/// both kinds fetch the whole file.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(config: &DownloaderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Extension to keep on the downloaded file, taken from the URL path.
    fn extension_of(url: &str) -> String {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        path.rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string())
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(
        &self,
        source: &JobSource,
        kind: MediaKind,
        dest_dir: &Path,
    ) -> Result<PathBuf, CollaboratorError> {
        let url = match source {
            JobSource::RemoteUrl { url } => url,
            other => {
                return Err(CollaboratorError::fatal(format!(
                    "http downloader cannot fetch {}",
                    other
                )))
            }
        };

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| CollaboratorError::disk(dest_dir, e))?;

        let dest = dest_dir.join(format!("{}.{}", kind.as_str(), Self::extension_of(url)));
        let partial = dest.with_extension("part");

        debug!(url = %url, dest = %dest.display(), "Downloading");
        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| CollaboratorError::from_http(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::from_status(SERVICE, status.as_u16(), &body));
        }

        let mut file = tokio::fs::File::create(&partial)
            .await
            .map_err(|e| CollaboratorError::disk(&partial, e))?;

        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(CollaboratorError::from_http(SERVICE, e));
                }
            };
            file.write_all(&chunk)
                .await
                .map_err(|e| CollaboratorError::disk(&partial, e))?;
        }

        file.flush()
            .await
            .map_err(|e| CollaboratorError::disk(&partial, e))?;
        drop(file);

        tokio::fs::rename(&partial, &dest)
            .await
            .map_err(|e| CollaboratorError::disk(&dest, e))?;

        Ok(dest)
    }
}
