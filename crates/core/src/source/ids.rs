//! Job ids, titles and collections derived from sources.

use std::path::Path;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use sha2::{Digest, Sha256};

/// Video ids in watch, short-link and shorts URLs.
static YOUTUBE_VIDEO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(?:(?:www|m|music)\.)?(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|shorts/|embed/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .unwrap()
});

/// Channel pages: `/@handle`, `/channel/<id>`, `/c/<name>`, `/user/<name>`.
static YOUTUBE_CHANNEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:(?:www|m)\.)?youtube\.com/(?:@([^/?#]+)|(?:channel|c|user)/([^/?#]+))")
        .unwrap()
});

/// Longest sanitized stem kept in an id.
const MAX_STEM_LEN: usize = 48;

/// Extracts the video id from a YouTube video URL.
pub fn youtube_video_id(url: &str) -> Option<&str> {
    YOUTUBE_VIDEO
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Extracts the channel handle (or channel id) from a YouTube channel URL.
pub fn youtube_channel_handle(url: &str) -> Option<&str> {
    let captures = YOUTUBE_CHANNEL.captures(url)?;
    captures.get(1).or_else(|| captures.get(2)).map(|m| m.as_str())
}

pub fn is_http_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// First 8 hex chars of the SHA-256 of `input`.
fn short_hash(input: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(input.as_bytes()));
    digest[..8].to_string()
}

/// Lowercase ASCII alphanumerics, everything else collapsed to single `-`.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    trimmed[..trimmed.len().min(MAX_STEM_LEN)]
        .trim_end_matches('-')
        .to_string()
}

fn stem_or(stem: &str, fallback: &str) -> String {
    match sanitize(stem) {
        s if s.is_empty() => fallback.to_string(),
        s => s,
    }
}

/// `<stem>-<hash of absolute path>`.
pub fn local_job_id(absolute: &Path) -> String {
    let stem = absolute
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    format!(
        "{}-{}",
        stem_or(&stem, "local"),
        short_hash(&absolute.to_string_lossy())
    )
}

/// `<last path segment stem>-<hash of url>`.
pub fn remote_job_id(url: &str) -> String {
    format!(
        "{}-{}",
        stem_or(&url_stem(url).unwrap_or_default(), "remote"),
        short_hash(url)
    )
}

/// Host part of an http(s) URL.
pub fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    let host = host.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

/// Stem of the last non-empty path segment of a URL.
pub fn url_stem(url: &str) -> Option<String> {
    let rest = url.split_once("://")?.1;
    let path = rest.split(['?', '#']).next()?;
    let (_, path) = path.split_once('/')?;
    let segment = path.split('/').rev().find(|s| !s.is_empty())?;
    let stem = Path::new(segment).file_stem()?.to_string_lossy().to_string();
    (!stem.is_empty()).then_some(stem)
}

/// Name of the directory holding a local file.
pub fn parent_dir_name(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
}
