//! Packager module producing the portable `.rtt` artifact.
//!
//! An artifact is a zip archive with:
//! - `manifest.json`: job metadata and a segment index
//! - `segments.json`: the full segment table, embeddings included
//! - `frames/*.jpg`: one still per segment where one could be extracted

mod archive;
mod config;
mod traits;
mod types;

pub use archive::ZipPackager;
pub use config::PackagerConfig;
pub use traits::Packager;
pub use types::{JobMetadata, Manifest, SegmentSummary, ARTIFACT_EXTENSION, FORMAT_VERSION};
