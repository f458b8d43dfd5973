//! Jobs: the durable per-video progress record and its sidecar store.

mod fs_store;
mod store;
mod types;

pub use fs_store::{read_json, write_json_atomic, FsSidecarStore, SIDECAR_FILE};
pub use store::{SidecarError, SidecarStore};
pub use types::{
    is_valid_job_id, youtube_watch_url, Artifacts, JobFailure, JobRecord, JobRecordError, JobSource, JobSpec,
    Segment, Stage,
};
