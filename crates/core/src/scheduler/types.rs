//! Types for the batch scheduler.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::job::JobFailure;

/// Outcome of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Jobs that reached `Ready`, including ones packaged by an earlier run.
    pub succeeded: BTreeSet<String>,
    /// Jobs that failed, with the failure recorded in their sidecar.
    pub failed: BTreeMap<String, JobFailure>,
    /// Jobs never started because the scheduler was shut down.
    pub deferred: BTreeSet<String>,
}

impl BatchReport {
    /// True when every job of the batch succeeded.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.deferred.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.deferred.len()
    }
}

/// Stops a running scheduler from admitting new jobs.
///
/// In-flight jobs are not interrupted.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub(crate) fn new(tx: Arc<watch::Sender<bool>>) -> Self {
        Self { tx }
    }

    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}
