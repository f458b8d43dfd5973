//! Mock enricher for testing.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;

use super::call_log::CallLog;
use super::faults::Faults;
use crate::enricher::Enricher;
use crate::error::CollaboratorError;

/// Prefixes each segment with `[enriched]`.
///
/// While blocking, calls wait until unblocked; tests use this to hold or kill
/// a job in the middle of enrichment.
#[derive(Debug)]
pub struct MockEnricher {
    log: CallLog,
    faults: Faults,
    open: watch::Sender<bool>,
    empty_responses: AtomicBool,
}

impl MockEnricher {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            faults: Faults::default(),
            open: watch::channel(true).0,
            empty_responses: AtomicBool::new(false),
        }
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Unblocking wakes every waiting call.
    pub fn set_blocking(&self, blocking: bool) {
        self.open.send_replace(!blocking);
    }

    /// Return empty strings instead of enriched text.
    pub fn set_empty_responses(&self, empty: bool) {
        self.empty_responses.store(empty, Ordering::SeqCst);
    }
}

#[async_trait]
impl Enricher for MockEnricher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn enrich(&self, text: &str, context: &str) -> Result<String, CollaboratorError> {
        self.log.record("enrich", text);
        self.faults.check("enrich", text)?;

        let mut open = self.open.subscribe();
        while !*open.borrow_and_update() {
            if open.changed().await.is_err() {
                break;
            }
        }
        if self.empty_responses.load(Ordering::SeqCst) {
            return Ok(String::new());
        }
        if context.is_empty() {
            Ok(format!("[enriched] {}", text))
        } else {
            Ok(format!("[enriched: {}] {}", context, text))
        }
    }
}
