//! Shared record of collaborator calls.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One collaborator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// `download`, `transcribe`, `enrich`, `embed`, `extract_frames` or `package`.
    pub capability: &'static str,
    /// What the call was about: a locator, a media path, a text, a job id.
    pub subject: String,
}

/// Global order of collaborator calls across every mock sharing this log.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, capability: &'static str, subject: impl Into<String>) {
        lock(&self.calls).push(Call {
            capability,
            subject: subject.into(),
        });
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, capability: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.capability == capability)
            .count()
    }

    /// Subjects of the calls to one capability, in order.
    pub fn subjects(&self, capability: &str) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.capability == capability)
            .map(|c| c.subject.clone())
            .collect()
    }

    /// Capabilities in call order with consecutive repeats collapsed.
    pub fn sequence(&self) -> Vec<&'static str> {
        let mut sequence: Vec<&'static str> = Vec::new();
        for call in lock(&self.calls).iter() {
            if sequence.last() != Some(&call.capability) {
                sequence.push(call.capability);
            }
        }
        sequence
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.calls).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

/// Locks a mock's state, ignoring poisoning from a panicked test task.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
