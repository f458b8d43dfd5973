//! Scripted failures for mock collaborators.

use std::sync::{Arc, Mutex};

use super::call_log::lock;
use crate::error::CollaboratorError;

/// Kind of error a scripted failure produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Retryable service error.
    Transient,
    /// Non-retryable input error.
    Fatal,
    /// The call panics.
    Panic,
}

impl FailureMode {
    fn error(self, capability: &str, subject: &str) -> CollaboratorError {
        match self {
            FailureMode::Transient => {
                CollaboratorError::transient(capability, format!("scripted failure for {}", subject))
            }
            FailureMode::Fatal => {
                CollaboratorError::fatal(format!("scripted {} failure for {}", capability, subject))
            }
            FailureMode::Panic => panic!("scripted {} panic for {}", capability, subject),
        }
    }
}

#[derive(Debug)]
struct FaultRule {
    /// Only calls whose subject contains this string fail.
    pattern: Option<String>,
    mode: FailureMode,
    /// Remaining failures; `None` fails forever.
    remaining: Option<u32>,
}

/// Failure script of one mock. Rules are checked in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    rules: Arc<Mutex<Vec<FaultRule>>>,
}

impl Faults {
    /// Every call fails.
    pub fn fail_always(&self, mode: FailureMode) {
        self.push(None, mode, None);
    }

    /// Calls whose subject contains `pattern` fail.
    pub fn fail_matching(&self, pattern: impl Into<String>, mode: FailureMode) {
        self.push(Some(pattern.into()), mode, None);
    }

    /// The next `times` calls fail, later ones succeed.
    pub fn fail_times(&self, times: u32, mode: FailureMode) {
        self.push(None, mode, Some(times));
    }

    pub fn clear(&self) {
        lock(&self.rules).clear();
    }

    fn push(&self, pattern: Option<String>, mode: FailureMode, remaining: Option<u32>) {
        lock(&self.rules).push(FaultRule {
            pattern,
            mode,
            remaining,
        });
    }

    /// Returns the scripted error for this call, if any.
    pub(crate) fn check(&self, capability: &str, subject: &str) -> Result<(), CollaboratorError> {
        let mut rules = lock(&self.rules);
        for rule in rules.iter_mut() {
            let matches = rule
                .pattern
                .as_deref()
                .is_none_or(|pattern| subject.contains(pattern));
            if !matches {
                continue;
            }
            match rule.remaining.as_mut() {
                Some(0) => continue,
                Some(n) => *n -= 1,
                None => {}
            }
            return Err(rule.mode.error(capability, subject));
        }
        Ok(())
    }
}
