//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the batch scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Jobs allowed to run at once. 1 means strictly sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// JSON-lines log of failed jobs. Defaults to `<output_dir>/failures.jsonl`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_log: Option<PathBuf>,
}

fn default_concurrency() -> usize {
    2
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            failure_log: None,
        }
    }
}

impl SchedulerConfig {
    /// Sets the number of concurrent jobs.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the failure log path.
    pub fn with_failure_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.failure_log = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.concurrency, 2);
        assert!(config.failure_log.is_none());
    }

    #[test]
    fn test_deserialize() {
        let toml = r#"
            concurrency = 6
            failure_log = "/var/log/rtt/failures.jsonl"
        "#;
        let config: SchedulerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.concurrency, 6);
        assert_eq!(
            config.failure_log,
            Some(PathBuf::from("/var/log/rtt/failures.jsonl"))
        );
    }
}
