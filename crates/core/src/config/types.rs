use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::downloader::DownloaderConfig;
use crate::embedder::EmbedderConfig;
use crate::enricher::EnricherConfig;
use crate::frames::FramesConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::packager::PackagerConfig;
use crate::scheduler::SchedulerConfig;
use crate::transcriber::TranscriberConfig;

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub transcriber: TranscriberConfig,
    #[serde(default)]
    pub enricher: EnricherConfig,
    #[serde(default)]
    pub embedder: EmbedderConfig,
    #[serde(default)]
    pub frames: FramesConfig,
    #[serde(default)]
    pub packager: PackagerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Where failed jobs are logged.
    pub fn failure_log_path(&self) -> PathBuf {
        self.scheduler
            .failure_log
            .clone()
            .unwrap_or_else(|| self.workspace.output_dir.join("failures.jsonl"))
    }
}

/// Directories used by the pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Per-job working directories and sidecars.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Finished `.rtt` artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("work")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Telemetry output.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Write Prometheus text exposition here after each batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::DownloaderBackend;
    use crate::transcriber::TranscriberBackend;

    #[test]
    fn test_deserialize_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.workspace.work_dir, PathBuf::from("work"));
        assert_eq!(config.workspace.output_dir, PathBuf::from("."));
        assert_eq!(config.scheduler.concurrency, 2);
        assert!(config.orchestrator.enrich);
        assert!(config.telemetry.metrics_file.is_none());
    }

    #[test]
    fn test_deserialize_sections() {
        let toml = r#"
[workspace]
work_dir = "/data/work"
output_dir = "/data/out"

[scheduler]
concurrency = 4

[orchestrator]
enrich = false

[orchestrator.retry]
max_attempts = 5

[downloader]
backend = "http"

[transcriber]
backend = "assembly_ai"

[embedder]
dimension = 384

[telemetry]
metrics_file = "/data/metrics.prom"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.workspace.work_dir, PathBuf::from("/data/work"));
        assert_eq!(config.scheduler.concurrency, 4);
        assert!(!config.orchestrator.enrich);
        assert_eq!(config.orchestrator.retry.max_attempts, 5);
        assert_eq!(config.downloader.backend, DownloaderBackend::Http);
        assert_eq!(config.transcriber.backend, TranscriberBackend::AssemblyAi);
        assert_eq!(config.embedder.dimension, 384);
        assert_eq!(
            config.telemetry.metrics_file,
            Some(PathBuf::from("/data/metrics.prom"))
        );
    }

    #[test]
    fn test_failure_log_defaults_to_output_dir() {
        let mut config = Config::default();
        config.workspace.output_dir = PathBuf::from("/out");
        assert_eq!(config.failure_log_path(), PathBuf::from("/out/failures.jsonl"));

        config.scheduler.failure_log = Some(PathBuf::from("/logs/f.jsonl"));
        assert_eq!(config.failure_log_path(), PathBuf::from("/logs/f.jsonl"));
    }
}
