//! Batch scheduler implementation.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::SchedulerConfig;
use super::failure_log::{FailureEntry, FailureLog};
use super::types::{BatchReport, ShutdownHandle};
use crate::job::{JobFailure, JobSpec, SidecarError};
use crate::metrics;
use crate::orchestrator::{JobOrchestrator, JobOutcome};

/// Runs batches of jobs with bounded concurrency.
pub struct Scheduler {
    config: SchedulerConfig,
    orchestrator: Arc<JobOrchestrator>,
    failure_log: Option<FailureLog>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, orchestrator: Arc<JobOrchestrator>) -> Self {
        let failure_log = config.failure_log.as_ref().map(FailureLog::new);
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            orchestrator,
            failure_log,
            shutdown: Arc::new(shutdown),
        }
    }

    /// Handle that stops admission of new jobs.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(Arc::clone(&self.shutdown))
    }

    /// Runs every job and waits for all admitted ones to finish.
    ///
    /// Jobs are admitted in order, at most `concurrency` at a time. A job's
    /// failure never affects the others.
    pub async fn run(&self, jobs: Vec<JobSpec>) -> BatchReport {
        let mut report = BatchReport::default();
        let jobs = dedupe(jobs);
        let concurrency = self.config.concurrency.max(1);
        info!(jobs = jobs.len(), concurrency, "Starting batch");

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut running: Vec<(JobSpec, JoinHandle<JobOutcome>)> = Vec::with_capacity(jobs.len());

        for spec in jobs {
            if *shutdown_rx.borrow() {
                report.deferred.insert(spec.id);
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown_rx) => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                report.deferred.insert(spec.id);
                continue;
            };

            let orchestrator = Arc::clone(&self.orchestrator);
            let task_spec = spec.clone();
            metrics::JOBS_IN_FLIGHT.inc();
            let handle = tokio::spawn(async move {
                let outcome = orchestrator.run(&task_spec).await;
                metrics::JOBS_IN_FLIGHT.dec();
                drop(permit);
                outcome
            });
            running.push((spec, handle));
        }

        if !report.deferred.is_empty() {
            warn!(deferred = report.deferred.len(), "Shutdown requested, jobs not started");
        }

        for (spec, handle) in running {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    metrics::JOBS_IN_FLIGHT.dec();
                    error!(job_id = %spec.id, error = %e, "Job task aborted");
                    JobOutcome::Failed(self.orchestrator.record_abort(&spec, &e.to_string()).await)
                }
            };

            match outcome {
                JobOutcome::Packaged { .. } | JobOutcome::AlreadyPackaged { .. } => {
                    report.succeeded.insert(spec.id);
                }
                JobOutcome::Failed(failure) => {
                    self.log_failure(&spec, &failure).await;
                    report.failed.insert(spec.id, failure);
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            deferred = report.deferred.len(),
            "Batch finished"
        );
        report
    }

    /// Runs every job that has a sidecar in the work directory.
    pub async fn resume_all(&self) -> Result<BatchReport, SidecarError> {
        let records = self.orchestrator.store().list().await?;
        info!(jobs = records.len(), "Resuming jobs from sidecars");
        let specs = records.iter().map(|record| record.spec()).collect();
        Ok(self.run(specs).await)
    }

    async fn log_failure(&self, spec: &JobSpec, failure: &JobFailure) {
        let Some(log) = &self.failure_log else {
            return;
        };
        if let Err(e) = log.append(&FailureEntry::new(spec, failure)).await {
            warn!(path = %log.path().display(), error = %e, "Failed to append to failure log");
        }
    }
}

/// Keeps the first job of every id.
fn dedupe(jobs: Vec<JobSpec>) -> Vec<JobSpec> {
    let mut seen = HashSet::new();
    jobs.into_iter()
        .filter(|spec| {
            let first = seen.insert(spec.id.clone());
            if !first {
                warn!(job_id = %spec.id, source = %spec.source, "Duplicate job ignored");
            }
            first
        })
        .collect()
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobSource;

    fn spec(id: &str, url: &str) -> JobSpec {
        JobSpec {
            id: id.to_string(),
            source: JobSource::RemoteUrl {
                url: url.to_string(),
            },
            collection: "c".to_string(),
            title: id.to_string(),
            context: String::new(),
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let jobs = vec![
            spec("a", "https://example.com/1.mp4"),
            spec("b", "https://example.com/2.mp4"),
            spec("a", "https://example.com/3.mp4"),
        ];
        let deduped = dedupe(jobs);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, "a");
        assert_eq!(deduped[0].source.locator(), "https://example.com/1.mp4");
        assert_eq!(deduped[1].id, "b");
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_returns_after_signal() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { wait_for_shutdown(&mut rx).await });
        tx.send_replace(true);
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
