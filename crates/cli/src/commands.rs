//! Subcommand implementations.
//!
//! Every command returns `Ok(true)` when it fully succeeded. The caller maps
//! `Ok(false)` to a non-zero exit code.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use rtt_core::{
    build_channel_lister, build_collaborators, load_config, load_config_from_env,
    resolve_inputs, validate_config, BatchReport, Config, FsSidecarStore, JobOrchestrator,
    JobRecord, Scheduler, SidecarStore, SourceDefaults,
};

use crate::cli::{ProcessArgs, ResumeArgs, StatusArgs};
use crate::metrics::write_metrics_file;

/// Loads the configuration file, or defaults plus environment when none is given.
pub fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => load_config_from_env().context("Failed to load configuration"),
    }
}

/// Overrides shared by the batch commands.
#[derive(Debug, Default)]
struct Overrides {
    concurrency: Option<usize>,
    work_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    no_enrich: bool,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(concurrency) = self.concurrency {
            config.scheduler.concurrency = concurrency;
        }
        if let Some(work_dir) = self.work_dir {
            config.workspace.work_dir = work_dir;
        }
        if let Some(output_dir) = self.output_dir {
            config.workspace.output_dir = output_dir;
        }
        if self.no_enrich {
            config.orchestrator.enrich = false;
        }
    }
}

pub async fn process(mut config: Config, args: ProcessArgs) -> Result<bool> {
    Overrides {
        concurrency: args.concurrency,
        work_dir: args.work_dir,
        output_dir: args.output_dir,
        no_enrich: args.no_enrich,
    }
    .apply(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    let defaults = SourceDefaults {
        title: args.title,
        collection: args.collection,
        context: args.context.unwrap_or_default(),
    };
    let lister = build_channel_lister(&config);
    let jobs = resolve_inputs(&args.inputs, &defaults, lister.as_ref())
        .await
        .context("Failed to resolve inputs")?;
    info!(jobs = jobs.len(), "Inputs resolved");

    let scheduler = scheduler(&config);
    let report = run_until_interrupted(&scheduler, scheduler.run(jobs)).await;
    finish(&config, report).await
}

pub async fn resume(mut config: Config, args: ResumeArgs) -> Result<bool> {
    Overrides {
        concurrency: args.concurrency,
        work_dir: args.work_dir,
        output_dir: args.output_dir,
        no_enrich: false,
    }
    .apply(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    let scheduler = scheduler(&config);
    let report = run_until_interrupted(&scheduler, scheduler.resume_all())
        .await
        .context("Failed to discover sidecars")?;
    finish(&config, report).await
}

/// One line of `rtt status`.
#[derive(Debug, Serialize)]
struct StatusRow<'a> {
    id: &'a str,
    stage: &'a str,
    title: &'a str,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> StatusRow<'a> {
    fn new(record: &'a JobRecord) -> Self {
        Self {
            id: &record.id,
            stage: record.stage.as_str(),
            title: &record.title,
            source: record.source.locator(),
            error: record
                .error
                .as_ref()
                .map(|e| format!("{} failed ({}): {}", e.stage, e.kind, e.message)),
        }
    }
}

pub async fn status(mut config: Config, args: StatusArgs) -> Result<bool> {
    if let Some(work_dir) = args.work_dir {
        config.workspace.work_dir = work_dir;
    }

    let store = FsSidecarStore::new(&config.workspace.work_dir);
    let records = store
        .list()
        .await
        .with_context(|| format!("Failed to read sidecars in {:?}", store.root()))?;

    for record in &records {
        let row = StatusRow::new(record);
        if args.json {
            println!("{}", serde_json::to_string(&row)?);
        } else {
            println!("{:<24} {:<12} {}", row.id, row.stage, row.title);
            if let Some(error) = &row.error {
                println!("{:<24} {}", "", error);
            }
        }
    }
    if records.is_empty() && !args.json {
        println!("No jobs in {}", store.root().display());
    }
    Ok(true)
}

pub async fn channel(config: Config, url: &str) -> Result<bool> {
    let lister = build_channel_lister(&config);
    let entries = lister
        .list_channel(url)
        .await
        .with_context(|| format!("Failed to list channel {}", url))?;

    for entry in &entries {
        println!("{}\t{}", entry.video_id, entry.title);
    }
    info!(videos = entries.len(), "Channel listed");
    Ok(true)
}

pub async fn check(config: Config) -> Result<bool> {
    let mut ok = true;
    if let Err(e) = validate_config(&config) {
        println!("config            FAILED  {}", e);
        ok = false;
    } else {
        println!("config            ok");
    }

    let collaborators = build_collaborators(&config);
    for check in collaborators.preflight(config.orchestrator.enrich).await {
        match &check.result {
            Ok(()) => println!("{:<17} ok      {}", check.capability, check.implementation),
            Err(e) => {
                ok = false;
                println!(
                    "{:<17} FAILED  {}: {}",
                    check.capability, check.implementation, e
                );
            }
        }
    }
    Ok(ok)
}

// =============================================================================
// Batch helpers
// =============================================================================

fn scheduler(config: &Config) -> Scheduler {
    let store: Arc<dyn SidecarStore> =
        Arc::new(FsSidecarStore::new(&config.workspace.work_dir));
    let orchestrator = JobOrchestrator::new(
        config.orchestrator.clone(),
        config.workspace.output_dir.clone(),
        store,
        build_collaborators(config),
    );
    Scheduler::new(
        config
            .scheduler
            .clone()
            .with_failure_log(config.failure_log_path()),
        Arc::new(orchestrator),
    )
}

/// Drives `batch` to completion, asking the scheduler to stop admitting
/// jobs on Ctrl-C.
async fn run_until_interrupted<F>(scheduler: &Scheduler, batch: F) -> F::Output
where
    F: std::future::Future,
{
    let shutdown = scheduler.shutdown_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted: finishing running jobs, no new jobs will start");
            shutdown.shutdown();
        }
    });
    let output = batch.await;
    interrupt.abort();
    output
}

async fn finish(config: &Config, report: BatchReport) -> Result<bool> {
    for (job_id, failure) in &report.failed {
        println!(
            "FAILED  {}  at {} ({}): {}",
            job_id, failure.stage, failure.kind, failure.message
        );
    }
    if !report.deferred.is_empty() {
        println!(
            "DEFERRED {} job(s); run `rtt resume` or process them again",
            report.deferred.len()
        );
    }
    println!(
        "{} succeeded, {} failed, {} deferred",
        report.succeeded.len(),
        report.failed.len(),
        report.deferred.len()
    );

    if let Some(path) = &config.telemetry.metrics_file {
        write_metrics_file(path).await?;
    }
    Ok(report.is_success())
}
