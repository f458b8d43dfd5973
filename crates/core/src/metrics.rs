//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Jobs (finished by result, in flight, stage transitions, stage durations)
//! - Collaborator retries
//! - Heavy media files currently on disk

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs finished by result.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rtt_jobs_finished_total", "Total jobs finished"),
        &["result"], // "packaged", "skipped", "failed"
    )
    .unwrap()
});

/// Stage transitions persisted, by target stage.
pub static STAGE_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rtt_stage_transitions_total",
            "Total persisted stage transitions",
        ),
        &["stage"],
    )
    .unwrap()
});

/// Time spent reaching a stage, in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("rtt_stage_duration_seconds", "Duration of each pipeline stage")
            .buckets(vec![
                1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0,
            ]),
        &["stage"],
    )
    .unwrap()
});

/// Jobs admitted by the scheduler and not yet finished.
pub static JOBS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("rtt_jobs_in_flight", "Jobs currently running").unwrap()
});

// =============================================================================
// Collaborators
// =============================================================================

/// Retries of collaborator calls, by capability.
pub static COLLABORATOR_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "rtt_collaborator_retries_total",
            "Total retried collaborator calls",
        ),
        &["capability"], // "download", "transcribe", "enrich", "embed", "extract_frames", "package"
    )
    .unwrap()
});

// =============================================================================
// Disk
// =============================================================================

/// Heavy media files (audio or video) currently recorded on disk.
pub static HEAVY_FILES_RESIDENT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "rtt_heavy_files_resident",
        "Heavy media files currently held by running jobs",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_FINISHED.clone()),
        Box::new(STAGE_TRANSITIONS.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(JOBS_IN_FLIGHT.clone()),
        // Collaborators
        Box::new(COLLABORATOR_RETRIES.clone()),
        // Disk
        Box::new(HEAVY_FILES_RESIDENT.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        JOBS_FINISHED.with_label_values(&["packaged"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "rtt_jobs_finished_total"));
    }
}
