//! Job orchestrator implementation.
//!
//! Drives one job through the stage machine:
//! - Acquire audio (remote only) -> `Downloaded`
//! - Transcribe, then delete the audio -> `Transcribed`
//! - Enrich (or copy raw text) -> `Enriched`
//! - Fetch video (remote only), extract frames, delete the video, embed -> `Embedded`
//! - Package, then remove every intermediate -> `Ready`
//!
//! The sidecar is saved once per transition and never mid-stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, error, info, warn};

use super::config::OrchestratorConfig;
use super::disk::DiskBudget;
use super::retry::with_retry;
use super::types::{JobOutcome, OrchestratorError};
use crate::collaborators::Collaborators;
use crate::downloader::MediaKind;
use crate::job::{
    is_valid_job_id, read_json, write_json_atomic, JobFailure, JobRecord, JobSource, JobSpec,
    Segment, SidecarError, SidecarStore, Stage,
};
use crate::metrics;
use crate::packager::{JobMetadata, ARTIFACT_EXTENSION};

/// Segment table written after transcription.
pub const TRANSCRIPT_FILE: &str = "transcript.json";
/// Segment table written after enrichment.
pub const ENRICHED_FILE: &str = "enriched.json";
/// Segment table written after embedding.
pub const EMBEDDINGS_FILE: &str = "embeddings.json";
/// Frame images, one per segment.
pub const FRAMES_DIR: &str = "frames";

/// Drives jobs through the pipeline. One instance can run many jobs; the
/// scheduler guarantees no two runs share a job id at the same time.
pub struct JobOrchestrator {
    config: OrchestratorConfig,
    output_dir: PathBuf,
    store: Arc<dyn SidecarStore>,
    collaborators: Collaborators,
}

impl JobOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        output_dir: impl Into<PathBuf>,
        store: Arc<dyn SidecarStore>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
            store,
            collaborators,
        }
    }

    /// Where the artifact for `job_id` is written.
    pub fn artifact_path(&self, job_id: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", job_id, ARTIFACT_EXTENSION))
    }

    pub fn store(&self) -> &Arc<dyn SidecarStore> {
        &self.store
    }

    /// Runs a job to completion or failure, resuming from its sidecar if one
    /// exists. Never panics on collaborator errors; every failure is recorded
    /// in the sidecar and returned as [`JobOutcome::Failed`].
    pub async fn run(&self, spec: &JobSpec) -> JobOutcome {
        // Ids become paths under the work dir; nothing is read or removed for
        // an id that would resolve elsewhere.
        if !is_valid_job_id(&spec.id) {
            let err = OrchestratorError::FatalInput(format!("invalid job id {:?}", spec.id));
            let outcome = JobOutcome::Failed(failure_of(&spec.id, Stage::New, &err));
            metrics::JOBS_FINISHED
                .with_label_values(&[outcome.as_str()])
                .inc();
            return outcome;
        }

        let outcome = match self.store.load(&spec.id).await {
            Ok(Some(record)) => self.drive(record).await,
            Ok(None) => {
                let artifact = self.artifact_path(&spec.id);
                if artifact.exists() {
                    info!(job_id = %spec.id, artifact = %artifact.display(), "Already packaged, skipping");
                    JobOutcome::AlreadyPackaged { artifact }
                } else {
                    self.start(spec).await
                }
            }
            Err(e) => self.fail(&spec.id, Stage::New, e.into()).await,
        };

        metrics::JOBS_FINISHED
            .with_label_values(&[outcome.as_str()])
            .inc();
        outcome
    }

    /// Persists a fresh record, then drives it.
    async fn start(&self, spec: &JobSpec) -> JobOutcome {
        let record = JobRecord::new(spec);
        if let Err(e) = self.store.save(&record).await {
            return self.fail(&spec.id, Stage::New, e.into()).await;
        }
        info!(job_id = %record.id, source = %record.source, "Job created");
        self.drive(record).await
    }

    async fn drive(&self, mut record: JobRecord) -> JobOutcome {
        let job_dir = self.store.job_dir(&record.id);
        let budget = DiskBudget::for_job(&job_dir);
        let artifact = self.artifact_path(&record.id);

        if record.stage == Stage::Ready {
            info!(job_id = %record.id, "Found packaged job, finishing cleanup");
            self.cleanup(&record, &job_dir).await;
            return JobOutcome::AlreadyPackaged { artifact };
        }

        let next = next_stage(&record);
        if let Err(e) = self.check_consistency(&record) {
            return self.fail(&record.id, next, e).await;
        }

        for orphan in budget.sweep_orphans(&record).await {
            debug!(job_id = %record.id, path = %orphan.display(), "Swept before resume");
        }
        budget.adopt(&record);

        if record.stage > Stage::New {
            info!(job_id = %record.id, stage = %record.stage, "Resuming job");
        }

        let mut attempting = next;
        match self
            .advance_all(&mut record, &job_dir, &budget, &artifact, &mut attempting)
            .await
        {
            Ok(()) => {
                self.cleanup(&record, &job_dir).await;
                info!(job_id = %record.id, artifact = %artifact.display(), "Job packaged");
                JobOutcome::Packaged { artifact }
            }
            Err(e) => self.fail(&record.id, attempting, e).await,
        }
    }

    async fn advance_all(
        &self,
        record: &mut JobRecord,
        job_dir: &Path,
        budget: &DiskBudget,
        artifact: &Path,
        attempting: &mut Stage,
    ) -> Result<(), OrchestratorError> {
        if let JobSource::LocalFile { path } = &record.source {
            if record.stage < Stage::Embedded && !path.exists() {
                return Err(OrchestratorError::FatalInput(format!(
                    "local file not found: {}",
                    path.display()
                )));
            }
        }

        if record.source.is_remote() && record.stage < Stage::Downloaded {
            *attempting = Stage::Downloaded;
            self.acquire_audio(record, budget).await?;
        }
        if record.stage < Stage::Transcribed {
            *attempting = Stage::Transcribed;
            self.transcribe(record, job_dir, budget).await?;
        }
        if record.stage < Stage::Enriched {
            *attempting = Stage::Enriched;
            self.enrich(record, job_dir).await?;
        }
        if record.stage < Stage::Embedded {
            *attempting = Stage::Embedded;
            self.extract_and_embed(record, job_dir, budget).await?;
        }
        *attempting = Stage::Ready;
        self.package(record, artifact).await
    }

    // ========================================================================
    // Stages
    // ========================================================================

    /// Step 1: audio-only download for remote sources.
    async fn acquire_audio(
        &self,
        record: &mut JobRecord,
        budget: &DiskBudget,
    ) -> Result<(), OrchestratorError> {
        let started = Instant::now();
        let media_dir = budget.admit(record, MediaKind::Audio)?.to_path_buf();

        let source = record.source.clone();

        let downloader = &self.collaborators.downloader;
        let path = with_retry(&self.config.retry, "download", || {
            downloader.fetch(&source, MediaKind::Audio, &media_dir)
        })
        .await
        .map_err(|e| OrchestratorError::collaborator("download", e))?;

        budget.hold(record, MediaKind::Audio, path)?;
        self.transition(record, Stage::Downloaded, started).await
    }

    /// Step 2: transcription. The audio is released before the transition is
    /// persisted and deleted right after.
    async fn transcribe(
        &self,
        record: &mut JobRecord,
        job_dir: &Path,
        budget: &DiskBudget,
    ) -> Result<(), OrchestratorError> {
        let started = Instant::now();
        let media = match &record.source {
            JobSource::LocalFile { path } => path.clone(),
            _ => record.artifacts.audio_path.clone().ok_or_else(|| {
                OrchestratorError::ResumeConflict(format!(
                    "job {} is {} but has no audio recorded",
                    record.id, record.stage
                ))
            })?,
        };

        let transcriber = &self.collaborators.transcriber;
        let spans = with_retry(&self.config.retry, "transcribe", || {
            transcriber.transcribe(&media)
        })
        .await
        .map_err(|e| OrchestratorError::collaborator("transcribe", e))?;

        let segments: Vec<Segment> = spans
            .into_iter()
            .filter(|span| !span.text.trim().is_empty())
            .enumerate()
            .map(|(i, span)| {
                Segment::new(
                    &record.id,
                    i,
                    span.start_seconds,
                    span.end_seconds,
                    span.text.trim(),
                )
            })
            .collect();

        if segments.is_empty() {
            return Err(OrchestratorError::FatalInput(format!(
                "transcription of {} produced no segments",
                media.display()
            )));
        }

        let table = job_dir.join(TRANSCRIPT_FILE);
        write_json_atomic(&table, &segments).await?;
        record.artifacts.transcript = Some(table);
        debug!(job_id = %record.id, segments = segments.len(), "Transcript written");

        let released = budget.release(record, MediaKind::Audio);
        self.transition(record, Stage::Transcribed, started).await?;
        if let Some(audio) = released {
            budget.discard(&audio).await;
        }
        Ok(())
    }

    /// Step 3: enrichment, fanned out per segment.
    async fn enrich(&self, record: &mut JobRecord, job_dir: &Path) -> Result<(), OrchestratorError> {
        let started = Instant::now();
        let mut segments = self.load_table(record.artifacts.transcript.as_deref(), record).await?;

        if self.config.enrich {
            let enricher = &self.collaborators.enricher;
            let context = record.context.as_str();
            let policy = &self.config.retry;

            let raw: Vec<String> = segments.iter().map(|s| s.transcript_raw.clone()).collect();
            let enriched: Vec<String> = stream::iter(raw)
                .map(|text| async move {
                    with_retry(policy, "enrich", || enricher.enrich(&text, context))
                    .await
                    .map_err(|e| OrchestratorError::collaborator("enrich", e))
                })
                .buffered(self.config.segment_concurrency.max(1))
                .try_collect()
                .await?;

            for (segment, text) in segments.iter_mut().zip(enriched) {
                segment.transcript_enriched = if text.trim().is_empty() {
                    Some(segment.transcript_raw.clone())
                } else {
                    Some(text)
                };
            }
        } else {
            debug!(job_id = %record.id, "Enrichment disabled, copying raw transcript");
            for segment in &mut segments {
                segment.transcript_enriched = Some(segment.transcript_raw.clone());
            }
        }

        let table = job_dir.join(ENRICHED_FILE);
        write_json_atomic(&table, &segments).await?;
        record.artifacts.enriched_segments = Some(table);
        self.transition(record, Stage::Enriched, started).await
    }

    /// Step 4: video (remote only), frames, embeddings. Restarts as a whole
    /// when resumed.
    async fn extract_and_embed(
        &self,
        record: &mut JobRecord,
        job_dir: &Path,
        budget: &DiskBudget,
    ) -> Result<(), OrchestratorError> {
        let started = Instant::now();
        let mut segments = self
            .load_table(record.artifacts.enriched_segments.as_deref(), record)
            .await?;

        let frames_dir = job_dir.join(FRAMES_DIR);
        remove_dir_if_present(&frames_dir).await?;

        let video = match record.source.local_path() {
            Some(path) => path.to_path_buf(),
            None => self.acquire_video(record, budget).await?,
        };

        let timestamps: Vec<u64> = segments.iter().map(Segment::start_millis).collect();
        let extractor = &self.collaborators.frame_extractor;
        let frames = with_retry(&self.config.retry, "extract_frames", || {
            extractor.extract(&video, &timestamps, &frames_dir)
        })
        .await
        .map_err(|e| OrchestratorError::collaborator("extract_frames", e))?;

        if let Some(video) = budget.release(record, MediaKind::Video) {
            budget.discard(&video).await;
        }

        let mut missing = 0;
        for segment in &mut segments {
            segment.frame_path = frames
                .get(&segment.start_millis())
                .and_then(|path| path.file_name())
                .map(|name| format!("{}/{}", FRAMES_DIR, name.to_string_lossy()));
            if segment.frame_path.is_none() {
                missing += 1;
            }
        }
        if missing > 0 {
            warn!(job_id = %record.id, missing, "Some segments have no frame");
        }
        record.artifacts.frames_dir = Some(frames_dir);

        let embedder = &self.collaborators.embedder;
        let dimension = embedder.dimension();
        let policy = &self.config.retry;
        let inputs: Vec<(String, String)> = segments
            .iter()
            .map(|s| (s.segment_id.clone(), s.index_text().to_string()))
            .collect();
        let vectors: Vec<Vec<f32>> = stream::iter(inputs)
            .map(|(segment_id, text)| async move {
                let vector = with_retry(policy, "embed", || embedder.embed(&text))
                    .await
                    .map_err(|e| OrchestratorError::collaborator("embed", e))?;
                if vector.len() != dimension {
                    return Err(OrchestratorError::FatalInput(format!(
                        "embedding for {} has {} dimensions, expected {}",
                        segment_id,
                        vector.len(),
                        dimension
                    )));
                }
                Ok(vector)
            })
            .buffered(self.config.segment_concurrency.max(1))
            .try_collect()
            .await?;

        for (segment, vector) in segments.iter_mut().zip(vectors) {
            segment.embedding = Some(vector);
        }

        let table = job_dir.join(EMBEDDINGS_FILE);
        write_json_atomic(&table, &segments).await?;
        record.artifacts.embeddings = Some(table);
        self.transition(record, Stage::Embedded, started).await
    }

    /// Full video download for frame extraction. Not a stage of its own: the
    /// video is never persisted past the step that consumes it.
    async fn acquire_video(
        &self,
        record: &mut JobRecord,
        budget: &DiskBudget,
    ) -> Result<PathBuf, OrchestratorError> {
        let media_dir = budget.admit(record, MediaKind::Video)?.to_path_buf();
        let source = record.source.clone();

        let downloader = &self.collaborators.downloader;
        let path = with_retry(&self.config.retry, "download", || {
            downloader.fetch(&source, MediaKind::Video, &media_dir)
        })
        .await
        .map_err(|e| OrchestratorError::collaborator("download", e))?;

        budget.hold(record, MediaKind::Video, path.clone())?;
        Ok(path)
    }

    /// Step 5: package the artifact and persist `Ready`.
    async fn package(&self, record: &mut JobRecord, artifact: &Path) -> Result<(), OrchestratorError> {
        let started = Instant::now();
        let segments = self
            .load_table(record.artifacts.embeddings.as_deref(), record)
            .await?;

        let metadata = JobMetadata {
            job_id: record.id.clone(),
            title: record.title.clone(),
            source_url: record.source.locator(),
            collection: record.collection.clone(),
            context: record.context.clone(),
            duration_seconds: segments
                .iter()
                .map(|s| s.end_seconds)
                .fold(0.0, f64::max),
            segment_count: segments.len(),
            embedding_dimension: self.collaborators.embedder.dimension(),
            packaged_at: Utc::now(),
        };

        let packager = &self.collaborators.packager;
        let frames_dir = record.artifacts.frames_dir.as_deref();
        with_retry(&self.config.retry, "package", || {
            packager.package(&metadata, &segments, frames_dir, artifact)
        })
        .await
        .map_err(|e| OrchestratorError::collaborator("package", e))?;

        self.transition(record, Stage::Ready, started).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Advances and persists the record.
    async fn transition(
        &self,
        record: &mut JobRecord,
        stage: Stage,
        started: Instant,
    ) -> Result<(), OrchestratorError> {
        record.advance(stage)?;
        self.store.save(record).await?;

        let elapsed = started.elapsed();
        metrics::STAGE_TRANSITIONS
            .with_label_values(&[stage.as_str()])
            .inc();
        metrics::STAGE_DURATION
            .with_label_values(&[stage.as_str()])
            .observe(elapsed.as_secs_f64());
        info!(
            job_id = %record.id,
            stage = %stage,
            elapsed_ms = elapsed.as_millis() as u64,
            "Stage complete"
        );
        Ok(())
    }

    async fn load_table(
        &self,
        path: Option<&Path>,
        record: &JobRecord,
    ) -> Result<Vec<Segment>, OrchestratorError> {
        let path = path.ok_or_else(|| {
            OrchestratorError::ResumeConflict(format!(
                "job {} is {} but a segment table is not recorded",
                record.id, record.stage
            ))
        })?;
        read_json(path).await?.ok_or_else(|| {
            OrchestratorError::ResumeConflict(format!(
                "job {}: segment table {} is missing",
                record.id,
                path.display()
            ))
        })
    }

    /// Verifies a loaded record against the files it points at.
    fn check_consistency(&self, record: &JobRecord) -> Result<(), OrchestratorError> {
        DiskBudget::check(record)?;

        let conflict = |what: &str| {
            Err(OrchestratorError::ResumeConflict(format!(
                "job {} is {} but {}",
                record.id, record.stage, what
            )))
        };
        let present = |path: &Option<PathBuf>| path.as_deref().is_some_and(Path::exists);
        let artifacts = &record.artifacts;

        if record.source.is_remote()
            && record.stage == Stage::Downloaded
            && !present(&artifacts.audio_path)
        {
            return conflict("its audio file is missing");
        }
        if record.stage >= Stage::Transcribed && !present(&artifacts.transcript) {
            return conflict("its transcript is missing");
        }
        if record.stage >= Stage::Enriched && !present(&artifacts.enriched_segments) {
            return conflict("its enriched segments are missing");
        }
        if record.stage >= Stage::Embedded
            && (!present(&artifacts.embeddings) || !present(&artifacts.frames_dir))
        {
            return conflict("its embeddings or frames are missing");
        }
        Ok(())
    }

    /// Records a failure on the last persisted record and sweeps orphans.
    async fn fail(&self, job_id: &str, stage: Stage, err: OrchestratorError) -> JobOutcome {
        JobOutcome::Failed(self.persist_failure(job_id, stage, err).await)
    }

    async fn persist_failure(
        &self,
        job_id: &str,
        stage: Stage,
        err: OrchestratorError,
    ) -> JobFailure {
        let failure = failure_of(job_id, stage, &err);
        let budget = DiskBudget::for_job(&self.store.job_dir(job_id));
        match self.store.load(job_id).await {
            Ok(Some(mut persisted)) => {
                persisted.fail(failure.clone());
                if let Err(e) = self.store.save(&persisted).await {
                    warn!(job_id, error = %e, "Failed to record job failure");
                }
                budget.sweep_orphans(&persisted).await;
            }
            Ok(None) => {}
            Err(e) => warn!(job_id, error = %e, "Cannot reload sidecar to record failure"),
        }

        failure
    }

    /// Records the failure of a run that ended without an outcome, such as a
    /// panicked task. The failure is attributed to the stage after the last
    /// persisted one and saved on the sidecar, and orphaned media is swept.
    pub async fn record_abort(&self, spec: &JobSpec, reason: &str) -> JobFailure {
        let err = OrchestratorError::FatalInput(format!("job task panicked: {}", reason));
        if !is_valid_job_id(&spec.id) {
            return failure_of(&spec.id, Stage::New, &err);
        }

        let stage = match self.store.load(&spec.id).await {
            Ok(Some(record)) => next_stage(&record),
            _ => Stage::New,
        };
        metrics::JOBS_FINISHED.with_label_values(&["failed"]).inc();
        self.persist_failure(&spec.id, stage, err).await
    }

    /// Removes intermediates, the sidecar and the job directory. Failures are
    /// logged and never fail the job.
    async fn cleanup(&self, record: &JobRecord, job_dir: &Path) {
        for path in record.artifacts.all_paths() {
            let result = if path.is_dir() {
                tokio::fs::remove_dir_all(path).await
            } else {
                tokio::fs::remove_file(path).await
            };
            match result {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove intermediate"),
            }
        }

        if let Err(e) = self.store.delete(&record.id).await {
            warn!(job_id = %record.id, error = %e, "Failed to delete sidecar");
            return;
        }

        match tokio::fs::remove_dir_all(job_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %job_dir.display(), error = %e, "Failed to remove job dir"),
        }
        debug!(job_id = %record.id, "Intermediates removed");
    }
}

/// Builds and logs the failure record for `err`.
fn failure_of(job_id: &str, stage: Stage, err: &OrchestratorError) -> JobFailure {
    let failure = JobFailure {
        stage,
        kind: err.kind(),
        message: err.to_string(),
        attempt_count: err.attempts(),
        at: Utc::now(),
    };
    error!(
        job_id,
        stage = %stage,
        kind = %failure.kind,
        attempts = failure.attempt_count,
        error = %err,
        "Job failed"
    );
    failure
}

/// The stage a record is working towards.
fn next_stage(record: &JobRecord) -> Stage {
    match record.stage {
        Stage::New if record.source.is_remote() => Stage::Downloaded,
        Stage::New | Stage::Downloaded => Stage::Transcribed,
        Stage::Transcribed => Stage::Enriched,
        Stage::Enriched => Stage::Embedded,
        Stage::Embedded | Stage::Ready => Stage::Ready,
    }
}

async fn remove_dir_if_present(dir: &Path) -> Result<(), OrchestratorError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SidecarError::io(dir, e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: JobSource, stage: Stage) -> JobRecord {
        let mut record = JobRecord::new(&JobSpec {
            id: "job".to_string(),
            source,
            collection: "c".to_string(),
            title: "t".to_string(),
            context: String::new(),
        });
        record.stage = stage;
        record
    }

    #[test]
    fn test_next_stage() {
        let remote = JobSource::RemoteUrl {
            url: "https://example.com/a.mp4".to_string(),
        };
        let local = JobSource::LocalFile {
            path: "/v/a.mp4".into(),
        };

        assert_eq!(next_stage(&record(remote.clone(), Stage::New)), Stage::Downloaded);
        assert_eq!(next_stage(&record(local.clone(), Stage::New)), Stage::Transcribed);
        assert_eq!(next_stage(&record(remote.clone(), Stage::Downloaded)), Stage::Transcribed);
        assert_eq!(next_stage(&record(local, Stage::Enriched)), Stage::Embedded);
        assert_eq!(next_stage(&record(remote, Stage::Embedded)), Stage::Ready);
    }
}
