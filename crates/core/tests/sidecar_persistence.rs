//! Sidecar persistence integration tests.
//!
//! A job stopped at any stage boundary resumes there: completed stages are
//! never repeated, and the sidecar on disk always reflects the last completed
//! stage.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use rtt_core::{
    job::{FsSidecarStore, JobRecord, SIDECAR_FILE},
    orchestrator::{JobOrchestrator, OrchestratorConfig, RetryPolicy},
    testing::{fixtures, FailureMode, MockCollaborators, RecordingSidecarStore},
    SidecarStore, Stage,
};

fn orchestrator(
    store: Arc<RecordingSidecarStore>,
    output_dir: PathBuf,
    mocks: &MockCollaborators,
) -> JobOrchestrator {
    JobOrchestrator::new(
        OrchestratorConfig::default().with_retry(RetryPolicy::immediate(1)),
        output_dir,
        store,
        mocks.collaborators(),
    )
}

/// Makes the step that leads to `stage` fail for a remote job.
fn fail_step_towards(stage: Stage, mocks: &MockCollaborators) {
    let faults = match stage {
        Stage::Downloaded => mocks.downloader.faults(),
        Stage::Transcribed => mocks.transcriber.faults(),
        Stage::Enriched => mocks.enricher.faults(),
        Stage::Embedded => mocks.embedder.faults(),
        Stage::Ready => mocks.packager.faults(),
        Stage::New => unreachable!(),
    };
    faults.fail_always(FailureMode::Fatal);
}

#[tokio::test]
async fn test_resume_from_every_stage_boundary() {
    let cases = [
        (Stage::Downloaded, Stage::New),
        (Stage::Transcribed, Stage::Downloaded),
        (Stage::Enriched, Stage::Transcribed),
        (Stage::Embedded, Stage::Enriched),
        (Stage::Ready, Stage::Embedded),
    ];

    for (failing, persisted) in cases {
        let temp_dir = TempDir::new().unwrap();
        let work = temp_dir.path().join("work");
        let out = temp_dir.path().join("out");
        let spec = fixtures::remote_spec("job-a");

        let first = MockCollaborators::new();
        fail_step_towards(failing, &first);
        let store = Arc::new(RecordingSidecarStore::new(&work));
        let outcome = orchestrator(store.clone(), out.clone(), &first).run(&spec).await;
        assert!(!outcome.is_success(), "case {}", failing);

        let record = store.load("job-a").await.unwrap().unwrap();
        assert_eq!(record.stage, persisted, "case {}", failing);
        assert_eq!(record.error.as_ref().map(|e| e.stage), Some(failing));

        let second = MockCollaborators::new();
        let store = Arc::new(RecordingSidecarStore::new(&work));
        let outcome = orchestrator(store.clone(), out.clone(), &second).run(&spec).await;
        assert!(outcome.is_success(), "case {}", failing);

        // Only stages after the persisted one are saved on resume.
        let resumed = store.saved_stages("job-a");
        assert!(resumed.iter().all(|s| *s > persisted), "case {}: {:?}", failing, resumed);
        assert_eq!(resumed.last(), Some(&Stage::Ready));

        // Completed steps are not repeated.
        let transcribed = persisted >= Stage::Transcribed;
        assert_eq!(second.log.count("transcribe"), usize::from(!transcribed), "case {}", failing);
        let audio_fetched = second
            .log
            .subjects("download")
            .iter()
            .any(|s| s.starts_with("audio:"));
        assert_eq!(audio_fetched, persisted < Stage::Downloaded, "case {}", failing);
        if persisted >= Stage::Embedded {
            assert_eq!(second.log.count("embed"), 0);
            assert_eq!(second.log.count("extract_frames"), 0);
        }

        assert!(out.join("job-a.rtt").exists());
        assert!(!work.join("job-a").exists());
    }
}

#[tokio::test]
async fn test_sidecar_layout_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let work = temp_dir.path().join("work");
    let mocks = MockCollaborators::new();
    mocks.enricher.faults().fail_always(FailureMode::Fatal);

    let store = Arc::new(RecordingSidecarStore::new(&work));
    let spec = fixtures::remote_spec("job-a");
    orchestrator(store, temp_dir.path().join("out"), &mocks).run(&spec).await;

    let raw = std::fs::read_to_string(work.join("job-a").join(SIDECAR_FILE)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(json["id"], "job-a");
    assert_eq!(json["stage"], "transcribed");
    assert_eq!(json["source"]["type"], "remote_url");
    assert_eq!(json["source"]["url"], "https://media.example.com/job-a.mp4");
    assert_eq!(json["error"]["stage"], "enriched");
    assert_eq!(json["error"]["kind"], "fatal_input");
    assert_eq!(json["error"]["attempt_count"], 1);
    assert!(json["artifacts"]["transcript"]
        .as_str()
        .unwrap()
        .ends_with("transcript.json"));
    assert!(json["artifacts"].get("audio_path").is_none());

    // No temp files left next to the sidecar.
    let leftovers: Vec<String> = std::fs::read_dir(work.join("job-a"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

#[tokio::test]
async fn test_plain_store_discovers_failed_jobs() {
    let temp_dir = TempDir::new().unwrap();
    let work = temp_dir.path().join("work");
    let mocks = MockCollaborators::new();
    mocks.transcriber.faults().fail_always(FailureMode::Fatal);

    let recording = Arc::new(RecordingSidecarStore::new(&work));
    let orchestrator = orchestrator(recording, temp_dir.path().join("out"), &mocks);
    for id in ["job-b", "job-a"] {
        orchestrator.run(&fixtures::remote_spec(id)).await;
    }
    std::fs::create_dir_all(work.join("not-a-job")).unwrap();

    let store = FsSidecarStore::new(&work);
    let records = store.list().await.unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["job-a", "job-b"]);
    assert!(records.iter().all(|r| r.stage == Stage::Downloaded));
    assert_eq!(records[0].spec(), fixtures::remote_spec("job-a"));
}

#[tokio::test]
async fn test_interrupted_sidecar_writes_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let work = temp_dir.path().join("work");
    let store = FsSidecarStore::new(&work);

    // job-a: a complete sidecar at `downloaded`, plus a half-written
    // replacement that never got renamed.
    let mut previous = JobRecord::new(&fixtures::remote_spec("job-a"));
    previous.advance(Stage::Downloaded).unwrap();
    store.save(&previous).await.unwrap();
    let full = serde_json::to_string(&previous).unwrap();
    let half_written = work
        .join("job-a")
        .join(format!(".{}.{}.tmp", SIDECAR_FILE, uuid::Uuid::new_v4()));
    std::fs::write(&half_written, &full[..full.len() / 2]).unwrap();

    // job-b: the very first write was cut short, so only a temp file exists.
    std::fs::create_dir_all(work.join("job-b")).unwrap();
    let truncated = work
        .join("job-b")
        .join(format!(".{}.{}.tmp", SIDECAR_FILE, uuid::Uuid::new_v4()));
    std::fs::write(&truncated, b"{\"id\": \"job-b\", \"sta").unwrap();

    assert_eq!(store.load("job-a").await.unwrap(), Some(previous.clone()));
    assert!(store.load("job-b").await.unwrap().is_none());
    let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["job-a".to_string()]);

    let mut next = previous.clone();
    next.advance(Stage::Transcribed).unwrap();
    store.save(&next).await.unwrap();
    assert_eq!(store.load("job-a").await.unwrap().unwrap().stage, Stage::Transcribed);

    // A job with only a truncated temp file starts from scratch.
    let mocks = MockCollaborators::new();
    let recording = Arc::new(RecordingSidecarStore::new(&work));
    let outcome = orchestrator(recording.clone(), temp_dir.path().join("out"), &mocks)
        .run(&fixtures::remote_spec("job-b"))
        .await;
    assert!(outcome.is_success());
    assert_eq!(recording.saved_stages("job-b").first(), Some(&Stage::New));
}
