// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use noldarim_core::{
    ActivityEventType, AIActivityRecord, ActivityId, EventMetadata, PipelineLifecycleKind,
    ProjectId, RunId, StepId, StepResult, StepStatus, ToolSuccess,
};
use tempfile::tempdir;

fn paths(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
    (dir.path().join("wal.jsonl"), dir.path().join("snapshot.zst"))
}

fn lifecycle_event(run_id: &str, kind: PipelineLifecycleKind) -> Event {
    Event::PipelineLifecycle {
        metadata: EventMetadata::new(format!("evt-{run_id}")),
        run_id: RunId::new(run_id),
        project_id: ProjectId::new("proj-1"),
        kind,
        message: None,
    }
}

fn sample_activity(event_id: &str) -> AIActivityRecord {
    AIActivityRecord {
        event_id: ActivityId::new(event_id),
        run_id: RunId::new("run-1"),
        task_id: "run-1-step-1".to_string(),
        step_id: Some(StepId::new("step-1")),
        session_id: None,
        parent_message_id: None,
        message_id: None,
        event_type: ActivityEventType::AiOutput,
        tool_name: None,
        tool_input_summary: None,
        tool_success: ToolSuccess::Unknown,
        file_path: None,
        content_preview: String::new(),
        tokens: Default::default(),
        raw_payload: "{}".to_string(),
        recorded_at_ms: 0,
    }
}

#[test]
fn publish_folds_event_into_queryable_state() {
    let dir = tempdir().unwrap();
    let (wal_path, snapshot_path) = paths(&dir);
    let persistence = Persistence::open(&wal_path, &snapshot_path).unwrap();

    persistence.upsert_run(noldarim_core::PipelineRun::new(
        RunId::new("run-1"),
        ProjectId::new("proj-1"),
        "demo".to_string(),
        "AAA1".to_string(),
        "AAA1".to_string(),
        None,
        None,
        1000,
    ));
    persistence
        .publish(lifecycle_event("run-1", PipelineLifecycleKind::Running))
        .unwrap();

    let run = persistence.run("run-1").unwrap();
    assert_eq!(run.status, noldarim_core::RunStatus::Running);
}

#[test]
fn reopening_replays_published_events_from_the_wal() {
    let dir = tempdir().unwrap();
    let (wal_path, snapshot_path) = paths(&dir);

    {
        let persistence = Persistence::open(&wal_path, &snapshot_path).unwrap();
        persistence.upsert_run(noldarim_core::PipelineRun::new(
            RunId::new("run-1"),
            ProjectId::new("proj-1"),
            "demo".to_string(),
            "AAA1".to_string(),
            "AAA1".to_string(),
            None,
            None,
            1000,
        ));
        persistence
            .publish(lifecycle_event("run-1", PipelineLifecycleKind::Completed))
            .unwrap();
    }

    let reopened = Persistence::open(&wal_path, &snapshot_path).unwrap();
    // upsert_run happened outside the WAL (direct state mutation), so only the
    // WAL-durable lifecycle event survives a reopen-from-scratch; the run
    // itself won't exist without a PipelineRunStarted event.
    assert!(reopened.run("run-1").is_none());
}

#[test]
fn with_run_mut_mutates_the_stored_run_in_place() {
    let dir = tempdir().unwrap();
    let (wal_path, snapshot_path) = paths(&dir);
    let persistence = Persistence::open(&wal_path, &snapshot_path).unwrap();

    persistence.upsert_run(noldarim_core::PipelineRun::new(
        RunId::new("run-1"),
        ProjectId::new("proj-1"),
        "demo".to_string(),
        "AAA1".to_string(),
        "AAA1".to_string(),
        None,
        None,
        1000,
    ));

    persistence.with_run_mut("run-1", |run| {
        run.head_commit_sha = "BBB2".to_string();
    });

    assert_eq!(persistence.run("run-1").unwrap().head_commit_sha, "BBB2");
}

#[test]
fn upsert_step_result_is_visible_through_the_run() {
    let dir = tempdir().unwrap();
    let (wal_path, snapshot_path) = paths(&dir);
    let persistence = Persistence::open(&wal_path, &snapshot_path).unwrap();

    persistence.upsert_run(noldarim_core::PipelineRun::new(
        RunId::new("run-1"),
        ProjectId::new("proj-1"),
        "demo".to_string(),
        "AAA1".to_string(),
        "AAA1".to_string(),
        None,
        None,
        1000,
    ));

    let mut result = StepResult::pending(RunId::new("run-1"), StepId::new("step-1"));
    persistence.upsert_step_result("run-1", result.clone());

    result.status = StepStatus::Completed;
    result.commit_sha = "CCC3".to_string();
    persistence.upsert_step_result("run-1", result);

    let run = persistence.run("run-1").unwrap();
    assert_eq!(run.step_results.len(), 1);
    assert_eq!(run.step_results[0].status, StepStatus::Completed);
}

#[test]
fn append_activity_rejects_duplicates_and_activities_for_task_filters() {
    let dir = tempdir().unwrap();
    let (wal_path, snapshot_path) = paths(&dir);
    let persistence = Persistence::open(&wal_path, &snapshot_path).unwrap();

    assert!(persistence.append_activity(sample_activity("evt-1")));
    assert!(!persistence.append_activity(sample_activity("evt-1")));

    let found = persistence.activities_for_task("run-1-step-1");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].event_id.as_str(), "evt-1");
}

#[test]
fn set_sink_observes_every_published_event_in_order() {
    let dir = tempdir().unwrap();
    let (wal_path, snapshot_path) = paths(&dir);
    let persistence = Persistence::open(&wal_path, &snapshot_path).unwrap();

    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    persistence.set_sink(std::sync::Arc::new(move |event: &Event| {
        seen_clone.lock().unwrap().push(event.metadata().idempotency_key.clone());
    }));

    persistence.publish(lifecycle_event("run-1", PipelineLifecycleKind::Running)).unwrap();
    persistence.publish(lifecycle_event("run-1", PipelineLifecycleKind::Completed)).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["evt-run-1".to_string(), "evt-run-1".to_string()]);
}

#[test]
fn opening_with_no_existing_files_starts_from_empty_state() {
    let dir = tempdir().unwrap();
    let (wal_path, snapshot_path) = paths(&dir);
    let persistence = Persistence::open(&wal_path, &snapshot_path).unwrap();
    assert!(persistence.snapshot_state().runs.is_empty());
}
