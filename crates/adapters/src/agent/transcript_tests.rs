// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use noldarim_core::RunId;
use std::io::Write;
use tempfile::tempdir;

fn write_lines(path: &Path, lines: &[&str]) {
    let mut f = File::create(path).unwrap();
    for line in lines {
        writeln!(f, "{line}").unwrap();
    }
}

#[test]
fn project_dir_name_replaces_slashes_and_dots() {
    let name = project_dir_name(Path::new("/tmp/does-not-exist/my.repo"));
    assert!(!name.contains('/'));
    assert!(!name.contains('.'));
}

#[test]
fn find_transcript_prefers_exact_session_match() {
    let dir = tempdir().unwrap();
    let project_dir = dir.path().join("projects").join(project_dir_name(dir.path()));
    std::fs::create_dir_all(&project_dir).unwrap();
    std::fs::write(project_dir.join("session-a.jsonl"), "").unwrap();
    std::fs::write(project_dir.join("session-b.jsonl"), "").unwrap();

    let found = find_transcript_in(dir.path(), "session-a", dir.path());
    assert_eq!(found.unwrap().file_name().unwrap(), "session-a.jsonl");
}

#[test]
fn find_transcript_falls_back_to_most_recent_jsonl() {
    let dir = tempdir().unwrap();
    let project_dir = dir.path().join("projects").join(project_dir_name(dir.path()));
    std::fs::create_dir_all(&project_dir).unwrap();
    std::fs::write(project_dir.join("other-session.jsonl"), "").unwrap();

    let found = find_transcript_in(dir.path(), "missing-session", dir.path());
    assert_eq!(found.unwrap().file_name().unwrap(), "other-session.jsonl");
}

#[test]
fn read_new_extracts_assistant_text_as_ai_output() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    write_lines(
        &path,
        &[r#"{"type":"assistant","message":{"id":"m1","content":[{"type":"text","text":"hello there"}],"usage":{"input_tokens":10,"output_tokens":5}}}"#],
    );

    let mut tail = TranscriptTail::new();
    let records = tail.read_new(&path, &RunId::new("run-1"), "run-1-step-1", None, "sess-1");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type, ActivityEventType::AiOutput);
    assert_eq!(records[0].content_preview, "hello there");
    assert_eq!(records[0].tokens.input, 10);
}

#[test]
fn read_new_extracts_tool_use_with_file_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    write_lines(
        &path,
        &[r#"{"type":"assistant","message":{"id":"m1","content":[{"type":"tool_use","name":"Read","input":{"file_path":"/a/b.rs"}}]}}"#],
    );

    let mut tail = TranscriptTail::new();
    let records = tail.read_new(&path, &RunId::new("run-1"), "run-1-step-1", None, "sess-1");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type, ActivityEventType::ToolUse);
    assert_eq!(records[0].tool_name.as_deref(), Some("Read"));
    assert_eq!(records[0].file_path.as_deref(), Some("/a/b.rs"));
}

#[test]
fn read_new_extracts_tool_result_error_flag() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    write_lines(
        &path,
        &[r#"{"type":"user","message":{"content":[{"type":"tool_result","is_error":true,"content":"boom"}]}}"#],
    );

    let mut tail = TranscriptTail::new();
    let records = tail.read_new(&path, &RunId::new("run-1"), "run-1-step-1", None, "sess-1");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type, ActivityEventType::ToolResult);
    assert_eq!(records[0].tool_success, ToolSuccess::Failure);
}

#[test]
fn read_new_only_consumes_complete_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    let mut f = File::create(&path).unwrap();
    write!(f, r#"{{"type":"assistant","message":{{"content":[{{"type":"text","text":"partial"#).unwrap();
    drop(f);

    let mut tail = TranscriptTail::new();
    let records = tail.read_new(&path, &RunId::new("run-1"), "run-1-step-1", None, "sess-1");
    assert!(records.is_empty());
    assert_eq!(tail.offset, 0);
}

#[test]
fn read_new_does_not_reread_already_consumed_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    write_lines(
        &path,
        &[r#"{"type":"assistant","message":{"content":[{"type":"text","text":"one"}]}}"#],
    );

    let mut tail = TranscriptTail::new();
    let first = tail.read_new(&path, &RunId::new("run-1"), "run-1-step-1", None, "sess-1");
    assert_eq!(first.len(), 1);

    let second = tail.read_new(&path, &RunId::new("run-1"), "run-1-step-1", None, "sess-1");
    assert!(second.is_empty());
}
