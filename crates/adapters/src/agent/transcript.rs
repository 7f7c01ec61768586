// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript tailing: converts Claude Code's JSONL session log into
//! `AIActivityRecord`s for the observability workflow, and locates that log
//! on disk the way Claude Code itself names it.
//!
//! The primary correlation path is the `--session-id` flag passed to the
//! spawned `claude` process; `find_transcript` falls back to the most
//! recently modified `.jsonl` file in the project's log directory when the
//! exact session id hasn't been written yet.

use noldarim_core::{
    ActivityEventType, ActivityId, AIActivityRecord, RunId, StepId, TokenCounts, ToolSuccess,
};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Convert a project path to Claude Code's transcript directory name
/// convention (replace `/` and `.` with `-`, after resolving symlinks).
pub fn project_dir_name(path: &Path) -> String {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    canonical.to_string_lossy().replace(['/', '.'], "-")
}

/// Locate the transcript file for `project_path`/`session_id`.
pub fn find_transcript(project_path: &Path, session_id: &str) -> Option<PathBuf> {
    let claude_base = std::env::var("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".claude"));
    find_transcript_in(project_path, session_id, &claude_base)
}

fn find_transcript_in(project_path: &Path, session_id: &str, claude_base: &Path) -> Option<PathBuf> {
    let project_dir = claude_base
        .join("projects")
        .join(project_dir_name(project_path));
    let session_file = project_dir.join(format!("{session_id}.jsonl"));
    if session_file.exists() {
        return Some(session_file);
    }
    std::fs::read_dir(&project_dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "jsonl"))
        .max_by_key(|e| e.metadata().ok().and_then(|m| m.modified().ok()))
        .map(|e| e.path())
}

/// Incremental reader over a growing transcript file. Tracks the byte
/// offset already consumed so repeated calls only parse newly appended
/// lines, the same shape as the WAL's own tailing.
#[derive(Debug, Default)]
pub struct TranscriptTail {
    offset: u64,
}

impl TranscriptTail {
    pub fn new() -> Self {
        Self { offset: 0 }
    }

    /// Parse newly appended, complete lines into activity records scoped to
    /// `run_id`/`task_id`/`step_id`. An incomplete trailing line is left for
    /// the next call.
    pub fn read_new(
        &mut self,
        path: &Path,
        run_id: &RunId,
        task_id: &str,
        step_id: Option<&StepId>,
        session_id: &str,
    ) -> Vec<AIActivityRecord> {
        let Ok(file) = File::open(path) else {
            return Vec::new();
        };
        let mut reader = BufReader::new(file);
        if reader.seek(SeekFrom::Start(self.offset)).is_err() {
            return Vec::new();
        }

        let mut records = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            if !line.ends_with('\n') {
                break; // incomplete line, wait for more data
            }
            self.offset += bytes_read as u64;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
                continue;
            };

            extract_records(
                &json,
                trimmed,
                run_id,
                task_id,
                step_id,
                session_id,
                self.offset,
                &mut records,
            );
        }

        records
    }
}

fn get_str<'a>(obj: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(|v| v.as_str())
}

fn extract_records(
    json: &serde_json::Value,
    raw_line: &str,
    run_id: &RunId,
    task_id: &str,
    step_id: Option<&StepId>,
    session_id: &str,
    offset: u64,
    out: &mut Vec<AIActivityRecord>,
) {
    let record_type = get_str(json, "type").unwrap_or("");
    let message_id = json.get("message").and_then(|m| get_str(m, "id")).map(String::from);
    let parent_message_id = get_str(json, "parentUuid").map(String::from);
    let recorded_at_ms = extract_timestamp_ms(json);

    let mut push = |event_type: ActivityEventType,
                    tool_name: Option<String>,
                    tool_input_summary: Option<String>,
                    tool_success: ToolSuccess,
                    file_path: Option<String>,
                    content: &str,
                    tokens: TokenCounts,
                    seq: usize| {
        out.push(AIActivityRecord {
            event_id: ActivityId::new(format!("{task_id}-{offset}-{seq}")),
            run_id: run_id.clone(),
            task_id: task_id.to_string(),
            step_id: step_id.cloned(),
            session_id: Some(session_id.to_string()),
            parent_message_id: parent_message_id.clone(),
            message_id: message_id.clone(),
            event_type,
            tool_name,
            tool_input_summary,
            tool_success,
            file_path,
            content_preview: noldarim_core::activity::truncate_preview(content),
            tokens,
            raw_payload: raw_line.to_string(),
            recorded_at_ms: recorded_at_ms.unwrap_or(0),
        });
    };

    if record_type == "assistant" {
        let Some(message) = json.get("message") else { return };
        let tokens = extract_tokens(message);
        let mut seq = 0usize;
        if let Some(content) = message.get("content").and_then(|c| c.as_array()) {
            for block in content {
                match get_str(block, "type") {
                    Some("text") => {
                        if let Some(text) = get_str(block, "text") {
                            push(
                                ActivityEventType::AiOutput,
                                None,
                                None,
                                ToolSuccess::Unknown,
                                None,
                                text,
                                tokens,
                                seq,
                            );
                            seq += 1;
                        }
                    }
                    Some("thinking") => {
                        if let Some(text) = get_str(block, "thinking") {
                            push(
                                ActivityEventType::Thinking,
                                None,
                                None,
                                ToolSuccess::Unknown,
                                None,
                                text,
                                TokenCounts::default(),
                                seq,
                            );
                            seq += 1;
                        }
                    }
                    Some("tool_use") => {
                        let tool_name = get_str(block, "name").map(String::from);
                        let input = block.get("input").cloned().unwrap_or(serde_json::Value::Null);
                        let file_path = get_str(&input, "file_path")
                            .or_else(|| get_str(&input, "notebook_path"))
                            .map(String::from);
                        let summary = serde_json::to_string(&input).ok();
                        push(
                            ActivityEventType::ToolUse,
                            tool_name,
                            summary.clone(),
                            ToolSuccess::Unknown,
                            file_path,
                            summary.as_deref().unwrap_or(""),
                            TokenCounts::default(),
                            seq,
                        );
                        seq += 1;
                    }
                    _ => {}
                }
            }
        }
        return;
    }

    if record_type == "user" {
        let Some(message) = json.get("message") else { return };
        if let Some(content) = message.get("content").and_then(|c| c.as_array()) {
            for (seq, block) in content.iter().enumerate() {
                if get_str(block, "type") != Some("tool_result") {
                    continue;
                }
                let is_error = block.get("is_error").and_then(|v| v.as_bool()).unwrap_or(false);
                let text = block
                    .get("content")
                    .and_then(|c| c.as_str())
                    .or_else(|| {
                        block
                            .get("content")
                            .and_then(|c| c.as_array())
                            .and_then(|a| a.first())
                            .and_then(|b| get_str(b, "text"))
                    })
                    .unwrap_or("");
                push(
                    ActivityEventType::ToolResult,
                    None,
                    None,
                    if is_error { ToolSuccess::Failure } else { ToolSuccess::Success },
                    None,
                    text,
                    TokenCounts::default(),
                    seq,
                );
            }
        }
        return;
    }

    if let Some(error_msg) = get_str(json, "error").or_else(|| {
        json.get("message").and_then(|m| get_str(m, "error"))
    }) {
        push(
            ActivityEventType::Error,
            None,
            None,
            ToolSuccess::Failure,
            None,
            error_msg,
            TokenCounts::default(),
            0,
        );
    }
}

fn extract_tokens(message: &serde_json::Value) -> TokenCounts {
    let usage = message.get("usage");
    TokenCounts {
        input: usage.and_then(|u| u.get("input_tokens")).and_then(|v| v.as_u64()).unwrap_or(0),
        output: usage.and_then(|u| u.get("output_tokens")).and_then(|v| v.as_u64()).unwrap_or(0),
        cache_read: usage
            .and_then(|u| u.get("cache_read_input_tokens"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        cache_create: usage
            .and_then(|u| u.get("cache_creation_input_tokens"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
    }
}

/// Extract a timestamp in epoch milliseconds from a transcript record.
fn extract_timestamp_ms(json: &serde_json::Value) -> Option<u64> {
    let ts = get_str(json, "timestamp").or_else(|| get_str(json, "isoTimestamp"))?;
    parse_iso_epoch_secs(ts).map(|secs| secs * 1000)
}

/// Parse a subset of ISO 8601 timestamps (`YYYY-MM-DDTHH:MM:SS[.fff]Z`) to
/// epoch seconds, using Howard Hinnant's days-from-civil algorithm.
fn parse_iso_epoch_secs(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.len() < 19 {
        return None;
    }
    let year: i64 = s[0..4].parse().ok()?;
    let month: u32 = s[5..7].parse().ok()?;
    let day: u32 = s[8..10].parse().ok()?;
    let hour: u64 = s[11..13].parse().ok()?;
    let min: u64 = s[14..16].parse().ok()?;
    let sec: u64 = s[17..19].parse().ok()?;

    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let m = month;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) as u64 + 2) / 5 + day as u64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era as u64 * 146097 + doe - 719468;

    Some(days * 86400 + hour * 3600 + min * 60 + sec)
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
