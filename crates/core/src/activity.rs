// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AIActivityRecord`: an append-only record of one agent-transcript event,
//! produced by the observability workflow.

use crate::id::{ActivityId, RunId, StepId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEventType {
    ToolUse,
    ToolResult,
    AiOutput,
    SessionStart,
    SessionEnd,
    Thinking,
    Error,
}

/// Tri-valued success flag: a tool result may not know whether it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSuccess {
    Success,
    Failure,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIActivityRecord {
    pub event_id: ActivityId,
    pub run_id: RunId,
    /// `"{run_id}-{step_id}"`, the legacy single-step task identity.
    pub task_id: String,
    pub step_id: Option<StepId>,
    pub session_id: Option<String>,
    pub parent_message_id: Option<String>,
    pub message_id: Option<String>,
    pub event_type: ActivityEventType,
    pub tool_name: Option<String>,
    pub tool_input_summary: Option<String>,
    pub tool_success: ToolSuccess,
    pub file_path: Option<String>,
    pub content_preview: String,
    pub tokens: crate::run::TokenCounts,
    pub raw_payload: String,
    pub recorded_at_ms: u64,
}

/// Bound applied to `content_preview` to keep records small.
pub const CONTENT_PREVIEW_MAX_LEN: usize = 512;

pub fn truncate_preview(content: &str) -> String {
    if content.len() <= CONTENT_PREVIEW_MAX_LEN {
        content.to_string()
    } else {
        let mut end = CONTENT_PREVIEW_MAX_LEN;
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &content[..end])
    }
}

/// `task_id` for a 1-step pipeline's task identity.
pub fn task_id_for(run_id: &RunId, step_id: &StepId) -> String {
    format!("{}-{}", run_id.as_str(), step_id.as_str())
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
