// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the start-pipeline API request and the `task show`/`task
//! list` CLI surface. JSON shapes match the field order and naming a
//! reader of the external interface would expect; internal ID newtypes are
//! carried as plain strings at the wire boundary.

use noldarim_core::{
    ActivityEventType, DiffStats, RunStatus, StepResult, StepSnapshot, StepSpecInput, StepStatus,
    StepSummary, ToolSuccess,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The start-pipeline API request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartPipelineRequest {
    pub project_id: String,
    pub name: String,
    pub base_commit_sha: String,
    pub steps: Vec<StepSpecInput>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub parent_run_id: Option<String>,
    #[serde(default)]
    pub fork_after_step_id: Option<String>,
}

impl StartPipelineRequest {
    pub fn into_engine_request(self) -> noldarim_engine::StartPipelineRequest {
        noldarim_engine::StartPipelineRequest {
            project_id: noldarim_core::ProjectId::new(self.project_id),
            name: self.name,
            base_commit_sha: self.base_commit_sha,
            steps: self.steps,
            variables: self.variables,
            parent_run_id: self.parent_run_id.map(noldarim_core::RunId::new),
            fork_after_step_id: self.fork_after_step_id,
        }
    }
}

/// The start-pipeline API response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartPipelineResponse {
    pub run_id: String,
    pub already_exists: bool,
    pub status: RunStatus,
}

/// One row of `task list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub run_id: String,
    pub step_id: String,
    pub step_name: String,
    pub status: StepStatus,
    pub commit_sha: String,
}

/// One tool invocation surfaced by `task show`'s tool-call list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallEntry {
    pub tool_name: Option<String>,
    pub tool_success: ToolSuccess,
    pub file_path: Option<String>,
}

/// The full detail view for `task show <task-id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task_id: String,
    pub run_id: String,
    pub step_id: String,
    pub step_name: String,
    pub status: StepStatus,
    pub commit_sha: String,
    pub commit_message: String,
    pub diff_stats: DiffStats,
    /// Populated only when `--diff` is requested.
    pub diff_text: Option<String>,
    pub tokens: noldarim_core::TokenCounts,
    pub summary: Option<StepSummary>,
    pub tool_calls: Vec<ToolCallEntry>,
    /// Populated only when `--raw` is requested: every activity record for
    /// this task, in recorded order.
    pub raw_activities: Option<Vec<noldarim_core::AIActivityRecord>>,
}

impl TaskDetail {
    pub fn from_result(
        snapshot: &StepSnapshot,
        result: &StepResult,
        activities: &[noldarim_core::AIActivityRecord],
        include_diff: bool,
        include_raw: bool,
    ) -> Self {
        let task_id = noldarim_core::activity::task_id_for(&result.run_id, &result.step_id);
        let tool_calls = activities
            .iter()
            .filter(|a| a.event_type == ActivityEventType::ToolUse)
            .map(|a| ToolCallEntry {
                tool_name: a.tool_name.clone(),
                tool_success: a.tool_success,
                file_path: a.file_path.clone(),
            })
            .collect();

        Self {
            task_id,
            run_id: result.run_id.as_str().to_string(),
            step_id: result.step_id.as_str().to_string(),
            step_name: snapshot.step_name.clone(),
            status: result.status,
            commit_sha: result.commit_sha.clone(),
            commit_message: result.commit_message.clone(),
            diff_stats: result.diff_stats,
            diff_text: include_diff.then(|| result.diff_text.clone()),
            tokens: result.tokens,
            summary: result.summary.clone(),
            tool_calls,
            raw_activities: include_raw.then(|| activities.to_vec()),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
