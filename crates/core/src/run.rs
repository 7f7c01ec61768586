// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline run data model: `PipelineRun`, its immutable `StepSnapshot`s and
//! mutable `StepResult`s.

use crate::agent_config::AgentConfig;
use crate::hashing::{canonical_json, sha256_hex};
use crate::id::{ProjectId, RunId, StepId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// `true` once the run has reached a terminal, monotonic status:
    /// once `Completed` or `Failed`, the status never changes again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// The immutable specification of a step as recorded when the run was
/// queued. Append-only within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub run_id: RunId,
    pub step_id: StepId,
    pub step_index: u32,
    pub step_name: String,
    pub agent_config: AgentConfig,
    pub definition_hash: String,
}

/// The fields of a step that define its identity and content, used both for
/// `StepId::derive` and for `definition_hash`, which stably identifies the
/// (base, config) pair.
#[derive(Serialize)]
struct StepIdentity<'a> {
    run_id: &'a str,
    step_index: u32,
    step_name: &'a str,
    agent_config: &'a AgentConfig,
}

impl StepSnapshot {
    pub fn new(run_id: RunId, step_index: u32, step_name: String, agent_config: AgentConfig) -> Self {
        let identity = StepIdentity {
            run_id: run_id.as_str(),
            step_index,
            step_name: &step_name,
            agent_config: &agent_config,
        };
        let step_id = StepId::derive(&identity);
        let definition_hash = sha256_hex(canonical_json(&identity).as_bytes());
        Self {
            run_id,
            step_id,
            step_index,
            step_name,
            agent_config,
            definition_hash,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_create: u64,
}

impl TokenCounts {
    pub fn add(&mut self, other: &TokenCounts) {
        self.input += other.input;
        self.output += other.output;
        self.cache_read += other.cache_read;
        self.cache_create += other.cache_create;
    }
}

/// The mutable outcome of executing a step. Owned exclusively by its step
/// workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub run_id: RunId,
    pub step_id: StepId,
    pub status: StepStatus,
    pub commit_sha: String,
    pub commit_message: String,
    pub diff_stats: DiffStats,
    pub diff_text: String,
    pub tokens: TokenCounts,
    pub agent_output: String,
    pub duration_ms: u64,
    pub summary: Option<crate::summary::StepSummary>,
    pub error_message: Option<String>,
}

impl StepResult {
    pub fn pending(run_id: RunId, step_id: StepId) -> Self {
        Self {
            run_id,
            step_id,
            status: StepStatus::Pending,
            commit_sha: String::new(),
            commit_message: String::new(),
            diff_stats: DiffStats::default(),
            diff_text: String::new(),
            tokens: TokenCounts::default(),
            agent_output: String::new(),
            duration_ms: 0,
            summary: None,
            error_message: None,
        }
    }

    /// `true` iff a completed step either has a non-empty commit SHA, or
    /// its commit message records "No changes".
    pub fn satisfies_completion_invariant(&self) -> bool {
        if self.status != StepStatus::Completed {
            return true;
        }
        !self.commit_sha.is_empty() || self.commit_message == "No changes"
    }
}

/// The fields that define a run's identity, used for `RunId::derive`.
#[derive(Serialize)]
pub struct RunIdentity<'a> {
    pub project_id: &'a str,
    pub base_commit_sha: &'a str,
    pub steps: &'a [StepSpecInput],
    pub variables: &'a BTreeMap<String, String>,
    pub parent_run_id: Option<&'a str>,
    pub fork_after_step_id: Option<&'a str>,
}

/// A step as it appears in a `StartPipelineRequest`, before a `StepId` has
/// been assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpecInput {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub agent_config: Option<AgentConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: RunId,
    pub project_id: ProjectId,
    pub name: String,
    pub status: RunStatus,
    pub base_commit_sha: String,
    pub start_commit_sha: String,
    pub head_commit_sha: String,
    pub parent_run_id: Option<RunId>,
    pub fork_after_step_id: Option<StepId>,
    pub error_message: Option<String>,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
    pub step_snapshots: Vec<StepSnapshot>,
    pub step_results: Vec<StepResult>,
}

impl PipelineRun {
    pub fn new(
        id: RunId,
        project_id: ProjectId,
        name: String,
        base_commit_sha: String,
        start_commit_sha: String,
        parent_run_id: Option<RunId>,
        fork_after_step_id: Option<StepId>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            project_id,
            name,
            status: RunStatus::Pending,
            base_commit_sha,
            start_commit_sha,
            head_commit_sha: String::new(),
            parent_run_id,
            fork_after_step_id,
            error_message: None,
            created_at_ms,
            started_at_ms: None,
            completed_at_ms: None,
            step_snapshots: Vec::new(),
            step_results: Vec::new(),
        }
    }

    pub fn is_fork(&self) -> bool {
        self.parent_run_id.is_some()
    }

    /// `true` iff head_commit_sha is either empty or reachable from
    /// base_commit_sha. Reachability itself is a Git-level fact checked
    /// by the worktree adapter; this only checks the "empty is legal" shape.
    pub fn head_commit_is_well_formed(&self) -> bool {
        self.head_commit_sha.is_empty() || !self.head_commit_sha.chars().all(|c| c == '0')
    }

    pub fn push_snapshot(&mut self, snapshot: StepSnapshot) {
        self.step_snapshots.push(snapshot);
    }

    pub fn push_result(&mut self, result: StepResult) {
        self.step_results.push(result);
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
