// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `MaterializedState`: the in-memory projection built by folding the WAL.
//!
//! The WAL is the source of truth; this is just the queryable view over it.

use noldarim_core::{
    AIActivityRecord, Event, PipelineLifecycleKind, PipelineRun, Project, RunStatus, StepResult,
    StepSnapshot, StepStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializedState {
    pub projects: HashMap<String, Project>,
    pub runs: HashMap<String, PipelineRun>,
    /// Keyed by `event_id`, enforcing append-only uniqueness: persistence
    /// rejects duplicates.
    pub activities: HashMap<String, AIActivityRecord>,
}

impl MaterializedState {
    /// Fold one WAL-durable event into the projection. Unknown/irrelevant
    /// event variants (load-listing events, generic errors) are no-ops here;
    /// they exist for broadcaster fan-out, not for state reconstruction.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::ProjectsLoaded { projects, .. } => {
                for project in projects {
                    self.projects.insert(project.id.as_str().to_string(), project.clone());
                }
            }
            Event::PipelineRunStarted { run_id, .. } => {
                self.runs.entry(run_id.as_str().to_string()).or_insert_with(|| {
                    PipelineRun::new(
                        run_id.clone(),
                        noldarim_core::ProjectId::new(""),
                        String::new(),
                        String::new(),
                        String::new(),
                        None,
                        None,
                        0,
                    )
                });
            }
            Event::PipelineLifecycle { run_id, kind, message, .. } => {
                if let Some(run) = self.runs.get_mut(run_id.as_str()) {
                    match kind {
                        PipelineLifecycleKind::Running => run.status = RunStatus::Running,
                        PipelineLifecycleKind::Completed => run.status = RunStatus::Completed,
                        PipelineLifecycleKind::Failed => {
                            run.status = RunStatus::Failed;
                            run.error_message = message.clone();
                        }
                        PipelineLifecycleKind::Cancelled => {
                            run.status = RunStatus::Failed;
                            run.error_message =
                                Some(message.clone().unwrap_or_else(|| "Cancelled by user".to_string()));
                        }
                    }
                }
            }
            Event::AIActivityBatch { records, .. } => {
                for record in records {
                    self.activities
                        .entry(record.event_id.as_str().to_string())
                        .or_insert_with(|| record.clone());
                }
            }
            _ => {}
        }
    }

    pub fn upsert_run(&mut self, run: PipelineRun) {
        self.runs.insert(run.id.as_str().to_string(), run);
    }

    pub fn upsert_project(&mut self, project: Project) {
        self.projects.insert(project.id.as_str().to_string(), project);
    }

    pub fn run(&self, run_id: &str) -> Option<&PipelineRun> {
        self.runs.get(run_id)
    }

    pub fn run_mut(&mut self, run_id: &str) -> Option<&mut PipelineRun> {
        self.runs.get_mut(run_id)
    }

    pub fn push_step_snapshot(&mut self, run_id: &str, snapshot: StepSnapshot) {
        if let Some(run) = self.runs.get_mut(run_id) {
            run.push_snapshot(snapshot);
        }
    }

    pub fn upsert_step_result(&mut self, run_id: &str, result: StepResult) {
        if let Some(run) = self.runs.get_mut(run_id) {
            if let Some(existing) = run
                .step_results
                .iter_mut()
                .find(|r| r.step_id == result.step_id)
            {
                *existing = result;
            } else {
                run.push_result(result);
            }
        }
    }

    /// Activities for a given `(run_id, step_id)` task, used by step phase 6's
    /// token aggregation.
    pub fn activities_for_task(&self, task_id: &str) -> Vec<&AIActivityRecord> {
        self.activities
            .values()
            .filter(|a| a.task_id == task_id)
            .collect()
    }

    /// Inserts the record iff its `event_id` has not been seen, enforcing
    /// append-only dedup. Returns `false` for a duplicate.
    pub fn insert_activity(&mut self, record: AIActivityRecord) -> bool {
        if self.activities.contains_key(record.event_id.as_str()) {
            return false;
        }
        self.activities.insert(record.event_id.as_str().to_string(), record);
        true
    }

    /// Count of steps in `run_id` currently `Skipped`, used to verify the
    /// fork-reuse boundary.
    pub fn skipped_step_count(&self, run_id: &str) -> usize {
        self.runs
            .get(run_id)
            .map(|run| {
                run.step_results
                    .iter()
                    .filter(|r| r.status == StepStatus::Skipped)
                    .count()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
