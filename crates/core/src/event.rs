// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event taxonomy published by every workflow and consumed by the
//! broadcaster.

use crate::activity::AIActivityRecord;
use crate::id::{ProjectId, RunId};
use crate::project::Project;
use serde::{Deserialize, Serialize};

/// Carried by every event. `idempotency_key` is what the broadcaster's
/// dedup cache keys on; `version` is a schema version for wire compat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub idempotency_key: String,
    pub version: u32,
}

impl EventMetadata {
    pub fn new(idempotency_key: impl Into<String>) -> Self {
        Self {
            idempotency_key: idempotency_key.into(),
            version: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskLifecycleKind {
    Requested,
    InProgress,
    Finished,
    Deleted,
    Created,
    StatusUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineLifecycleKind {
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "projects_loaded")]
    ProjectsLoaded {
        metadata: EventMetadata,
        projects: Vec<Project>,
    },
    #[serde(rename = "tasks_loaded")]
    TasksLoaded {
        metadata: EventMetadata,
        project_id: Option<ProjectId>,
        task_ids: Vec<String>,
    },
    #[serde(rename = "commits_loaded")]
    CommitsLoaded {
        metadata: EventMetadata,
        project_id: ProjectId,
        commits: Vec<String>,
    },
    #[serde(rename = "task_lifecycle")]
    TaskLifecycle {
        metadata: EventMetadata,
        task_id: String,
        project_id: Option<ProjectId>,
        kind: TaskLifecycleKind,
    },
    #[serde(rename = "pipeline_run_started")]
    PipelineRunStarted {
        metadata: EventMetadata,
        run_id: RunId,
        project_id: ProjectId,
        already_exists: bool,
    },
    #[serde(rename = "pipeline_lifecycle")]
    PipelineLifecycle {
        metadata: EventMetadata,
        run_id: RunId,
        project_id: ProjectId,
        kind: PipelineLifecycleKind,
        message: Option<String>,
    },
    #[serde(rename = "ai_activity_batch")]
    AIActivityBatch {
        metadata: EventMetadata,
        run_id: RunId,
        task_id: String,
        records: Vec<AIActivityRecord>,
    },
    #[serde(rename = "ai_stream_start")]
    AIStreamStart {
        metadata: EventMetadata,
        run_id: RunId,
        task_id: String,
    },
    #[serde(rename = "ai_stream_end")]
    AIStreamEnd {
        metadata: EventMetadata,
        run_id: RunId,
        task_id: String,
        final_status: String,
    },
    #[serde(rename = "error")]
    Error {
        metadata: EventMetadata,
        project_id: Option<ProjectId>,
        run_id: Option<RunId>,
        task_id: Option<String>,
        message: String,
    },
    #[serde(rename = "critical_error")]
    CriticalError {
        metadata: EventMetadata,
        message: String,
    },
}

impl Event {
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Event::ProjectsLoaded { metadata, .. }
            | Event::TasksLoaded { metadata, .. }
            | Event::CommitsLoaded { metadata, .. }
            | Event::TaskLifecycle { metadata, .. }
            | Event::PipelineRunStarted { metadata, .. }
            | Event::PipelineLifecycle { metadata, .. }
            | Event::AIActivityBatch { metadata, .. }
            | Event::AIStreamStart { metadata, .. }
            | Event::AIStreamEnd { metadata, .. }
            | Event::Error { metadata, .. }
            | Event::CriticalError { metadata, .. } => metadata,
        }
    }

    /// `true` for events that must bypass the broadcaster's dedup cache and
    /// terminate the subscriber after delivery.
    pub fn is_critical(&self) -> bool {
        matches!(self, Event::CriticalError { .. })
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            Event::TasksLoaded { project_id, .. } => project_id.as_ref().map(|p| p.as_str()),
            Event::CommitsLoaded { project_id, .. } => Some(project_id.as_str()),
            Event::TaskLifecycle { project_id, .. } => project_id.as_ref().map(|p| p.as_str()),
            Event::PipelineRunStarted { project_id, .. } => Some(project_id.as_str()),
            Event::PipelineLifecycle { project_id, .. } => Some(project_id.as_str()),
            Event::Error { project_id, .. } => project_id.as_ref().map(|p| p.as_str()),
            _ => None,
        }
    }

    pub fn run_id(&self) -> Option<&str> {
        match self {
            Event::PipelineRunStarted { run_id, .. } => Some(run_id.as_str()),
            Event::PipelineLifecycle { run_id, .. } => Some(run_id.as_str()),
            Event::AIActivityBatch { run_id, .. } => Some(run_id.as_str()),
            Event::AIStreamStart { run_id, .. } => Some(run_id.as_str()),
            Event::AIStreamEnd { run_id, .. } => Some(run_id.as_str()),
            Event::Error { run_id, .. } => run_id.as_ref().map(|r| r.as_str()),
            _ => None,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            Event::TaskLifecycle { task_id, .. } => Some(task_id.as_str()),
            Event::AIActivityBatch { task_id, .. } => Some(task_id.as_str()),
            Event::AIStreamStart { task_id, .. } => Some(task_id.as_str()),
            Event::AIStreamEnd { task_id, .. } => Some(task_id.as_str()),
            Event::Error { task_id, .. } => task_id.as_deref(),
            _ => None,
        }
    }
}

/// A subscriber's scope filter: every `Some` constraint must equal the
/// event's corresponding scope field. Variants lacking a given scope never
/// match a filter that restricts it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub project_id: Option<String>,
    pub run_id: Option<String>,
    pub task_id: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(want) = &self.project_id {
            if event.project_id() != Some(want.as_str()) {
                return false;
            }
        }
        if let Some(want) = &self.run_id {
            if event.run_id() != Some(want.as_str()) {
                return false;
            }
        }
        if let Some(want) = &self.task_id {
            if event.task_id() != Some(want.as_str()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
