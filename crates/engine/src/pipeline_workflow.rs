// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `run_pipeline`: the driver that turns a `StartPipelineRequest` into a
//! sequence of step executions, fork-skip decisions, and lifecycle events.
//!
//! Worktree creation/release lives here since it only needs a real `git`
//! binary and is cheap to exercise in tests. Container and credential
//! acquisition is the caller's job, same as `Persistence`/`WorktreeManager`
//! are already-open resources this function is simply handed: the caller
//! constructs the per-run `AgentAdapter` (typically a `ContainerAgentAdapter`
//! bound to a freshly started container) and passes it in, then stops the
//! container once `run_pipeline` returns.

use crate::cancellation::CancellationToken;
use crate::error::EngineError;
use crate::observability_workflow::spawn_observability;
use crate::step_workflow::{run_step, StepInput, StepWorkflowConfig};
use noldarim_adapters::{AgentAdapter, WorktreeManager};
use noldarim_core::{
    AgentConfig, Clock, Event, EventMetadata, FlagFormat, PipelineLifecycleKind, PipelineRun,
    ProjectId, RunId, RunIdentity, RunStatus, StepId, StepResult, StepSnapshot, StepSpecInput,
    StepStatus, ToolName,
};
use noldarim_storage::Persistence;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CLAUDE_TOOL_VERSION: &str = "1.0";

/// Tunables specific to the pipeline driver. `step_workflow` is forwarded
/// to every `run_step` call unchanged.
#[derive(Debug, Clone)]
pub struct PipelineWorkflowConfig {
    pub observer_drain_grace: Duration,
    pub observer_poll_interval: Option<Duration>,
    pub step_workflow: StepWorkflowConfig,
}

impl Default for PipelineWorkflowConfig {
    fn default() -> Self {
        Self {
            observer_drain_grace: Duration::from_secs(5),
            observer_poll_interval: None,
            step_workflow: StepWorkflowConfig::default(),
        }
    }
}

/// Mirrors the start-pipeline API request: an ordered sequence of prompt
/// steps plus optional fork coordinates.
#[derive(Debug, Clone)]
pub struct StartPipelineRequest {
    pub project_id: ProjectId,
    pub name: String,
    pub base_commit_sha: String,
    pub steps: Vec<StepSpecInput>,
    pub variables: BTreeMap<String, String>,
    pub parent_run_id: Option<RunId>,
    pub fork_after_step_id: Option<String>,
}

pub struct StartPipelineOutcome {
    pub run: PipelineRun,
    pub already_exists: bool,
}

fn default_agent_config(prompt: &str) -> AgentConfig {
    AgentConfig {
        tool_name: ToolName::Claude,
        tool_version: DEFAULT_CLAUDE_TOOL_VERSION.to_string(),
        prompt_template: prompt.to_string(),
        variables: BTreeMap::new(),
        tool_options: BTreeMap::new(),
        flag_format: FlagFormat::Space,
    }
}

/// Find the 0-based position of `fork_after_step_id` in the parent's step
/// order. A point that matches no step (including `None`) means no steps
/// are skipped, per the "fork before step 0" boundary case.
fn fork_skip_index(parent: &PipelineRun, fork_after_step_id: Option<&str>) -> Option<usize> {
    let target = fork_after_step_id?;
    parent.step_snapshots.iter().position(|s| s.step_id.as_str() == target)
}

/// Run (or re-observe) one pipeline. Returns the final `PipelineRun` row;
/// an already-completed run with the same `run_id` is returned immediately
/// without re-executing any step.
pub async fn run_pipeline<A: AgentAdapter, C: Clock>(
    request: StartPipelineRequest,
    agent: &A,
    worktree_manager: &WorktreeManager,
    repo_path: &Path,
    persistence: Arc<Persistence>,
    clock: C,
    transcript_dir: std::path::PathBuf,
    session_id: String,
    config: &PipelineWorkflowConfig,
    cancellation: &CancellationToken,
) -> Result<StartPipelineOutcome, EngineError> {
    let identity = RunIdentity {
        project_id: request.project_id.as_str(),
        base_commit_sha: &request.base_commit_sha,
        steps: &request.steps,
        variables: &request.variables,
        parent_run_id: request.parent_run_id.as_ref().map(|id| id.as_str()),
        fork_after_step_id: request.fork_after_step_id.as_deref(),
    };
    let run_id = RunId::derive(&identity);

    if let Some(existing) = persistence.run(run_id.as_str()) {
        return Ok(StartPipelineOutcome {
            run: existing,
            already_exists: true,
        });
    }

    let parent = match &request.parent_run_id {
        Some(parent_id) => Some(
            persistence
                .run(parent_id.as_str())
                .ok_or_else(|| EngineError::Validation(format!("parent run {parent_id} not found")))?,
        ),
        None => None,
    };
    let skip_index = parent
        .as_ref()
        .and_then(|p| fork_skip_index(p, request.fork_after_step_id.as_deref()));

    let start_commit_sha = match (&parent, skip_index) {
        (Some(p), Some(idx)) => p
            .step_results
            .get(idx)
            .map(|r| r.commit_sha.clone())
            .ok_or_else(|| EngineError::Validation("fork point has no parent step result".to_string()))?,
        _ => request.base_commit_sha.clone(),
    };

    let mut run = PipelineRun::new(
        run_id.clone(),
        request.project_id.clone(),
        request.name.clone(),
        request.base_commit_sha.clone(),
        start_commit_sha.clone(),
        request.parent_run_id.clone(),
        request.fork_after_step_id.clone().map(StepId::new),
        clock.now_ms(),
    );

    for (index, step) in request.steps.iter().enumerate() {
        let agent_config = step.agent_config.clone().unwrap_or_else(|| default_agent_config(&step.prompt));
        run.push_snapshot(StepSnapshot::new(run_id.clone(), index as u32, step.name.clone(), agent_config));
    }

    run.status = RunStatus::Running;
    run.started_at_ms = Some(clock.now_ms());
    run.head_commit_sha = start_commit_sha;
    persistence.upsert_run(run.clone());
    publish(&persistence, pipeline_event(&run, PipelineLifecycleKind::Running, None));

    let worktree = worktree_manager
        .create(repo_path, run_id.as_str(), &run.head_commit_sha)
        .await?;

    let observer = spawn_observability(
        run_id.clone(),
        transcript_dir,
        session_id,
        persistence.clone(),
        clock.clone(),
        config.observer_poll_interval,
    );

    let outcome = drive_steps(
        &mut run,
        &request.variables,
        parent.as_ref(),
        skip_index,
        agent,
        worktree_manager,
        &worktree,
        &persistence,
        &clock,
        config,
        cancellation,
        &observer,
    )
    .await;

    tokio::time::sleep(config.observer_drain_grace).await;
    let final_status = match &outcome {
        Ok(()) => "completed",
        Err(e) if e.is_cancelled() => "cancelled",
        Err(_) => "failed",
    };
    observer.finish(final_status).await;
    let _ = worktree_manager.release(repo_path, &worktree).await;

    match outcome {
        Ok(()) => {
            run.status = RunStatus::Completed;
            run.completed_at_ms = Some(clock.now_ms());
            persistence.upsert_run(run.clone());
            publish(&persistence, pipeline_event(&run, PipelineLifecycleKind::Completed, None));
        }
        Err(e) if e.is_cancelled() => {
            run.status = RunStatus::Failed;
            run.error_message = Some(e.to_string());
            run.completed_at_ms = Some(clock.now_ms());
            persistence.upsert_run(run.clone());
            publish(&persistence, pipeline_event(&run, PipelineLifecycleKind::Cancelled, Some(e.to_string())));
        }
        Err(e) => {
            run.status = RunStatus::Failed;
            run.error_message = Some(e.to_string());
            run.completed_at_ms = Some(clock.now_ms());
            persistence.upsert_run(run.clone());
            publish(&persistence, pipeline_event(&run, PipelineLifecycleKind::Failed, Some(e.to_string())));
        }
    }

    Ok(StartPipelineOutcome {
        run,
        already_exists: false,
    })
}

#[allow(clippy::too_many_arguments)]
async fn drive_steps<A: AgentAdapter, C: Clock>(
    run: &mut PipelineRun,
    variables: &BTreeMap<String, String>,
    parent: Option<&PipelineRun>,
    skip_index: Option<usize>,
    agent: &A,
    worktree_manager: &WorktreeManager,
    worktree: &noldarim_adapters::Worktree,
    persistence: &Persistence,
    clock: &C,
    config: &PipelineWorkflowConfig,
    cancellation: &CancellationToken,
    observer: &crate::observability_workflow::ObservabilityHandle,
) -> Result<(), EngineError> {
    let step_snapshots = run.step_snapshots.clone();
    for (index, snapshot) in step_snapshots.iter().enumerate() {
        cancellation.check()?;

        if skip_index.is_some_and(|skip| index <= skip) {
            let parent_result = parent
                .and_then(|p| p.step_results.get(index))
                .ok_or_else(|| EngineError::Validation("fork skip has no matching parent step result".to_string()))?;
            let mut result = StepResult::pending(run.id.clone(), snapshot.step_id.clone());
            result.status = StepStatus::Skipped;
            result.commit_sha = parent_result.commit_sha.clone();
            result.commit_message = parent_result.commit_message.clone();
            run.head_commit_sha = result.commit_sha.clone();
            run.push_result(result.clone());
            persistence.upsert_step_result(run.id.as_str(), result);
            persistence.upsert_run(run.clone());
            publish(
                persistence,
                pipeline_event(run, PipelineLifecycleKind::Running, Some(format!("step {} skipped (fork reuse)", snapshot.step_id))),
            );
            continue;
        }

        observer.set_current_step(Some(snapshot.step_id.clone()));
        let input = StepInput {
            run_id: run.id.clone(),
            step_id: snapshot.step_id.clone(),
            step_name: &snapshot.step_name,
            worktree,
            previous_commit_sha: &run.head_commit_sha,
            agent_config: &snapshot.agent_config,
            variables: variables.clone(),
            env: Vec::new(),
        };

        let result = run_step(
            input,
            agent,
            worktree_manager,
            persistence,
            clock,
            &config.step_workflow,
            cancellation,
        )
        .await?;

        let failed = result.status == StepStatus::Failed;
        if result.status == StepStatus::Completed {
            run.head_commit_sha = result.commit_sha.clone();
        }
        run.push_result(result.clone());
        persistence.upsert_step_result(run.id.as_str(), result.clone());
        persistence.upsert_run(run.clone());

        if failed {
            return Err(EngineError::AgentFailure(
                result.error_message.unwrap_or_else(|| "step failed".to_string()),
            ));
        }

        publish(
            persistence,
            pipeline_event(run, PipelineLifecycleKind::Running, Some(format!("step {} completed", snapshot.step_id))),
        );
    }
    Ok(())
}

fn pipeline_event(run: &PipelineRun, kind: PipelineLifecycleKind, message: Option<String>) -> Event {
    Event::PipelineLifecycle {
        metadata: EventMetadata::new(format!("pipeline-{}-{:?}-{}", run.id, kind, run.step_results.len())),
        run_id: run.id.clone(),
        project_id: run.project_id.clone(),
        kind,
        message,
    }
}

fn publish(persistence: &Persistence, event: Event) {
    if let Err(e) = persistence.publish(event) {
        tracing::warn!(error = %e, "failed to publish pipeline lifecycle event");
    }
}

#[cfg(test)]
#[path = "pipeline_workflow_tests.rs"]
mod tests;
