// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process entry point wiring persistence, the pipeline engine, and the
//! broadcaster together. There is no listening socket here: `Server`
//! exposes the in-process API a transport layer would call.

use crate::broadcaster::{Broadcaster, Subscription};
use crate::env::DaemonConfig;
use crate::protocol::{StartPipelineRequest, TaskDetail, TaskSummary};
use noldarim_adapters::{
    copy_credentials, AgentAdapter, ContainerAgentAdapter, ContainerRuntime, CredentialsError, ResourceLimits,
    WorktreeManager,
};
use noldarim_core::{Event, EventFilter, RunId, RunIdentity, SystemClock, ToolName};
use noldarim_engine::{run_pipeline, CancellationToken, PipelineWorkflowConfig, StartPipelineOutcome};
use noldarim_storage::{Persistence, PersistenceError};
use std::path::PathBuf;
use std::sync::Arc;

pub struct Server {
    persistence: Arc<Persistence>,
    broadcaster: Broadcaster,
    worktree_manager: WorktreeManager,
    container_runtime: ContainerRuntime,
    repo_path: PathBuf,
    transcript_dir: PathBuf,
    config: PipelineWorkflowConfig,
}

impl Server {
    /// Opens persistence at `config`'s WAL/snapshot paths and wires the
    /// broadcaster as its sink, so every durably published event reaches
    /// subscribers.
    pub fn open(config: &DaemonConfig) -> Result<Self, PersistenceError> {
        let persistence = Arc::new(Persistence::open(&config.wal_path, &config.snapshot_path)?);
        let broadcaster = Broadcaster::default();
        let sink_broadcaster = broadcaster.clone();
        persistence.set_sink(Arc::new(move |event: &Event| sink_broadcaster.publish(event.clone())));

        Ok(Self {
            persistence,
            broadcaster,
            worktree_manager: WorktreeManager::new(config.worktree_base.clone()),
            container_runtime: ContainerRuntime::new(config.container_image.clone()),
            repo_path: config.repo_path.clone(),
            transcript_dir: config.transcript_dir.clone(),
            config: PipelineWorkflowConfig::default(),
        })
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.broadcaster.subscribe(filter)
    }

    /// Predicts the run's deterministic id and worktree path, starts a
    /// container bind-mounted there, runs the pipeline against it, then
    /// stops the container. Idempotent: a request matching an already
    /// completed run's identity returns that run without starting anything.
    pub async fn start_pipeline(
        &self,
        request: StartPipelineRequest,
        limits: &ResourceLimits,
        env: &[(String, String)],
    ) -> Result<StartPipelineOutcome, ServerError> {
        let request = request.into_engine_request();

        let identity = RunIdentity {
            project_id: request.project_id.as_str(),
            base_commit_sha: &request.base_commit_sha,
            steps: &request.steps,
            variables: &request.variables,
            parent_run_id: request.parent_run_id.as_ref().map(RunId::as_str),
            fork_after_step_id: request.fork_after_step_id.as_deref(),
        };
        let predicted_run_id = RunId::derive(&identity);

        if let Some(existing) = self.persistence.run(predicted_run_id.as_str()) {
            return Ok(StartPipelineOutcome { run: existing, already_exists: true });
        }

        let worktree_path = self.worktree_manager.path_for(predicted_run_id.as_str());
        tokio::fs::create_dir_all(&worktree_path)
            .await
            .map_err(|e| ServerError::Container(e.to_string()))?;
        let container = self
            .container_runtime
            .start(&worktree_path, limits, env)
            .await
            .map_err(|e| ServerError::Container(e.to_string()))?;
        let container = Arc::new(container);

        if needs_claude_credentials(&request) {
            if let Err(e) = stage_claude_credentials(&container).await {
                container.stop(std::time::Duration::from_secs(10)).await.ok();
                return Err(ServerError::Credentials(e));
            }
        }

        let agent = ContainerAgentAdapter::new(container.clone());

        let outcome = self.run_with_agent(request, &agent).await;

        container.stop(std::time::Duration::from_secs(10)).await.ok();

        outcome
    }

    /// The generic core of `start_pipeline`, split out so tests can drive it
    /// with a host-side `AgentAdapter` and skip the container entirely.
    pub async fn run_with_agent<A: AgentAdapter>(
        &self,
        request: noldarim_engine::StartPipelineRequest,
        agent: &A,
    ) -> Result<StartPipelineOutcome, ServerError> {
        run_pipeline(
            request,
            agent,
            &self.worktree_manager,
            &self.repo_path,
            self.persistence.clone(),
            SystemClock,
            self.transcript_dir.clone(),
            "server".to_string(),
            &self.config,
            &CancellationToken::new(),
        )
        .await
        .map_err(ServerError::Engine)
    }

    pub fn task_show(&self, task_id: &str, include_diff: bool, include_raw: bool) -> Option<TaskDetail> {
        let (run_id, step_id) = task_id.split_once('-')?;
        let state = self.persistence.snapshot_state();
        let run = state.runs.get(run_id)?;
        let snapshot = run.step_snapshots.iter().find(|s| s.step_id.as_str() == step_id)?;
        let result = run.step_results.iter().find(|r| r.step_id.as_str() == step_id)?;
        let activities = self.persistence.activities_for_task(task_id);
        Some(TaskDetail::from_result(snapshot, result, &activities, include_diff, include_raw))
    }

    pub fn task_list(&self, project_id: Option<&str>) -> Vec<TaskSummary> {
        let state = self.persistence.snapshot_state();
        let mut summaries = Vec::new();
        for run in state.runs.values() {
            if project_id.is_some_and(|id| run.project_id.as_str() != id) {
                continue;
            }
            for result in &run.step_results {
                let Some(snapshot) = run.step_snapshots.iter().find(|s| s.step_id == result.step_id) else {
                    continue;
                };
                summaries.push(TaskSummary {
                    task_id: noldarim_core::activity::task_id_for(&run.id, &result.step_id),
                    run_id: run.id.as_str().to_string(),
                    step_id: result.step_id.as_str().to_string(),
                    step_name: snapshot.step_name.clone(),
                    status: result.status,
                    commit_sha: result.commit_sha.clone(),
                });
            }
        }
        summaries
    }
}

/// Whether any step in `request` will invoke Claude, either explicitly or
/// via the engine's default `AgentConfig` (`ToolName::Claude`).
fn needs_claude_credentials(request: &noldarim_engine::StartPipelineRequest) -> bool {
    request
        .steps
        .iter()
        .any(|step| !matches!(step.agent_config.as_ref().map(|c| c.tool_name), Some(ToolName::Test)))
}

/// Stages `~/.claude.json` (and, on macOS, keychain credentials) on the
/// host, then copies both into the container at the paths Claude looks for
/// them under `/home/noldarim`.
async fn stage_claude_credentials(container: &noldarim_adapters::Container) -> Result<(), CredentialsError> {
    let staging = tempfile::tempdir().map_err(CredentialsError::Io)?;
    copy_credentials(staging.path()).await?;

    container
        .copy_file_in(&staging.path().join(".claude.json"), "/home/noldarim/.claude.json")
        .await
        .map_err(|e| CredentialsError::Io(std::io::Error::other(e.to_string())))?;

    let credentials_file = staging.path().join(".claude/.credentials.json");
    if credentials_file.exists() {
        container
            .copy_file_in(&credentials_file, "/home/noldarim/.claude/.credentials.json")
            .await
            .map_err(|e| CredentialsError::Io(std::io::Error::other(e.to_string())))?;
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("container error: {0}")]
    Container(String),
    #[error("credentials error: {0}")]
    Credentials(#[from] CredentialsError),
    #[error("engine error: {0}")]
    Engine(#[from] noldarim_engine::EngineError),
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
