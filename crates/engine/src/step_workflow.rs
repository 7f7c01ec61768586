// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `run_step`: the six durable phases that turn one pipeline step into a
//! commit. Each phase below corresponds to a separately retriable activity
//! in the durable-workflow model this crate's callers run it under.

use crate::cancellation::CancellationToken;
use crate::error::EngineError;
use noldarim_adapters::{AgentAdapter, WorktreeManager, Worktree};
use noldarim_core::{
    activity::task_id_for, parse_summary, render_prompt, ActivityEventType, AgentConfig, Clock,
    RunId, StepId, StepResult, StepStatus, TokenCounts,
};
use noldarim_storage::Persistence;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tunables for phase 2's retry/timeout policy. Defaults match the 15
/// minute / 2 attempt agent execution policy; Git and container activities
/// elsewhere in this crate use `noldarim_adapters`'s own shorter timeouts.
#[derive(Debug, Clone)]
pub struct StepWorkflowConfig {
    pub agent_timeout: Duration,
    pub max_agent_attempts: u32,
}

impl Default for StepWorkflowConfig {
    fn default() -> Self {
        Self {
            agent_timeout: Duration::from_secs(15 * 60),
            max_agent_attempts: 2,
        }
    }
}

/// Everything `run_step` needs to perform one step end to end.
pub struct StepInput<'a> {
    pub run_id: RunId,
    pub step_id: StepId,
    pub step_name: &'a str,
    pub worktree: &'a Worktree,
    pub previous_commit_sha: &'a str,
    pub agent_config: &'a AgentConfig,
    pub variables: std::collections::BTreeMap<String, String>,
    pub env: Vec<(String, String)>,
}

const STEP_DOC_DIR: &str = ".noldarim/steps";

/// Execute one step: render its argv, run the agent, capture the diff,
/// write a step report, commit, and aggregate token usage. Returns a
/// `StepResult` in every non-cancelled case, even on agent failure, so the
/// pipeline driver can persist it and decide whether to continue.
#[tracing::instrument(skip_all, fields(run_id = %input.run_id, step_id = %input.step_id))]
pub async fn run_step<A: AgentAdapter, C: Clock>(
    input: StepInput<'_>,
    agent: &A,
    worktree_manager: &WorktreeManager,
    persistence: &Persistence,
    clock: &C,
    config: &StepWorkflowConfig,
    cancellation: &CancellationToken,
) -> Result<StepResult, EngineError> {
    let started_at = Instant::now();
    let mut result = StepResult::pending(input.run_id.clone(), input.step_id.clone());

    // Phase 1: prepare command.
    cancellation.check()?;
    let prompt = render_prompt(&input.agent_config.prompt_template, &input.variables);
    let argv = input.agent_config.render_argv(&prompt);

    // Phase 2: execute agent, with bounded retry since AI execution is
    // expensive and rarely recoverable on retry.
    let output = cancellation
        .race(run_agent_with_retry(agent, &argv, &input.worktree.path, &input.env, config))
        .await??;
    result.agent_output = output.stdout.clone();
    if !output.succeeded() {
        result.status = StepStatus::Failed;
        result.error_message = Some(format!(
            "agent exited with code {:?}: {}",
            output.exit_code, output.stderr
        ));
        result.duration_ms = started_at.elapsed().as_millis() as u64;
        return Ok(result);
    }

    // Phase 3: capture diff.
    cancellation.check()?;
    let (files, insertions, deletions) = worktree_manager
        .diff_numstat(input.worktree, input.previous_commit_sha)
        .await?;
    result.diff_stats = noldarim_core::DiffStats {
        files_changed: files,
        insertions,
        deletions,
    };
    result.diff_text = worktree_manager
        .diff(input.worktree, input.previous_commit_sha)
        .await?;

    // Phase 4: generate step documentation from the summary block, if any.
    cancellation.check()?;
    let summary = parse_summary(&output.stdout);
    match &summary {
        Some(Ok(s)) => result.summary = Some(s.clone()),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "summary block present but invalid JSON");
            result.error_message = Some(format!("invalid summary block: {e}"));
        }
        None => {}
    }
    if result.diff_stats.files_changed > 0 {
        write_step_report(&input, &result, clock).await?;
    }

    // Phase 5: commit everything staged, including the step report.
    cancellation.check()?;
    let commit_message = format!("Step {}: {}", input.step_id, input.step_name);
    match worktree_manager.commit(input.worktree, &commit_message).await? {
        Some(sha) => {
            result.commit_sha = sha;
            result.commit_message = commit_message;
        }
        None => {
            result.commit_sha = input.previous_commit_sha.to_string();
            result.commit_message = "No changes".to_string();
        }
    }

    // Phase 6: aggregate tokens recorded by the observability workflow for
    // this task. Missing data is a warning, not a failure.
    let task_id = task_id_for(&input.run_id, &input.step_id);
    let records = persistence.activities_for_task(&task_id);
    if records.is_empty() {
        tracing::warn!(%task_id, "no activity records found for token aggregation");
    }
    let mut tokens = TokenCounts::default();
    for record in records.iter().filter(|r| r.event_type == ActivityEventType::AiOutput) {
        tokens.add(&record.tokens);
    }
    result.tokens = tokens;

    result.status = StepStatus::Completed;
    result.duration_ms = started_at.elapsed().as_millis() as u64;
    Ok(result)
}

async fn run_agent_with_retry<A: AgentAdapter>(
    agent: &A,
    argv: &[String],
    cwd: &std::path::Path,
    env: &[(String, String)],
    config: &StepWorkflowConfig,
) -> Result<noldarim_adapters::AgentOutput, EngineError> {
    let mut last_err = None;
    for attempt in 1..=config.max_agent_attempts {
        match tokio::time::timeout(config.agent_timeout, agent.run(argv, cwd, env)).await {
            Ok(Ok(output)) => return Ok(output),
            Ok(Err(e)) => {
                tracing::warn!(attempt, error = %e, "agent execution failed");
                last_err = Some(EngineError::from(e));
            }
            Err(_) => {
                tracing::warn!(attempt, timeout = ?config.agent_timeout, "agent execution timed out");
                last_err = Some(EngineError::Transient(format!(
                    "agent execution timed out after {:?}",
                    config.agent_timeout
                )));
            }
        }
    }
    Err(last_err.unwrap_or_else(|| EngineError::AgentFailure("agent never ran".to_string())))
}

async fn write_step_report<C: Clock>(
    input: &StepInput<'_>,
    result: &StepResult,
    clock: &C,
) -> Result<(), EngineError> {
    let dir = input.worktree.path.join(STEP_DOC_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| EngineError::Resource(e.to_string()))?;

    let mut report = format!(
        "# Step {}: {}\n\ngenerated_at_ms: {}\n\n",
        input.step_id,
        input.step_name,
        clock.now_ms()
    );
    match &result.summary {
        Some(summary) => {
            report.push_str(&format!("## Reason\n\n{}\n\n## Changes\n\n", summary.reason));
            for change in &summary.changes {
                report.push_str(&format!("- {change}\n"));
            }
        }
        None => report.push_str("_no summary block provided by the agent_\n"),
    }

    let path = dir.join(format!("{}.md", input.step_id));
    tokio::fs::write(&path, report)
        .await
        .map_err(|e| EngineError::Resource(e.to_string()))
}

#[cfg(test)]
#[path = "step_workflow_tests.rs"]
mod tests;
