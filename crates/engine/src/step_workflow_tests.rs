// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use noldarim_adapters::{AgentOutput, FakeAgentAdapter, WorktreeManager};
use noldarim_core::{FakeClock, FlagFormat, RunId, StepId, ToolName};
use noldarim_storage::Persistence;
use std::collections::BTreeMap;
use std::process::Command as StdCommand;
use tempfile::tempdir;

fn git(repo: &std::path::Path, args: &[&str]) {
    let status = StdCommand::new("git").args(args).current_dir(repo).status().unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["config", "user.email", "test@example.com"]);
    git(dir.path(), &["config", "user.name", "test"]);
    std::fs::write(dir.path().join("file.txt"), "hello\n").unwrap();
    git(dir.path(), &["add", "-A"]);
    git(dir.path(), &["commit", "-q", "-m", "initial"]);
    dir
}

fn head_sha(repo: &std::path::Path) -> String {
    let output = StdCommand::new("git").args(["rev-parse", "HEAD"]).current_dir(repo).output().unwrap();
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn open_persistence(dir: &std::path::Path) -> Persistence {
    Persistence::open(&dir.join("wal.jsonl"), &dir.join("snapshot.bin")).unwrap()
}

fn claude_config(prompt_template: &str) -> AgentConfig {
    AgentConfig {
        tool_name: ToolName::Claude,
        tool_version: "1.0".to_string(),
        prompt_template: prompt_template.to_string(),
        variables: BTreeMap::new(),
        tool_options: BTreeMap::new(),
        flag_format: FlagFormat::Space,
    }
}

#[tokio::test]
async fn completes_a_step_and_commits_the_agents_changes() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let worktree_base = tempdir().unwrap();
    let manager = WorktreeManager::new(worktree_base.path().to_path_buf());
    let worktree = manager.create(repo.path(), "run-step-1", &base_sha).await.unwrap();

    let storage_dir = tempdir().unwrap();
    let persistence = open_persistence(storage_dir.path());
    let clock = FakeClock::new(1_000);

    let agent = FakeAgentAdapter::new();
    agent.push_output(AgentOutput {
        stdout: "did the work\n---SUMMARY---\n{\"reason\":\"wrote a file\",\"changes\":[\"file.txt\"]}\n---END SUMMARY---".to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        duration_ms: 5,
    });

    // Simulate the agent's own file edit, since the fake adapter doesn't
    // actually touch the worktree.
    std::fs::write(worktree.path.join("file.txt"), "hello\nworld\n").unwrap();

    let config = claude_config("say hi");
    let run_id = RunId::new("run-step-1");
    let step_id = StepId::new("step-1");
    let input = StepInput {
        run_id: run_id.clone(),
        step_id: step_id.clone(),
        step_name: "write file",
        worktree: &worktree,
        previous_commit_sha: &base_sha,
        agent_config: &config,
        variables: BTreeMap::new(),
        env: Vec::new(),
    };

    let result = run_step(
        input,
        &agent,
        &manager,
        &persistence,
        &clock,
        &StepWorkflowConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.status, StepStatus::Completed);
    assert_ne!(result.commit_sha, base_sha);
    assert_eq!(result.diff_stats.files_changed, 1);
    assert!(result.summary.is_some());
    assert_eq!(agent.calls().len(), 1);
    assert_eq!(agent.calls()[0].argv, vec!["claude", "--print", "say hi"]);
}

#[tokio::test]
async fn records_no_changes_when_the_agent_makes_no_edits() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let worktree_base = tempdir().unwrap();
    let manager = WorktreeManager::new(worktree_base.path().to_path_buf());
    let worktree = manager.create(repo.path(), "run-step-2", &base_sha).await.unwrap();

    let storage_dir = tempdir().unwrap();
    let persistence = open_persistence(storage_dir.path());
    let clock = FakeClock::new(1_000);
    let agent = FakeAgentAdapter::new();
    agent.push_output(AgentOutput {
        stdout: "nothing to do".to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        duration_ms: 1,
    });

    let config = claude_config("noop");
    let input = StepInput {
        run_id: RunId::new("run-step-2"),
        step_id: StepId::new("step-1"),
        step_name: "noop",
        worktree: &worktree,
        previous_commit_sha: &base_sha,
        agent_config: &config,
        variables: BTreeMap::new(),
        env: Vec::new(),
    };

    let result = run_step(
        input,
        &agent,
        &manager,
        &persistence,
        &clock,
        &StepWorkflowConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.status, StepStatus::Completed);
    assert_eq!(result.commit_sha, base_sha);
    assert_eq!(result.commit_message, "No changes");
    assert!(result.summary.is_none());
}

#[tokio::test]
async fn marks_the_step_failed_on_non_zero_exit_without_committing() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let worktree_base = tempdir().unwrap();
    let manager = WorktreeManager::new(worktree_base.path().to_path_buf());
    let worktree = manager.create(repo.path(), "run-step-3", &base_sha).await.unwrap();

    let storage_dir = tempdir().unwrap();
    let persistence = open_persistence(storage_dir.path());
    let clock = FakeClock::new(1_000);
    let agent = FakeAgentAdapter::new();
    agent.push_output(AgentOutput {
        stdout: String::new(),
        stderr: "boom".to_string(),
        exit_code: Some(1),
        duration_ms: 1,
    });

    let config = claude_config("do it");
    let input = StepInput {
        run_id: RunId::new("run-step-3"),
        step_id: StepId::new("step-1"),
        step_name: "fails",
        worktree: &worktree,
        previous_commit_sha: &base_sha,
        agent_config: &config,
        variables: BTreeMap::new(),
        env: Vec::new(),
    };

    let result = run_step(
        input,
        &agent,
        &manager,
        &persistence,
        &clock,
        &StepWorkflowConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.status, StepStatus::Failed);
    assert!(result.error_message.unwrap().contains("boom"));
    assert!(result.commit_sha.is_empty());
}

#[tokio::test]
async fn a_cancelled_token_short_circuits_before_the_agent_runs() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let worktree_base = tempdir().unwrap();
    let manager = WorktreeManager::new(worktree_base.path().to_path_buf());
    let worktree = manager.create(repo.path(), "run-step-4", &base_sha).await.unwrap();

    let storage_dir = tempdir().unwrap();
    let persistence = open_persistence(storage_dir.path());
    let clock = FakeClock::new(1_000);
    let agent = FakeAgentAdapter::new();

    let config = claude_config("do it");
    let input = StepInput {
        run_id: RunId::new("run-step-4"),
        step_id: StepId::new("step-1"),
        step_name: "cancelled",
        worktree: &worktree,
        previous_commit_sha: &base_sha,
        agent_config: &config,
        variables: BTreeMap::new(),
        env: Vec::new(),
    };

    let token = CancellationToken::new();
    token.cancel();

    let result = run_step(
        input,
        &agent,
        &manager,
        &persistence,
        &clock,
        &StepWorkflowConfig::default(),
        &token,
    )
    .await;

    assert!(result.unwrap_err().is_cancelled());
    assert!(agent.calls().is_empty());
}

#[tokio::test]
async fn retries_the_agent_up_to_the_configured_attempt_limit() {
    let repo = init_repo();
    let base_sha = head_sha(repo.path());
    let worktree_base = tempdir().unwrap();
    let manager = WorktreeManager::new(worktree_base.path().to_path_buf());
    let worktree = manager.create(repo.path(), "run-step-5", &base_sha).await.unwrap();

    let storage_dir = tempdir().unwrap();
    let persistence = open_persistence(storage_dir.path());
    let clock = FakeClock::new(1_000);
    let agent = FakeAgentAdapter::new();
    agent.push_error(noldarim_adapters::AgentAdapterError::SpawnFailed("enoent".to_string()));
    agent.push_output(AgentOutput {
        stdout: "recovered".to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        duration_ms: 1,
    });

    let config = claude_config("do it");
    let input = StepInput {
        run_id: RunId::new("run-step-5"),
        step_id: StepId::new("step-1"),
        step_name: "retries",
        worktree: &worktree,
        previous_commit_sha: &base_sha,
        agent_config: &config,
        variables: BTreeMap::new(),
        env: Vec::new(),
    };

    let result = run_step(
        input,
        &agent,
        &manager,
        &persistence,
        &clock,
        &StepWorkflowConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.status, StepStatus::Completed);
    assert_eq!(agent.calls().len(), 2);
}
