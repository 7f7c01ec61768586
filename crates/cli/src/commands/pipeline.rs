// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `noldarim pipeline` — exercises the start-pipeline API request shape
//! from a terminal: `start` for a fresh run, `fork` to resume from a
//! parent run's step boundary.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use noldarim_adapters::{ClaudeAgentAdapter, ResourceLimits};
use noldarim_core::StepSpecInput;
use noldarim_daemon::{DaemonConfig, Server};

use crate::output::OutputFormat;

#[derive(Args)]
pub struct PipelineArgs {
    #[command(subcommand)]
    pub command: PipelineCommand,
}

/// `id:name:prompt` triple for a single step, as repeated `--step` flags.
fn parse_step(raw: &str) -> Result<StepSpecInput, String> {
    let mut parts = raw.splitn(3, ':');
    let (id, name, prompt) = match (parts.next(), parts.next(), parts.next()) {
        (Some(id), Some(name), Some(prompt)) => (id, name, prompt),
        _ => return Err(format!("expected id:name:prompt, got '{raw}'")),
    };
    Ok(StepSpecInput {
        id: id.to_string(),
        name: name.to_string(),
        prompt: prompt.to_string(),
        agent_config: None,
    })
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[derive(Subcommand)]
pub enum PipelineCommand {
    /// Start a new pipeline run
    Start {
        #[arg(long)]
        project: String,
        #[arg(long)]
        name: String,
        /// Commit SHA to check out the worktree at
        #[arg(long = "base")]
        base_commit_sha: String,
        /// A step as `id:name:prompt`; repeat for multiple steps
        #[arg(long = "step", value_parser = parse_step, required = true)]
        steps: Vec<StepSpecInput>,
        #[arg(long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
        /// Run the agent on the host instead of inside a sandbox container
        #[arg(long)]
        host: bool,
    },
    /// Start a run that reuses a parent run's steps up to a fork point
    Fork {
        #[arg(long)]
        project: String,
        #[arg(long)]
        name: String,
        #[arg(long = "base")]
        base_commit_sha: String,
        #[arg(long = "step", value_parser = parse_step, required = true)]
        steps: Vec<StepSpecInput>,
        #[arg(long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
        #[arg(long = "parent")]
        parent_run_id: String,
        #[arg(long = "after")]
        fork_after_step_id: String,
        #[arg(long)]
        host: bool,
    },
}

pub async fn handle(command: PipelineCommand, format: OutputFormat) -> Result<()> {
    let (project, name, base_commit_sha, steps, vars, parent_run_id, fork_after_step_id, host) = match command {
        PipelineCommand::Start { project, name, base_commit_sha, steps, vars, host } => {
            (project, name, base_commit_sha, steps, vars, None, None, host)
        }
        PipelineCommand::Fork {
            project,
            name,
            base_commit_sha,
            steps,
            vars,
            parent_run_id,
            fork_after_step_id,
            host,
        } => (project, name, base_commit_sha, steps, vars, Some(parent_run_id), Some(fork_after_step_id), host),
    };

    let config = DaemonConfig::from_env();
    let server = Server::open(&config).context("failed to open daemon state")?;

    let request = noldarim_daemon::StartPipelineRequest {
        project_id: project,
        name,
        base_commit_sha,
        steps,
        variables: vars.into_iter().collect::<BTreeMap<_, _>>(),
        parent_run_id,
        fork_after_step_id,
    };

    let outcome = if host {
        let agent = ClaudeAgentAdapter::new();
        server.run_with_agent(request.into_engine_request(), &agent).await?
    } else {
        server.start_pipeline(request, &ResourceLimits::default(), &[]).await?
    };

    match format {
        OutputFormat::Text => {
            println!("run {} ({})", outcome.run.id, if outcome.already_exists { "already existed" } else { "started" });
            println!("status: {:?}", outcome.run.status);
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "run_id": outcome.run.id.as_str(),
                    "already_exists": outcome.already_exists,
                    "status": outcome.run.status,
                })
            );
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
