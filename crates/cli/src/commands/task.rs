// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `noldarim task` — read-only views over persisted run/step state, backed
//! directly by the daemon's WAL + snapshot rather than a running process.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use noldarim_daemon::{DaemonConfig, Server};

use crate::output::OutputFormat;
use crate::table::{Column, Table};

#[derive(Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Show one task's diff, tokens, summary and tool calls
    Show {
        task_id: String,
        /// Include the full unified diff
        #[arg(long)]
        diff: bool,
        /// Include raw activity records
        #[arg(long)]
        raw: bool,
    },
    /// List tasks across runs
    List {
        /// Filter by project id
        #[arg(long)]
        project: Option<String>,
    },
}

pub fn handle(command: TaskCommand, format: OutputFormat) -> Result<()> {
    let config = DaemonConfig::from_env();
    let server = Server::open(&config).context("failed to open daemon state")?;

    match command {
        TaskCommand::Show { task_id, diff, raw } => {
            let Some(detail) = server.task_show(&task_id, diff, raw) else {
                anyhow::bail!("task '{task_id}' not found");
            };
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&detail)?),
                OutputFormat::Text => {
                    println!("task:     {}", detail.task_id);
                    println!("step:     {} ({:?})", detail.step_name, detail.status);
                    println!("commit:   {} — {}", detail.commit_sha, detail.commit_message);
                    println!(
                        "diff:     +{} -{} across {} file(s)",
                        detail.diff_stats.insertions, detail.diff_stats.deletions, detail.diff_stats.files_changed
                    );
                    if let Some(summary) = &detail.summary {
                        println!("summary:  {}", summary.reason);
                    }
                    if let Some(text) = &detail.diff_text {
                        println!("\n{text}");
                    }
                }
            }
        }
        TaskCommand::List { project } => {
            let tasks = server.task_list(project.as_deref());
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
                OutputFormat::Text => {
                    let mut table = Table::new(vec![
                        Column::left("TASK"),
                        Column::left("STEP").with_max(40),
                        Column::status("STATUS"),
                        Column::muted("COMMIT"),
                    ]);
                    for task in &tasks {
                        table.row(vec![
                            task.task_id.clone(),
                            task.step_name.clone(),
                            format!("{:?}", task.status),
                            task.commit_sha.chars().take(8).collect(),
                        ]);
                    }
                    table.render(&mut std::io::stdout());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
