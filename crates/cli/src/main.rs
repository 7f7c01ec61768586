// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `noldarim` — terminal entry point for starting pipeline runs and
//! inspecting their tasks.

mod color;
mod commands;
mod output;
mod table;

use output::OutputFormat;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{pipeline, task};

#[derive(Parser)]
#[command(name = "noldarim", version, about = "Run AI-assisted code modification pipelines over git")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start or fork a pipeline run
    Pipeline(pipeline::PipelineArgs),
    /// Show or list task results
    Task(task::TaskArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    match cli.command {
        Commands::Pipeline(args) => pipeline::handle(args.command, format).await,
        Commands::Task(args) => task::handle(args.command, format),
    }
}
