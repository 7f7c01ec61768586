// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `noldarimd`: the background process holding persistence and the event
//! broadcaster open for the (unspecified) transport layer to drive. There
//! is no socket listener here — starting the process just proves
//! persistence opens cleanly and the broadcaster is wired, then blocks
//! until a shutdown signal arrives.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use noldarim_daemon::{DaemonConfig, Server};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("noldarimd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("noldarimd {}", env!("CARGO_PKG_VERSION"));
                println!("Background process holding pipeline state and the event broadcaster.");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: noldarimd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    setup_logging();

    let config = DaemonConfig::from_env();
    std::fs::create_dir_all(&config.worktree_base)?;
    if let Some(parent) = config.wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let server = Server::open(&config)?;
    let _subscription = server.subscribe(noldarim_core::EventFilter::default());

    info!(bind_addr = %config.bind_addr, "daemon ready");
    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    info!("daemon stopped");
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}
