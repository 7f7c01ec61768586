// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Interval at which the observability workflow polls a running step's
/// transcript file for new activity (default: 2000ms).
pub fn transcript_poll_ms() -> Duration {
    parse_duration_ms("NOLDARIM_TRANSCRIPT_POLL_MS").unwrap_or(Duration::from_secs(2))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
