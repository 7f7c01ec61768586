// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ANSI coloring for `noldarim`'s text-mode output: run/step status and
//! table styling share this palette so `task show`/`task list` render
//! consistently.

use std::io::IsTerminal;

const HEADER: u8 = 74;
const MUTED: u8 = 240;

const RESET: &str = "\x1b[0m";

fn fg256(code: u8) -> String {
    format!("\x1b[38;5;{code}m")
}

/// Determine if color output should be enabled.
///
/// Priority: `NO_COLOR=1` disables → `COLOR=1` forces → TTY check.
pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
        return false;
    }
    if std::env::var("COLOR").is_ok_and(|v| v == "1") {
        return true;
    }
    std::io::stdout().is_terminal()
}

/// Apply the header color (used for table column headers).
pub fn apply_header(text: &str) -> String {
    if should_colorize() {
        format!("{}{}{}", fg256(HEADER), text, RESET)
    } else {
        text.to_string()
    }
}

/// Apply the muted color (used for commit SHAs and other secondary columns).
pub fn apply_muted(text: &str) -> String {
    if should_colorize() {
        format!("{}{}{}", fg256(MUTED), text, RESET)
    } else {
        text.to_string()
    }
}

/// Colorize a `RunStatus`/`StepStatus` debug string by its semantic meaning.
///
/// - Green: completed, running (steady-state progress)
/// - Yellow: pending, skipped
/// - Red: failed
/// - Default (no color): anything else
///
/// Matches on the first word so compound strings like "failed: timeout" are
/// still colored correctly.
pub fn apply_status(text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    let lower = text.trim_start().to_lowercase();
    let first_word = lower.split(|c: char| !c.is_alphabetic()).next().unwrap_or("");
    let code = match first_word {
        "completed" | "running" => "\x1b[32m",
        "pending" | "skipped" => "\x1b[33m",
        "failed" => "\x1b[31m",
        _ => return text.to_string(),
    };
    format!("{code}{text}{RESET}")
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
