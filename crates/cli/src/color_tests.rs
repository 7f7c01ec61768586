// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn should_colorize_respects_no_color() {
    std::env::set_var("NO_COLOR", "1");
    std::env::set_var("COLOR", "1");
    assert!(!should_colorize(), "NO_COLOR=1 should override COLOR=1");
    std::env::remove_var("NO_COLOR");
    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn should_colorize_respects_color_force() {
    std::env::remove_var("NO_COLOR");
    std::env::set_var("COLOR", "1");
    assert!(should_colorize(), "COLOR=1 should force color on");
    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn apply_header_produces_ansi_when_color_forced() {
    std::env::set_var("COLOR", "1");
    std::env::remove_var("NO_COLOR");

    let result = apply_header("TASK");
    assert!(result.contains("\x1b[38;5;74m"), "expected ANSI header color");
    assert!(result.contains("TASK"));
    assert!(result.contains("\x1b[0m"), "expected ANSI reset");

    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn apply_muted_produces_ansi_when_color_forced() {
    std::env::set_var("COLOR", "1");
    std::env::remove_var("NO_COLOR");

    let result = apply_muted("a1b2c3d4");
    assert!(result.contains("\x1b[38;5;240m"), "expected ANSI muted color");

    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn header_and_muted_plain_when_no_color() {
    std::env::set_var("NO_COLOR", "1");
    std::env::remove_var("COLOR");

    assert_eq!(apply_header("TASK"), "TASK");
    assert_eq!(apply_muted("a1b2c3d4"), "a1b2c3d4");

    std::env::remove_var("NO_COLOR");
}

#[test]
#[serial]
fn status_green_for_running_and_completed() {
    std::env::set_var("COLOR", "1");
    std::env::remove_var("NO_COLOR");

    assert!(apply_status("Running").contains("\x1b[32m"));
    assert!(apply_status("Completed").contains("\x1b[32m"));

    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn status_yellow_for_pending_and_skipped() {
    std::env::set_var("COLOR", "1");
    std::env::remove_var("NO_COLOR");

    assert!(apply_status("Pending").contains("\x1b[33m"));
    assert!(apply_status("Skipped").contains("\x1b[33m"));

    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn status_red_for_failed() {
    std::env::set_var("COLOR", "1");
    std::env::remove_var("NO_COLOR");

    let result = apply_status("Failed");
    assert!(result.contains("\x1b[31m"));
    assert!(result.contains("Failed"));

    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn status_unknown_returns_plain() {
    std::env::set_var("COLOR", "1");
    std::env::remove_var("NO_COLOR");

    let result = apply_status("custom_status");
    assert_eq!(result, "custom_status", "unknown statuses should not be colored");

    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn status_plain_when_no_color() {
    std::env::set_var("NO_COLOR", "1");
    std::env::remove_var("COLOR");

    assert_eq!(apply_status("Running"), "Running");
    assert_eq!(apply_status("Failed"), "Failed");

    std::env::remove_var("NO_COLOR");
}

#[test]
#[serial]
fn status_compound_failed_gets_red() {
    std::env::set_var("COLOR", "1");
    std::env::remove_var("NO_COLOR");

    let result = apply_status("Failed: timeout");
    assert!(result.contains("\x1b[31m"));
    assert!(result.contains("Failed: timeout"));

    std::env::remove_var("COLOR");
}
