// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::FakeAgentAdapter;
use serial_test::serial;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn assert_log(logs: &str, label: &str, expected: &str) {
    assert!(logs.contains(expected), "should log {label}. logs:\n{logs}");
}

#[test]
#[serial(tracing)]
fn run_logs_entry_and_completion_on_success() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeAgentAdapter::new();
        let traced = TracedAgent::new(fake);
        traced
            .run(&["claude".to_string()], Path::new("/tmp"), &[])
            .await
    });

    assert!(result.is_ok());
    assert_log(&logs, "span name", "agent.run");
    assert_log(&logs, "entry message", "starting");
    assert_log(&logs, "completion", "agent finished");
    assert_log(&logs, "timing", "elapsed_ms");
}

#[test]
#[serial(tracing)]
fn run_logs_error_on_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeAgentAdapter::new();
        fake.push_error(AgentAdapterError::SpawnFailed("boom".to_string()));
        let traced = TracedAgent::new(fake);
        traced.run(&[], Path::new("/tmp"), &[]).await
    });

    assert!(result.is_err());
    assert_log(&logs, "run failure", "run failed");
}

#[tokio::test]
async fn run_delegates_to_inner_adapter() {
    let fake = FakeAgentAdapter::new();
    let traced = TracedAgent::new(fake.clone());

    traced
        .run(
            &["claude".to_string(), "--print".to_string()],
            &PathBuf::from("/workspace"),
            &[("KEY".to_string(), "VALUE".to_string())],
        )
        .await
        .unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].argv, vec!["claude".to_string(), "--print".to_string()]);
    assert_eq!(calls[0].cwd, PathBuf::from("/workspace"));
    assert_eq!(calls[0].env, vec![("KEY".to_string(), "VALUE".to_string())]);
}

#[tokio::test]
async fn run_returns_the_inner_adapters_output() {
    let fake = FakeAgentAdapter::new();
    fake.push_output(AgentOutput {
        stdout: "result".to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        duration_ms: 5,
    });
    let traced = TracedAgent::new(fake);

    let output = traced.run(&[], Path::new("/tmp"), &[]).await.unwrap();
    assert_eq!(output.stdout, "result");
}
