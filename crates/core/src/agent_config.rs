// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration and argv rendering for the closed set of supported
//! tools (`claude`, `test`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tool option value; intentionally a closed set mirroring JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOption {
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    Claude,
    Test,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Claude => "claude",
            ToolName::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagFormat {
    Space,
    Equals,
}

/// A reserved tool option key that is never emitted as a flag, kept for
/// historical compatibility with configs that still carry it.
const RESERVED_KEYS: &[&str] = &["max_tokens"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub tool_name: ToolName,
    pub tool_version: String,
    pub prompt_template: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub tool_options: BTreeMap<String, ToolOption>,
    pub flag_format: FlagFormat,
}

impl AgentConfig {
    /// Render the final argv for invoking this tool with `prompt` as the
    /// already-rendered prompt text. Keys are emitted in lexicographic
    /// order; `max_tokens` is never emitted; boolean `false` is omitted;
    /// boolean `true` becomes a bare flag; empty strings are omitted.
    pub fn render_argv(&self, prompt: &str) -> Vec<String> {
        match self.tool_name {
            ToolName::Claude => self.render_claude_argv(prompt),
            ToolName::Test => vec!["sh".to_string(), "-c".to_string(), prompt.to_string()],
        }
    }

    fn render_claude_argv(&self, prompt: &str) -> Vec<String> {
        let mut argv = vec!["claude".to_string(), "--print".to_string()];
        argv.extend(self.render_flags());
        argv.push(prompt.to_string());
        argv
    }

    fn render_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        for (key, value) in &self.tool_options {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            match value {
                ToolOption::Bool(true) => flags.push(format!("--{key}")),
                ToolOption::Bool(false) => {}
                ToolOption::Number(n) => flags.extend(self.format_flag(key, &format_number(*n))),
                ToolOption::String(s) if s.is_empty() => {}
                ToolOption::String(s) => flags.extend(self.format_flag(key, s)),
            }
        }
        flags
    }

    fn format_flag(&self, key: &str, value: &str) -> Vec<String> {
        match self.flag_format {
            FlagFormat::Space => vec![format!("--{key}"), value.to_string()],
            FlagFormat::Equals => vec![format!("--{key}={value}")],
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
#[path = "agent_config_tests.rs"]
mod tests;
