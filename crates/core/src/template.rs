// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt template rendering: `{{.var}}` substitution.

use std::collections::BTreeMap;

/// Substitute `{{.key}}` placeholders in `template` using `vars`. A
/// placeholder whose key is absent from `vars` is left literal.
pub fn render_prompt(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        match rest.find("{{.") {
            None => {
                out.push_str(rest);
                break;
            }
            Some(start) => {
                out.push_str(&rest[..start]);
                let after = &rest[start + 3..];
                match after.find("}}") {
                    None => {
                        out.push_str(&rest[start..]);
                        break;
                    }
                    Some(end) => {
                        let key = &after[..end];
                        match vars.get(key) {
                            Some(value) => out.push_str(value),
                            None => out.push_str(&rest[start..start + 3 + end + 2]),
                        }
                        rest = &after[end + 2..];
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
