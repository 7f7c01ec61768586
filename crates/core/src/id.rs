// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation abstractions

use crate::hashing::{canonical_json, sha256_hex};
use serde::Serialize;

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `short()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct MyId;
/// }
///
/// // With extra derives (e.g. Default):
/// define_id! {
///     #[derive(Default)]
///     pub struct MyDefaultId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns a string slice truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                if self.0.len() <= n {
                    &self.0
                } else {
                    &self.0[..n]
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Derive a deterministic ID from a canonical JSON serialization of `value`,
/// prefixed with `prefix` and truncated to a fixed-width hex digest.
///
/// Two inputs that canonicalize to the same JSON produce the same ID: this is
/// what lets a run or step submission be re-entrant instead of relying on a
/// separate dedup table.
pub fn derive_id(prefix: &str, value: &impl Serialize) -> String {
    let canonical = canonical_json(value);
    let digest = sha256_hex(canonical.as_bytes());
    format!("{prefix}_{}", &digest[..32])
}

define_id! {
    /// Identifies a project (a Git repository under orchestration).
    pub struct ProjectId;
}

define_id! {
    /// Identifies a pipeline run. Deterministic: see `RunId::derive`.
    pub struct RunId;
}

define_id! {
    /// Identifies a step within a run. Deterministic: see `StepId::derive`.
    pub struct StepId;
}

define_id! {
    /// Identifies an `AIActivityRecord`.
    pub struct ActivityId;
}

define_id! {
    /// Identifies an event for broadcaster idempotency tracking.
    pub struct EventId;
}

impl RunId {
    /// Hash of `(project_id, base_commit_sha, canonical(steps), canonical(variables),
    /// parent_run_id?, fork_after_step_id?)` per the run identity rule.
    pub fn derive(value: &impl Serialize) -> Self {
        Self(derive_id("run", value))
    }
}

impl StepId {
    /// Hash of `(run_id, step_index, canonical(step_spec))`.
    pub fn derive(value: &impl Serialize) -> Self {
        Self(derive_id("step", value))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
