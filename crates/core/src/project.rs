// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project record: identity plus a path to the Git repository it wraps.

use crate::id::ProjectId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub repo_path: PathBuf,
}

impl Project {
    pub fn new(id: impl Into<ProjectId>, name: impl Into<String>, repo_path: PathBuf) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            repo_path,
        }
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
