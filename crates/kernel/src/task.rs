// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable task identifier (source-qualified, since multiple task sources
/// may be configured simultaneously and each mints its own ids).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Blocked,
    Completed,
    Cancelled,
}

/// A unit of work fetched from a [`crate::broker::TaskSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub title: String,
    pub description: String,
    /// 1 = highest.
    pub priority: u32,
    pub status: TaskStatus,
    pub origin_source: String,
    pub repo_reference: Option<String>,
    pub requirements: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Priority-first, source-stable ordering key for broker scheduling:
    /// lower `priority` wins; ties broken by source name for determinism.
    pub fn schedule_key(&self) -> (u32, &str) {
        (self.priority, self.origin_source.as_str())
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
