// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable agent identifier, format `team-<role><nnn>` (zero-padded).
///
/// Newtype-wrapped rather than a bare `String` so a bare path segment or
/// header value can't silently stand in for an agent identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Coder,
    Reviewer,
    Reconnaissance,
    Security,
    Supervisor,
}

impl AgentRole {
    /// Short tag used inside `agent_id` (`team-<tag><nnn>`).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Coder => "coder",
            Self::Reviewer => "reviewer",
            Self::Reconnaissance => "recon",
            Self::Security => "security",
            Self::Supervisor => "captain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Connected,
    Stopped,
}

/// Full agent record persisted by the Store façade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: AgentId,
    pub role: AgentRole,
    pub model: String,
    pub pane_id: Option<i64>,
    pub pid: Option<u32>,
    pub theme: Option<String>,
    pub project_path: String,
    pub status: AgentStatus,
    pub current_assignment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub shutdown_reason: Option<String>,
}

impl Agent {
    pub fn new(agent_id: AgentId, role: AgentRole, model: impl Into<String>, project_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            agent_id,
            role,
            model: model.into(),
            pane_id: None,
            pid: None,
            theme: None,
            project_path: project_path.into(),
            status: AgentStatus::Pending,
            current_assignment_id: None,
            created_at: now,
            last_seen_at: now,
            shutdown_reason: None,
        }
    }
}

/// Generates `team-<role><nnn>` identifiers with a monotonic per-role
/// counter, the same zero-padded numbering scheme a human operator would
/// expect from pane titles in the host terminal multiplexer.
pub struct AgentIdGenerator {
    counters: Mutex<HashMap<&'static str, u32>>,
}

impl Default for AgentIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentIdGenerator {
    pub fn new() -> Self {
        Self { counters: Mutex::new(HashMap::new()) }
    }

    pub fn next(&self, role: AgentRole) -> AgentId {
        let tag = role.tag();
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let n = counters.entry(tag).or_insert(0);
        *n += 1;
        AgentId::new(format!("team-{tag}{:03}", *n))
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
