// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentId;

/// Closed set of event kinds plus the open-ended `agent_message` escape
/// hatch agents use for free-form captain/worker chatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    NewTask,
    TaskClaimed,
    TaskCompleted,
    AssignmentCreated,
    AssignmentAccepted,
    ReviewRequested,
    ReviewResult,
    BoardFinalized,
    DefectReported,
    GuidanceRequested,
    StopApprovalRequested,
    HumanInputRequested,
    AgentConnected,
    AgentDisconnected,
    AgentMessage,
}

/// A targeted message carried by the [`crate::event_bus::EventBus`].
///
/// `target` of `None` means broadcast to every connected subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub source: AgentId,
    pub target: Option<AgentId>,
    pub priority: EventPriority,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub delivered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Low,
    Normal,
    High,
    Critical,
}

impl Default for EventPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl Event {
    /// Build a new event, stamping `id`/`created_at`/`delivered` the way
    /// every publish call site expects (the only place these fields are
    /// ever set — callers never construct them by hand).
    pub fn new(
        event_type: EventType,
        source: AgentId,
        target: Option<AgentId>,
        priority: EventPriority,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            source,
            target,
            priority,
            payload,
            created_at: Utc::now(),
            delivered: false,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.target.is_none()
    }

    pub fn matches_target(&self, agent: &AgentId) -> bool {
        match &self.target {
            None => true,
            Some(t) => t == agent,
        }
    }

    pub fn matches_types(&self, types: &[EventType]) -> bool {
        types.is_empty() || types.contains(&self.event_type)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
