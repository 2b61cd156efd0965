// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::agent::{AgentId, AgentStatus};
use crate::error::KernelError;

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);
const SPAWN_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Per-agent bookkeeping the sweeper needs; separate from the Store's
/// `Agent` row so liveness math stays on `Instant` rather than wall clock.
struct Tracked {
    status: AgentStatus,
    since: Instant,
}

/// Two-phase presence state machine: pending → connected → stopped.
/// Transitions out of `stopped` are forbidden; a new instance needs a new
/// agent id.
///
/// A single sweep task handles both the spawn-timeout demotion for
/// `pending` rows and the idle-timeout demotion for `connected` rows.
pub struct PresenceTracker {
    agents: RwLock<HashMap<AgentId, Tracked>>,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self { agents: RwLock::new(HashMap::new()) }
    }

    /// The Spawner inserts a `pending` row as soon as it creates a pane.
    pub async fn register_pending(&self, agent_id: AgentId) {
        self.agents.write().await.insert(agent_id, Tracked { status: AgentStatus::Pending, since: Instant::now() });
    }

    /// The agent calls `register_agent`, or the Connection Manager fires
    /// `on_connect`: both promote `pending`/`connected` to `connected`
    /// and reset the idle clock.
    pub async fn mark_connected(&self, agent_id: &AgentId) -> Result<(), KernelError> {
        let mut agents = self.agents.write().await;
        match agents.get_mut(agent_id) {
            Some(tracked) if tracked.status != AgentStatus::Stopped => {
                tracked.status = AgentStatus::Connected;
                tracked.since = Instant::now();
                Ok(())
            }
            Some(_) => Err(KernelError::state_transition(format!("{agent_id} is stopped"))),
            None => Err(KernelError::state_transition(format!("unknown agent {agent_id}"))),
        }
    }

    /// Bump the idle clock on every inbound tool call (liveness proxy).
    pub async fn bump_last_seen(&self, agent_id: &AgentId) {
        if let Some(tracked) = self.agents.write().await.get_mut(agent_id) {
            if tracked.status == AgentStatus::Connected {
                tracked.since = Instant::now();
            }
        }
    }

    /// Connection Manager `on_disconnect` hook, or an explicit stop tool.
    pub async fn mark_stopped(&self, agent_id: &AgentId) {
        if let Some(tracked) = self.agents.write().await.get_mut(agent_id) {
            tracked.status = AgentStatus::Stopped;
        }
    }

    pub async fn status(&self, agent_id: &AgentId) -> Option<AgentStatus> {
        self.agents.read().await.get(agent_id).map(|t| t.status)
    }

    pub async fn connected_ids(&self) -> Vec<AgentId> {
        self.agents
            .read()
            .await
            .iter()
            .filter(|(_, t)| t.status == AgentStatus::Connected)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// One combined pass: demote stale `pending` rows past the spawn
    /// timeout and idle `connected` rows past the idle timeout.
    async fn sweep_once(&self) -> Vec<AgentId> {
        let mut demoted = Vec::new();
        let mut agents = self.agents.write().await;
        for (agent_id, tracked) in agents.iter_mut() {
            let expired = match tracked.status {
                AgentStatus::Pending => tracked.since.elapsed() > SPAWN_TIMEOUT,
                AgentStatus::Connected => tracked.since.elapsed() > IDLE_TIMEOUT,
                AgentStatus::Stopped => false,
            };
            if expired {
                tracked.status = AgentStatus::Stopped;
                demoted.push(agent_id.clone());
            }
        }
        demoted
    }

    pub async fn run_sweeper(self: Arc<Self>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(SWEEP_INTERVAL) => {}
                _ = shutdown.cancelled() => {
                    debug!("presence sweeper shutting down");
                    return;
                }
            }

            for agent_id in self.sweep_once().await {
                warn!(agent_id = %agent_id, "presence sweeper demoted stale agent to stopped");
            }
        }
    }
}

#[cfg(test)]
#[path = "presence_tests.rs"]
mod tests;
