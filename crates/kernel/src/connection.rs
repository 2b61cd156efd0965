// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::error::KernelError;

const REAPER_INTERVAL: Duration = Duration::from_secs(30);
const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecycle {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl SessionLifecycle {
    fn can_advance_to(self, next: Self) -> bool {
        use SessionLifecycle::*;
        matches!(
            (self, next),
            (Connecting, Active) | (Connecting, Closing) | (Active, Closing) | (Closing, Closed)
        )
    }
}

/// A server-push stream a session writes JSON-RPC frames onto. Production
/// code implements this over an SSE body sender; tests implement it over
/// an in-memory channel.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_frame(&self, frame: Value) -> Result<(), KernelError>;
    async fn close(&self);
}

/// A live transport attachment of one Agent. Frame writes are serialized
/// through `write_lock` so concurrent publishers never interleave bytes
/// on the same stream.
pub struct Session {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub created_at: DateTime<Utc>,
    last_activity: Mutex<Instant>,
    state: Mutex<SessionLifecycle>,
    write_lock: Mutex<()>,
    transport: Arc<dyn Transport>,
}

impl Session {
    fn new(agent_id: AgentId, transport: Arc<dyn Transport>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            created_at: Utc::now(),
            last_activity: Mutex::new(Instant::now()),
            state: Mutex::new(SessionLifecycle::Connecting),
            write_lock: Mutex::new(()),
            transport,
        }
    }

    pub async fn mark_active(&self) {
        *self.state.lock().await = SessionLifecycle::Active;
        *self.last_activity.lock().await = Instant::now();
    }

    pub async fn touch(&self) {
        *self.last_activity.lock().await = Instant::now();
    }

    pub async fn lifecycle(&self) -> SessionLifecycle {
        *self.state.lock().await
    }

    pub async fn idle_for(&self) -> Duration {
        self.last_activity.lock().await.elapsed()
    }

    /// Send a frame, serializing with every other writer on this session.
    pub async fn send(&self, frame: Value) -> Result<(), KernelError> {
        let _guard = self.write_lock.lock().await;
        match self.transport.send_frame(frame).await {
            Ok(()) => {
                self.touch().await;
                Ok(())
            }
            Err(e) => {
                self.close().await;
                Err(e)
            }
        }
    }

    /// Idempotent close: forward-only state machine, once-only gate.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if *state == SessionLifecycle::Closed {
            return;
        }
        if state.can_advance_to(SessionLifecycle::Closing) {
            *state = SessionLifecycle::Closing;
        }
        drop(state);
        self.transport.close().await;
        *self.state.lock().await = SessionLifecycle::Closed;
    }
}

type ConnectHook = Box<dyn Fn(&AgentId) + Send + Sync>;
type DisconnectHook = Box<dyn Fn(&AgentId) + Send + Sync>;

/// Owns one Session per Agent, a single-writer write path, and a
/// background reaper.
pub struct ConnectionManager {
    by_agent: RwLock<HashMap<AgentId, Arc<Session>>>,
    by_session: RwLock<HashMap<Uuid, AgentId>>,
    on_connect: RwLock<Vec<ConnectHook>>,
    on_disconnect: RwLock<Vec<DisconnectHook>>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            by_agent: RwLock::new(HashMap::new()),
            by_session: RwLock::new(HashMap::new()),
            on_connect: RwLock::new(Vec::new()),
            on_disconnect: RwLock::new(Vec::new()),
        }
    }

    pub async fn on_connect(&self, hook: impl Fn(&AgentId) + Send + Sync + 'static) {
        self.on_connect.write().await.push(Box::new(hook));
    }

    pub async fn on_disconnect(&self, hook: impl Fn(&AgentId) + Send + Sync + 'static) {
        self.on_disconnect.write().await.push(Box::new(hook));
    }

    /// Atomically close any existing session for `agent_id`, then install
    /// the new one. The old session's close runs before the new one
    /// becomes visible to `Get`, so `Add` never leaks the prior session.
    pub async fn add(&self, agent_id: AgentId, transport: Arc<dyn Transport>) -> Arc<Session> {
        let prior = {
            let mut by_agent = self.by_agent.write().await;
            by_agent.remove(&agent_id)
        };
        if let Some(prior) = prior {
            self.by_session.write().await.remove(&prior.id);
            prior.close().await;
        }

        let session = Arc::new(Session::new(agent_id.clone(), transport));
        session.mark_active().await;

        {
            let mut by_agent = self.by_agent.write().await;
            let mut by_session = self.by_session.write().await;
            by_agent.insert(agent_id.clone(), session.clone());
            by_session.insert(session.id, agent_id.clone());
        }

        for hook in self.on_connect.read().await.iter() {
            hook(&agent_id);
        }
        info!(agent_id = %agent_id, session_id = %session.id, "session connected");
        session
    }

    /// Idempotent removal; fires `on_disconnect` at most once.
    pub async fn remove(&self, agent_id: &AgentId) {
        let removed = {
            let mut by_agent = self.by_agent.write().await;
            by_agent.remove(agent_id)
        };
        let Some(session) = removed else { return };
        self.by_session.write().await.remove(&session.id);
        session.close().await;
        for hook in self.on_disconnect.read().await.iter() {
            hook(agent_id);
        }
        debug!(agent_id = %agent_id, "session disconnected");
    }

    pub async fn get(&self, agent_id: &AgentId) -> Option<Arc<Session>> {
        self.by_agent.read().await.get(agent_id).cloned()
    }

    pub async fn get_by_session(&self, session_id: Uuid) -> Option<Arc<Session>> {
        let agent_id = self.by_session.read().await.get(&session_id).cloned()?;
        self.get(&agent_id).await
    }

    pub async fn get_all(&self) -> Vec<Arc<Session>> {
        self.by_agent.read().await.values().cloned().collect()
    }

    pub async fn connected_agent_ids(&self) -> Vec<AgentId> {
        self.by_agent.read().await.keys().cloned().collect()
    }

    /// Best-effort fan-out of a JSON-RPC notification to every live session.
    pub async fn broadcast(&self, method: &str, params: Value) {
        let frame = serde_json::json!({"jsonrpc": "2.0", "method": method, "params": params});
        let sessions: Vec<Arc<Session>> = self.by_agent.read().await.values().cloned().collect();
        for session in sessions {
            if let Err(e) = session.send(frame.clone()).await {
                warn!(agent_id = %session.agent_id, error = %e, "broadcast send failed");
            }
        }
    }

    /// Close every session and purge both maps. Idempotent.
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<Session>> = {
            let mut by_agent = self.by_agent.write().await;
            let mut by_session = self.by_session.write().await;
            let sessions = by_agent.values().cloned().collect();
            by_agent.clear();
            by_session.clear();
            sessions
        };
        for session in sessions {
            session.close().await;
        }
    }

    /// Background reaper: every 30s, remove sessions idle past 5 minutes
    /// or already closing/closed.
    pub async fn run_reaper(self: Arc<Self>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(REAPER_INTERVAL) => {}
                _ = shutdown.cancelled() => {
                    debug!("connection reaper shutting down");
                    return;
                }
            }

            let stale: Vec<AgentId> = {
                let mut stale = Vec::new();
                for (agent_id, session) in self.by_agent.read().await.iter() {
                    let lifecycle = session.lifecycle().await;
                    let idle = session.idle_for().await;
                    if matches!(lifecycle, SessionLifecycle::Closing | SessionLifecycle::Closed)
                        || idle > SESSION_IDLE_TIMEOUT
                    {
                        stale.push(agent_id.clone());
                    }
                }
                stale
            };

            for agent_id in stale {
                warn!(agent_id = %agent_id, "reaping stale session");
                self.remove(&agent_id).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
