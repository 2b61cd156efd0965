// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

struct RecordingTransport {
    sent: tokio::sync::Mutex<Vec<Value>>,
    closed: std::sync::atomic::AtomicBool,
    fail: bool,
}

impl RecordingTransport {
    fn new(fail: bool) -> Self {
        Self { sent: tokio::sync::Mutex::new(Vec::new()), closed: std::sync::atomic::AtomicBool::new(false), fail }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_frame(&self, frame: Value) -> Result<(), KernelError> {
        if self.fail {
            return Err(KernelError::transport_not_streaming());
        }
        self.sent.lock().await.push(frame);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn agent(s: &str) -> AgentId {
    AgentId::new(s)
}

#[tokio::test]
async fn add_fires_on_connect_once() {
    let manager = ConnectionManager::new();
    let count = Arc::new(AtomicUsize::new(0));
    let counted = count.clone();
    manager.on_connect(move |_| { counted.fetch_add(1, Ordering::SeqCst); }).await;

    manager.add(agent("team-coder001"), Arc::new(RecordingTransport::new(false))).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn add_replaces_prior_session_and_closes_it() {
    let manager = ConnectionManager::new();
    let first_transport = Arc::new(RecordingTransport::new(false));
    let first = manager.add(agent("team-coder001"), first_transport.clone()).await;

    let second_transport = Arc::new(RecordingTransport::new(false));
    manager.add(agent("team-coder001"), second_transport).await;

    assert_eq!(first.lifecycle().await, SessionLifecycle::Closed);
    assert!(first_transport.closed.load(Ordering::SeqCst));
    assert_eq!(manager.get_all().await.len(), 1);
}

#[tokio::test]
async fn remove_is_idempotent_and_fires_disconnect_once() {
    let manager = ConnectionManager::new();
    let count = Arc::new(AtomicUsize::new(0));
    let counted = count.clone();
    manager.on_disconnect(move |_| { counted.fetch_add(1, Ordering::SeqCst); }).await;

    manager.add(agent("team-coder001"), Arc::new(RecordingTransport::new(false))).await;
    manager.remove(&agent("team-coder001")).await;
    manager.remove(&agent("team-coder001")).await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(manager.get(&agent("team-coder001")).await.is_none());
}

#[tokio::test]
async fn get_by_session_resolves_to_same_session() {
    let manager = ConnectionManager::new();
    let session = manager.add(agent("team-coder001"), Arc::new(RecordingTransport::new(false))).await;
    let found = manager.get_by_session(session.id).await.expect("session found");
    assert_eq!(found.agent_id, agent("team-coder001"));
}

#[tokio::test]
async fn send_failure_closes_session() {
    let manager = ConnectionManager::new();
    let session = manager.add(agent("team-coder001"), Arc::new(RecordingTransport::new(true))).await;
    assert!(session.send(serde_json::json!({})).await.is_err());
    assert_eq!(session.lifecycle().await, SessionLifecycle::Closed);
}

#[tokio::test]
async fn shutdown_closes_everything_and_is_idempotent() {
    let manager = Arc::new(ConnectionManager::new());
    manager.add(agent("team-coder001"), Arc::new(RecordingTransport::new(false))).await;
    manager.add(agent("team-reviewer001"), Arc::new(RecordingTransport::new(false))).await;

    manager.shutdown().await;
    manager.shutdown().await;

    assert!(manager.get_all().await.is_empty());
    assert!(manager.connected_agent_ids().await.is_empty());
}
