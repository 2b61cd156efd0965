// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use crate::agent::{AgentId, AgentStatus};
use crate::connection::Transport;
use crate::error::KernelError;
use crate::test_support::test_config;

use super::build_core;

struct NullTransport;

#[async_trait::async_trait]
impl Transport for NullTransport {
    async fn send_frame(&self, _frame: serde_json::Value) -> Result<(), KernelError> {
        Ok(())
    }

    async fn close(&self) {}
}

async fn settle() {
    // on_connect/on_disconnect hooks run on a detached task; give them a
    // turn before asserting on their effect.
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn build_core_wires_presence_to_connection_manager() -> anyhow::Result<()> {
    let core = build_core(test_config()).await?;
    let agent_id = AgentId::new("team-coder001");
    core.presence.register_pending(agent_id.clone()).await;

    let transport: Arc<dyn Transport> = Arc::new(NullTransport);
    core.connections.add(agent_id.clone(), transport).await;
    settle().await;
    assert_eq!(core.presence.status(&agent_id).await, Some(AgentStatus::Connected));

    core.connections.remove(&agent_id).await;
    settle().await;
    assert_eq!(core.presence.status(&agent_id).await, Some(AgentStatus::Stopped));
    Ok(())
}

#[tokio::test]
async fn build_core_accepts_in_memory_db_path() {
    let core = build_core(test_config()).await;
    assert!(core.is_ok());
}
