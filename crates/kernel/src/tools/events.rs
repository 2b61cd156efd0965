// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wait_for_events`: the agent-facing long-poll over the Event Bus (spec
//! §4.4). Checks the pending store first so a reconnecting agent never
//! waits on events that already arrived while it was offline; only
//! subscribes and parks when the backlog is empty.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::dispatcher::{ToolParam, ToolRegistryBuilder};
use crate::error::KernelError;
use crate::event::EventType;
use crate::state::Core;

use super::args::decode;

const MIN_TIMEOUT_SECONDS: u64 = 1;
const MAX_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

#[derive(Debug, Deserialize)]
struct WaitForEventsArgs {
    #[serde(default)]
    timeout_seconds: Option<u64>,
    #[serde(default)]
    event_types: Vec<EventType>,
}

pub fn register(builder: ToolRegistryBuilder, core: Arc<Core>) -> ToolRegistryBuilder {
    builder.register(
        "wait_for_events",
        "Long-poll for the next event targeted at this agent (or broadcast), checking the replay backlog first.",
        vec![
            ToolParam { name: "timeout_seconds", ty: "number", required: false },
            ToolParam { name: "event_types", ty: "array", required: false },
        ],
        move |agent_id, args| {
            let core = core.clone();
            async move {
                let parsed: WaitForEventsArgs = decode(args)?;
                let timeout =
                    Duration::from_secs(parsed.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS).clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS));

                let pending = core.events.get_pending_events(&agent_id, &parsed.event_types).await;
                if let Some(event) = pending.into_iter().next() {
                    core.events.mark_delivered(&agent_id, event.id).await;
                    let remaining = core.events.pending_count(&agent_id).await;
                    return Ok(serde_json::json!({ "status": "event_received", "event": event, "pending_count": remaining }));
                }

                let mut rx = core.events.subscribe(agent_id.clone(), parsed.event_types).await;
                let result = tokio::time::timeout(timeout, rx.recv()).await;
                core.events.unsubscribe(&agent_id).await;

                match result {
                    Ok(Some(event)) => {
                        let remaining = core.events.pending_count(&agent_id).await;
                        Ok(serde_json::json!({ "status": "event_received", "event": event, "pending_count": remaining }))
                    }
                    Ok(None) => Ok(serde_json::json!({ "status": "timeout" })),
                    Err(_elapsed) => Ok(serde_json::json!({ "status": "timeout" })),
                }
            }
        },
    )
}
