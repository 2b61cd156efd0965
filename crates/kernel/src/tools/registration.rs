// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde::Deserialize;

use crate::agent::AgentStatus;
use crate::dispatcher::{ToolParam, ToolRegistryBuilder};
use crate::error::KernelError;
use crate::state::Core;

use super::args::decode;

#[derive(Debug, Deserialize)]
struct RegisterAgentArgs {
    /// Accepted for forward compatibility; theme assignment happens at
    /// spawn time. A caller-supplied `agent_id` in this payload, if any,
    /// is ignored — identity comes from the transport.
    #[serde(default)]
    #[allow(dead_code)]
    theme: Option<String>,
}

pub fn register(builder: ToolRegistryBuilder, core: Arc<Core>) -> ToolRegistryBuilder {
    builder.register(
        "register_agent",
        "Promote this agent's presence from pending to connected. Called once by an agent right after it boots.",
        vec![ToolParam { name: "theme", ty: "string", required: false }],
        move |agent_id, args| {
            let core = core.clone();
            async move {
                let _parsed: RegisterAgentArgs = decode(args)?;
                core.presence.mark_connected(&agent_id).await?;
                core.store.update_status(&agent_id, AgentStatus::Connected).await?;
                let agent = core
                    .store
                    .get_agent(&agent_id)
                    .await?
                    .ok_or_else(|| KernelError::tool_error(format!("unknown agent {agent_id}")))?;
                serde_json::to_value(agent).map_err(|e| KernelError::tool_error(e.to_string()))
            }
        },
    )
}
