// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Free-form liveness/chatter tools: logging, progress notes, and the
//! captain-facing escalation calls (`request_human_input`,
//! `request_stop_approval`, `signal_captain`, `request_guidance`). Each of
//! these publishes a broadcast [`crate::event::Event`] rather than
//! targeting a specific captain id — the core has no notion of "the"
//! captain, only agents and roles.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::dispatcher::{ToolParam, ToolRegistryBuilder};
use crate::error::KernelError;
use crate::event::{Event, EventPriority, EventType};
use crate::state::Core;

use super::args::decode;

#[derive(Debug, Deserialize)]
struct LogActivityArgs {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ReportProgressArgs {
    message: String,
    #[serde(default)]
    assignment_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RequestHumanInputArgs {
    question: String,
}

#[derive(Debug, Deserialize)]
struct RequestStopApprovalArgs {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct SignalCaptainArgs {
    message: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RequestGuidanceArgs {
    question: String,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendToAgentArgs {
    target: String,
    #[serde(rename = "type", default)]
    event_type: Option<EventType>,
    payload: serde_json::Value,
    #[serde(default)]
    priority: Option<EventPriority>,
}

pub fn register(mut builder: ToolRegistryBuilder, core: Arc<Core>) -> ToolRegistryBuilder {
    builder = builder.register(
        "log_activity",
        "Record a free-form activity note in the server log.",
        vec![ToolParam { name: "message", ty: "string", required: true }],
        move |agent_id, args| async move {
            let parsed: LogActivityArgs = decode(args)?;
            info!(agent_id = %agent_id, message = %parsed.message, "agent activity");
            Ok(serde_json::json!({ "logged": true }))
        },
    );

    {
        let core = core.clone();
        builder = builder.register(
            "report_progress",
            "Report free-form progress on the caller's active assignment.",
            vec![
                ToolParam { name: "message", ty: "string", required: true },
                ToolParam { name: "assignment_id", ty: "number", required: false },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: ReportProgressArgs = decode(args)?;
                    info!(agent_id = %agent_id, assignment_id = ?parsed.assignment_id, message = %parsed.message, "progress report");
                    core.store.touch_last_seen(&agent_id).await?;
                    Ok(serde_json::json!({ "acknowledged": true }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "request_human_input",
            "Escalate a question to a human operator via the event bus.",
            vec![ToolParam { name: "question", ty: "string", required: true }],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: RequestHumanInputArgs = decode(args)?;
                    let event = Event::new(
                        EventType::HumanInputRequested,
                        agent_id,
                        None,
                        EventPriority::High,
                        serde_json::json!({ "question": parsed.question }),
                    );
                    let event = core.events.publish(event).await;
                    Ok(serde_json::json!({ "event_id": event.id }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "request_stop_approval",
            "Ask the captain for permission to stop working.",
            vec![ToolParam { name: "reason", ty: "string", required: true }],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: RequestStopApprovalArgs = decode(args)?;
                    let event = Event::new(
                        EventType::StopApprovalRequested,
                        agent_id,
                        None,
                        EventPriority::Normal,
                        serde_json::json!({ "reason": parsed.reason }),
                    );
                    let event = core.events.publish(event).await;
                    Ok(serde_json::json!({ "event_id": event.id }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "signal_captain",
            "Send a free-form message to the captain and any other subscribers.",
            vec![ToolParam { name: "message", ty: "object", required: true }],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: SignalCaptainArgs = decode(args)?;
                    let event =
                        Event::new(EventType::AgentMessage, agent_id, None, EventPriority::Normal, parsed.message);
                    let event = core.events.publish(event).await;
                    Ok(serde_json::json!({ "event_id": event.id }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "request_guidance",
            "Ask for guidance on an ambiguous situation.",
            vec![
                ToolParam { name: "question", ty: "string", required: true },
                ToolParam { name: "context", ty: "string", required: false },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: RequestGuidanceArgs = decode(args)?;
                    let event = Event::new(
                        EventType::GuidanceRequested,
                        agent_id,
                        None,
                        EventPriority::Normal,
                        serde_json::json!({ "question": parsed.question, "context": parsed.context }),
                    );
                    let event = core.events.publish(event).await;
                    Ok(serde_json::json!({ "event_id": event.id }))
                }
            },
        );
    }

    builder = builder.register(
        "send_to_agent",
        "Send a targeted event to a specific agent (or broadcast if target is omitted).",
        vec![
            ToolParam { name: "target", ty: "string", required: true },
            ToolParam { name: "type", ty: "string", required: false },
            ToolParam { name: "payload", ty: "object", required: true },
            ToolParam { name: "priority", ty: "string", required: false },
        ],
        move |agent_id, args| {
            let core = core.clone();
            async move {
                let parsed: SendToAgentArgs = decode(args)?;
                let event = Event::new(
                    parsed.event_type.unwrap_or(EventType::AgentMessage),
                    agent_id,
                    Some(crate::agent::AgentId::new(parsed.target)),
                    parsed.priority.unwrap_or_default(),
                    parsed.payload,
                );
                let event = core.events.publish(event).await;
                Ok(serde_json::json!({ "event_id": event.id, "delivered": event.delivered }))
            }
        },
    );

    builder
}
