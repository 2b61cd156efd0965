// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-facing task discovery and claim tools. `claim_task` is the one
//! call site that turns a broker-fetched [`crate::task::Task`] into a
//! persisted [`crate::assignment::Assignment`]; the broker itself never
//! creates assignments.

use std::sync::Arc;

use serde::Deserialize;

use crate::assignment::AssignmentKind;
use crate::dispatcher::{ToolParam, ToolRegistryBuilder};
use crate::error::KernelError;
use crate::event::{Event, EventPriority, EventType};
use crate::state::Core;
use crate::task::{TaskId, TaskStatus};

use super::args::decode;

#[derive(Debug, Deserialize)]
struct ClaimTaskArgs {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskProgressArgs {
    task_id: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CompleteTaskArgs {
    task_id: String,
    result: String,
}

#[derive(Debug, Deserialize)]
struct SubmitReconReportArgs {
    task_id: String,
    findings: String,
    #[serde(default)]
    risk_level: Option<String>,
}

pub fn register(mut builder: ToolRegistryBuilder, core: Arc<Core>) -> ToolRegistryBuilder {
    {
        let core = core.clone();
        builder = builder.register(
            "get_my_tasks",
            "List pending tasks from every configured task source, priority-first.",
            vec![],
            move |_agent_id, _args| {
                let core = core.clone();
                async move {
                    let tasks = core.broker.fetch_pending().await;
                    serde_json::to_value(tasks).map_err(|e| KernelError::tool_error(e.to_string()))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "claim_task",
            "Claim a pending task: creates an implementation assignment for the calling agent.",
            vec![ToolParam { name: "task_id", ty: "string", required: true }],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: ClaimTaskArgs = decode(args)?;
                    let task_id = TaskId::new(parsed.task_id);

                    // The broker only knows which source owns a task id
                    // after a `fetch_pending` round has recorded it; ensure
                    // that has happened at least once before routing the
                    // claim back to its origin.
                    core.broker.fetch_pending().await;
                    core.broker.claim(&task_id, &agent_id).await?;
                    let assignment = core.store.create_assignment(&task_id, &agent_id, AssignmentKind::Implementation, None).await?;
                    core.store.set_task_status(&task_id, TaskStatus::Assigned).await?;

                    core.events
                        .publish(Event::new(
                            EventType::TaskClaimed,
                            agent_id.clone(),
                            None,
                            EventPriority::Normal,
                            serde_json::json!({ "task_id": task_id.as_str(), "assignment_id": assignment.id }),
                        ))
                        .await;

                    serde_json::to_value(assignment).map_err(|e| KernelError::tool_error(e.to_string()))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "update_task_progress",
            "Report free-form progress on a claimed task.",
            vec![
                ToolParam { name: "task_id", ty: "string", required: true },
                ToolParam { name: "message", ty: "string", required: true },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: UpdateTaskProgressArgs = decode(args)?;
                    core.store.set_task_status(&TaskId::new(parsed.task_id), TaskStatus::InProgress).await?;
                    core.store.touch_last_seen(&agent_id).await?;
                    Ok(serde_json::json!({ "acknowledged": true, "message": parsed.message }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "complete_task",
            "Mark a task complete at its origin source and in the store.",
            vec![
                ToolParam { name: "task_id", ty: "string", required: true },
                ToolParam { name: "result", ty: "string", required: true },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: CompleteTaskArgs = decode(args)?;
                    let task_id = TaskId::new(parsed.task_id);
                    core.broker.complete(&task_id, &parsed.result).await?;
                    core.store.set_task_status(&task_id, TaskStatus::Completed).await?;

                    core.events
                        .publish(Event::new(
                            EventType::TaskCompleted,
                            agent_id,
                            None,
                            EventPriority::Normal,
                            serde_json::json!({ "task_id": task_id.as_str() }),
                        ))
                        .await;

                    Ok(serde_json::json!({ "completed": true }))
                }
            },
        );
    }

    builder = builder.register(
        "submit_recon_report",
        "Submit a reconnaissance finding against a task, outside the normal review pipeline.",
        vec![
            ToolParam { name: "task_id", ty: "string", required: true },
            ToolParam { name: "findings", ty: "string", required: true },
            ToolParam { name: "risk_level", ty: "string", required: false },
        ],
        move |agent_id, args| {
            let core = core.clone();
            async move {
                let parsed: SubmitReconReportArgs = decode(args)?;
                let event = Event::new(
                    EventType::AgentMessage,
                    agent_id,
                    None,
                    EventPriority::Normal,
                    serde_json::json!({
                        "kind": "recon_report",
                        "task_id": parsed.task_id,
                        "findings": parsed.findings,
                        "risk_level": parsed.risk_level,
                    }),
                );
                let event = core.events.publish(event).await;
                Ok(serde_json::json!({ "event_id": event.id }))
            }
        },
    );

    builder
}
