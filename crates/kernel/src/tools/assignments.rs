// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assignment lifecycle tools: dispatch, accept, worker sub-records, and
//! submission for review. Every transition runs through
//! [`crate::assignment::Assignment::validate_transition`] first so an
//! illegal jump never reaches the store.

use std::sync::Arc;

use serde::Deserialize;

use crate::agent::AgentId;
use crate::assignment::{AssignmentKind, AssignmentStatus};
use crate::dispatcher::{ToolParam, ToolRegistryBuilder};
use crate::error::KernelError;
use crate::event::{Event, EventPriority, EventType};
use crate::state::Core;
use crate::store::WorkerStatus;
use crate::task::TaskId;

use super::args::decode;

async fn transition(core: &Core, assignment_id: i64, next: AssignmentStatus, feedback: Option<&str>) -> Result<(), KernelError> {
    let assignment = core
        .store
        .get_assignment(assignment_id)
        .await?
        .ok_or_else(|| KernelError::state_transition(format!("no such assignment {assignment_id}")))?;
    assignment.validate_transition(next)?;
    core.store.transition_assignment(assignment_id, next, None, feedback).await
}

#[derive(Debug, Deserialize)]
struct DispatchTaskArgs {
    task_id: String,
    assignee: String,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AcceptAssignmentArgs {
    assignment_id: i64,
}

#[derive(Debug, Deserialize)]
struct LogWorkerArgs {
    assignment_id: i64,
    kind: String,
    description: String,
    #[serde(default = "default_model")]
    model: String,
}

fn default_model() -> String {
    "unspecified".to_owned()
}

#[derive(Debug, Deserialize)]
struct CompleteWorkerArgs {
    worker_id: i64,
    success: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    tokens_used: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SubmitForReviewArgs {
    assignment_id: i64,
    #[serde(default)]
    branch_name: Option<String>,
}

fn parse_kind(raw: Option<&str>) -> AssignmentKind {
    match raw {
        Some("review") => AssignmentKind::Review,
        Some("rework") => AssignmentKind::Rework,
        _ => AssignmentKind::Implementation,
    }
}

pub fn register(mut builder: ToolRegistryBuilder, core: Arc<Core>) -> ToolRegistryBuilder {
    {
        let core = core.clone();
        builder = builder.register(
            "dispatch_task",
            "Dispatch a task to an agent, creating a new assignment for them.",
            vec![
                ToolParam { name: "task_id", ty: "string", required: true },
                ToolParam { name: "assignee", ty: "string", required: true },
                ToolParam { name: "kind", ty: "string", required: false },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: DispatchTaskArgs = decode(args)?;
                    let assignee = AgentId::new(parsed.assignee);
                    let kind = parse_kind(parsed.kind.as_deref());
                    let assignment =
                        core.store.create_assignment(&TaskId::new(parsed.task_id), &assignee, kind, None).await?;

                    core.events
                        .publish(Event::new(
                            EventType::AssignmentCreated,
                            agent_id,
                            Some(assignee),
                            EventPriority::Normal,
                            serde_json::json!({ "assignment_id": assignment.id }),
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
            "accept_assignment",
            "Accept a dispatched assignment, moving it into progress.",
            vec![ToolParam { name: "assignment_id", ty: "number", required: true }],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: AcceptAssignmentArgs = decode(args)?;
                    // Accepting and starting work are one agent-facing action:
                    // land on `in_progress` so `submit_for_review`'s only
                    // inbound edge, `(InProgress, Submitted)`, is reachable.
                    transition(&core, parsed.assignment_id, AssignmentStatus::Accepted, None).await?;
                    transition(&core, parsed.assignment_id, AssignmentStatus::InProgress, None).await?;

                    core.events
                        .publish(Event::new(
                            EventType::AssignmentAccepted,
                            agent_id,
                            None,
                            EventPriority::Normal,
                            serde_json::json!({ "assignment_id": parsed.assignment_id }),
                        ))
                        .await;

                    Ok(serde_json::json!({ "assignment_id": parsed.assignment_id, "status": "in_progress" }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "get_my_assignment",
            "Fetch the calling agent's current non-terminal assignment, if any.",
            vec![],
            move |agent_id, _args| {
                let core = core.clone();
                async move {
                    let assignment = core.store.get_active_assignment_for(&agent_id).await?;
                    serde_json::to_value(assignment).map_err(|e| KernelError::tool_error(e.to_string()))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "log_worker",
            "Record a worker sub-task (a child model call) under an assignment.",
            vec![
                ToolParam { name: "assignment_id", ty: "number", required: true },
                ToolParam { name: "kind", ty: "string", required: true },
                ToolParam { name: "description", ty: "string", required: true },
                ToolParam { name: "model", ty: "string", required: false },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: LogWorkerArgs = decode(args)?;
                    let id = core
                        .store
                        .log_worker(parsed.assignment_id, &agent_id, &parsed.kind, &parsed.description, &parsed.model)
                        .await?;
                    Ok(serde_json::json!({ "worker_id": id }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "complete_worker",
            "Mark a worker sub-task complete or failed.",
            vec![
                ToolParam { name: "worker_id", ty: "number", required: true },
                ToolParam { name: "success", ty: "boolean", required: true },
                ToolParam { name: "result", ty: "string", required: false },
                ToolParam { name: "tokens_used", ty: "number", required: false },
            ],
            move |_agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: CompleteWorkerArgs = decode(args)?;
                    let status = if parsed.success { WorkerStatus::Completed } else { WorkerStatus::Failed };
                    core.store
                        .complete_worker(parsed.worker_id, status, parsed.result.as_deref(), parsed.tokens_used.unwrap_or(0))
                        .await?;
                    Ok(serde_json::json!({ "worker_id": parsed.worker_id, "status": status }))
                }
            },
        );
    }

    builder = builder.register(
        "submit_for_review",
        "Submit an in-progress assignment for review.",
        vec![
            ToolParam { name: "assignment_id", ty: "number", required: true },
            ToolParam { name: "branch_name", ty: "string", required: false },
        ],
        move |agent_id, args| {
            let core = core.clone();
            async move {
                let parsed: SubmitForReviewArgs = decode(args)?;
                let assignment = core
                    .store
                    .get_assignment(parsed.assignment_id)
                    .await?
                    .ok_or_else(|| KernelError::state_transition(format!("no such assignment {}", parsed.assignment_id)))?;
                assignment.validate_transition(AssignmentStatus::Submitted)?;
                core.store
                    .transition_assignment(parsed.assignment_id, AssignmentStatus::Submitted, parsed.branch_name.as_deref(), None)
                    .await?;

                core.events
                    .publish(Event::new(
                        EventType::ReviewRequested,
                        agent_id,
                        None,
                        EventPriority::Normal,
                        serde_json::json!({ "assignment_id": parsed.assignment_id }),
                    ))
                    .await;

                Ok(serde_json::json!({ "assignment_id": parsed.assignment_id, "status": "submitted" }))
            }
        },
    );

    builder
}
