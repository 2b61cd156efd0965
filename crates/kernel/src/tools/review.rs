// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Review Board tools: board creation, defect/vote submission, and
//! finalization. `finalize_board` auto-creates a `rework` assignment on a
//! `rejected` verdict — the Open Question default this workspace settled
//! on (see DESIGN.md) — and leaves `changes_requested` for the original
//! assignee to simply re-enter `in_progress` on their existing assignment.

use std::sync::Arc;

use serde::Deserialize;

use crate::assignment::{AssignmentKind, AssignmentStatus, ReviewVerdict};
use crate::dispatcher::{ToolParam, ToolRegistryBuilder};
use crate::error::KernelError;
use crate::event::{Event, EventPriority, EventType};
use crate::review::{Defect, DefectCategory, DefectSeverity, ReviewerVote, RiskLevel};
use crate::state::Core;

use super::args::decode;

#[derive(Debug, Deserialize)]
struct CreateReviewBoardArgs {
    assignment_id: i64,
    reviewer_count: u8,
    #[serde(default)]
    complexity_score: Option<u8>,
    #[serde(default)]
    risk_level: Option<RiskLevel>,
}

#[derive(Debug, Deserialize)]
struct SubmitDefectArgs {
    board_id: i64,
    category: DefectCategory,
    severity: DefectSeverity,
    title: String,
    description: String,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    line_range: Option<(u32, u32)>,
    #[serde(default)]
    suggested_fix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordReviewerVoteArgs {
    board_id: i64,
    approved: bool,
    #[serde(default = "default_confidence")]
    confidence: u8,
    #[serde(default)]
    defects_found: u32,
    #[serde(default)]
    tokens_used: u64,
}

fn default_confidence() -> u8 {
    100
}

#[derive(Debug, Deserialize)]
struct FinalizeBoardArgs {
    board_id: i64,
    #[serde(default)]
    forced: bool,
}

#[derive(Debug, Deserialize)]
struct SubmitReviewResultArgs {
    board_id: i64,
    assignment_id: i64,
    verdict: ReviewVerdict,
    #[serde(default)]
    feedback: Option<String>,
}

pub fn register(mut builder: ToolRegistryBuilder, core: Arc<Core>) -> ToolRegistryBuilder {
    {
        let core = core.clone();
        builder = builder.register(
            "create_review_board",
            "Open a review board for a submitted assignment. Idempotent: returns the existing board if one already exists.",
            vec![
                ToolParam { name: "assignment_id", ty: "number", required: true },
                ToolParam { name: "reviewer_count", ty: "number", required: true },
                ToolParam { name: "complexity_score", ty: "number", required: false },
                ToolParam { name: "risk_level", ty: "string", required: false },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: CreateReviewBoardArgs = decode(args)?;
                    let board_id = core
                        .store
                        .create_review_board(
                            parsed.assignment_id,
                            parsed.reviewer_count,
                            parsed.complexity_score.unwrap_or(0),
                            parsed.risk_level.unwrap_or(RiskLevel::Medium),
                        )
                        .await?;
                    core.store.transition_assignment(parsed.assignment_id, AssignmentStatus::UnderReview, None, None).await.ok();

                    core.events
                        .publish(Event::new(
                            EventType::ReviewRequested,
                            agent_id,
                            None,
                            EventPriority::Normal,
                            serde_json::json!({ "board_id": board_id, "assignment_id": parsed.assignment_id }),
                        ))
                        .await;

                    Ok(serde_json::json!({ "board_id": board_id }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "submit_defect",
            "File a defect against a review board.",
            vec![
                ToolParam { name: "board_id", ty: "number", required: true },
                ToolParam { name: "category", ty: "string", required: true },
                ToolParam { name: "severity", ty: "string", required: true },
                ToolParam { name: "title", ty: "string", required: true },
                ToolParam { name: "description", ty: "string", required: true },
                ToolParam { name: "file_path", ty: "string", required: false },
                ToolParam { name: "suggested_fix", ty: "string", required: false },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: SubmitDefectArgs = decode(args)?;
                    let defect = Defect {
                        id: 0,
                        board_id: parsed.board_id,
                        reporter: agent_id,
                        category: parsed.category,
                        severity: parsed.severity,
                        title: parsed.title,
                        description: parsed.description,
                        file_path: parsed.file_path,
                        line_range: parsed.line_range,
                        suggested_fix: parsed.suggested_fix,
                    };
                    let id = core.store.submit_defect(&defect).await?;
                    Ok(serde_json::json!({ "defect_id": id }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "record_reviewer_vote",
            "Cast a reviewer's approve/reject vote on a review board. One vote per reviewer.",
            vec![
                ToolParam { name: "board_id", ty: "number", required: true },
                ToolParam { name: "approved", ty: "boolean", required: true },
                ToolParam { name: "confidence", ty: "number", required: false },
                ToolParam { name: "defects_found", ty: "number", required: false },
                ToolParam { name: "tokens_used", ty: "number", required: false },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: RecordReviewerVoteArgs = decode(args)?;
                    let vote = ReviewerVote {
                        board_id: parsed.board_id,
                        reviewer: agent_id,
                        approved: parsed.approved,
                        confidence: parsed.confidence,
                        defects_found: parsed.defects_found,
                        tokens_used: parsed.tokens_used,
                    };
                    core.store.record_reviewer_vote(&vote).await?;
                    Ok(serde_json::json!({ "recorded": true }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "finalize_board",
            "Finalize a review board, deriving and persisting its verdict. On rejection, auto-creates a rework assignment.",
            vec![
                ToolParam { name: "board_id", ty: "number", required: true },
                ToolParam { name: "forced", ty: "boolean", required: false },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: FinalizeBoardArgs = decode(args)?;
                    let verdict = core.store.finalize_board(parsed.board_id, parsed.forced).await?;

                    let board = core
                        .store
                        .get_review_board(parsed.board_id)
                        .await?
                        .ok_or_else(|| KernelError::state_transition(format!("no such board {}", parsed.board_id)))?;
                    let assignment = core
                        .store
                        .get_assignment(board.assignment_id)
                        .await?
                        .ok_or_else(|| KernelError::state_transition(format!("no such assignment {}", board.assignment_id)))?;

                    let mut rework_assignment_id = None;
                    if verdict == ReviewVerdict::Rejected {
                        let rework = core
                            .store
                            .create_assignment(&assignment.task_id, &assignment.assignee, AssignmentKind::Rework, None)
                            .await?;
                        rework_assignment_id = Some(rework.id);
                    }

                    core.events
                        .publish(Event::new(
                            EventType::BoardFinalized,
                            agent_id,
                            Some(assignment.assignee.clone()),
                            EventPriority::High,
                            serde_json::json!({
                                "board_id": parsed.board_id,
                                "assignment_id": board.assignment_id,
                                "verdict": verdict,
                                "rework_assignment_id": rework_assignment_id,
                            }),
                        ))
                        .await;

                    Ok(serde_json::json!({
                        "board_id": parsed.board_id,
                        "verdict": verdict,
                        "rework_assignment_id": rework_assignment_id,
                    }))
                }
            },
        );
    }

    builder = builder.register(
        "submit_review_result",
        "Record a single reviewer's overall verdict on an assignment outside the multi-reviewer board flow (single-reviewer shortcut).",
        vec![
            ToolParam { name: "board_id", ty: "number", required: true },
            ToolParam { name: "assignment_id", ty: "number", required: true },
            ToolParam { name: "verdict", ty: "string", required: true },
            ToolParam { name: "feedback", ty: "string", required: false },
        ],
        move |agent_id, args| {
            let core = core.clone();
            async move {
                let parsed: SubmitReviewResultArgs = decode(args)?;
                let assignment = core
                    .store
                    .get_assignment(parsed.assignment_id)
                    .await?
                    .ok_or_else(|| KernelError::state_transition(format!("no such assignment {}", parsed.assignment_id)))?;

                let next = match parsed.verdict {
                    ReviewVerdict::Approved => AssignmentStatus::Approved,
                    ReviewVerdict::Rejected => AssignmentStatus::Rejected,
                    ReviewVerdict::ChangesRequested => AssignmentStatus::ChangesRequested,
                };
                assignment.validate_transition(next)?;
                core.store.transition_assignment(parsed.assignment_id, next, None, parsed.feedback.as_deref()).await?;

                // `approved` is not terminal (spec §4.6: approved -> completed);
                // finish the hop here so this shortcut doesn't leave the
                // assignee permanently holding a non-terminal assignment.
                if next == AssignmentStatus::Approved {
                    let approved = core
                        .store
                        .get_assignment(parsed.assignment_id)
                        .await?
                        .ok_or_else(|| KernelError::state_transition(format!("no such assignment {}", parsed.assignment_id)))?;
                    approved.validate_transition(AssignmentStatus::Completed)?;
                    core.store.transition_assignment(parsed.assignment_id, AssignmentStatus::Completed, None, None).await?;
                }

                let mut rework_assignment_id = None;
                if parsed.verdict == ReviewVerdict::Rejected {
                    let rework = core
                        .store
                        .create_assignment(&assignment.task_id, &assignment.assignee, AssignmentKind::Rework, None)
                        .await?;
                    rework_assignment_id = Some(rework.id);
                }

                core.events
                    .publish(Event::new(
                        EventType::ReviewResult,
                        agent_id,
                        Some(assignment.assignee),
                        EventPriority::Normal,
                        serde_json::json!({
                            "board_id": parsed.board_id,
                            "assignment_id": parsed.assignment_id,
                            "verdict": parsed.verdict,
                            "rework_assignment_id": rework_assignment_id,
                        }),
                    ))
                    .await;

                Ok(serde_json::json!({ "assignment_id": parsed.assignment_id, "rework_assignment_id": rework_assignment_id }))
            }
        },
    );

    builder
}
