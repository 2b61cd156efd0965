// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row <-> domain-type conversions. Isolated in its own file so the query
//! bodies in `mod.rs` stay readable; every enum here round-trips through a
//! short lowercase/SCREAMING_SNAKE string rather than an integer, so the
//! database file stays legible with a plain `sqlite3` shell.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::agent::{Agent, AgentId, AgentRole, AgentStatus};
use crate::assignment::{Assignment, AssignmentKind, AssignmentStatus, ReviewVerdict};
use crate::error::KernelError;
use crate::review::{BoardStatus, Defect, DefectCategory, DefectSeverity, ReviewBoard, ReviewerVote, RiskLevel};
use crate::task::{Task, TaskId, TaskStatus};

use super::{parse_agent_role, WorkerStatus};

fn parse_dt(raw: &str) -> Result<DateTime<Utc>, KernelError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).map_err(|e| KernelError::store(format!("bad timestamp {raw:?}: {e}")))
}

pub(super) fn role_str(role: AgentRole) -> &'static str {
    role.tag()
}

pub(super) fn agent_status_str(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Pending => "pending",
        AgentStatus::Connected => "connected",
        AgentStatus::Stopped => "stopped",
    }
}

fn parse_agent_status(s: &str) -> Result<AgentStatus, KernelError> {
    match s {
        "pending" => Ok(AgentStatus::Pending),
        "connected" => Ok(AgentStatus::Connected),
        "stopped" => Ok(AgentStatus::Stopped),
        other => Err(KernelError::store(format!("unknown agent status {other:?}"))),
    }
}

pub(super) fn task_status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Assigned => "assigned",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Blocked => "blocked",
        TaskStatus::Completed => "completed",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn parse_task_status(s: &str) -> Result<TaskStatus, KernelError> {
    match s {
        "pending" => Ok(TaskStatus::Pending),
        "assigned" => Ok(TaskStatus::Assigned),
        "in_progress" => Ok(TaskStatus::InProgress),
        "blocked" => Ok(TaskStatus::Blocked),
        "completed" => Ok(TaskStatus::Completed),
        "cancelled" => Ok(TaskStatus::Cancelled),
        other => Err(KernelError::store(format!("unknown task status {other:?}"))),
    }
}

pub(super) fn assignment_kind_str(kind: AssignmentKind) -> &'static str {
    match kind {
        AssignmentKind::Implementation => "implementation",
        AssignmentKind::Review => "review",
        AssignmentKind::Rework => "rework",
    }
}

fn parse_assignment_kind(s: &str) -> Result<AssignmentKind, KernelError> {
    match s {
        "implementation" => Ok(AssignmentKind::Implementation),
        "review" => Ok(AssignmentKind::Review),
        "rework" => Ok(AssignmentKind::Rework),
        other => Err(KernelError::store(format!("unknown assignment kind {other:?}"))),
    }
}

pub(super) fn assignment_status_str(status: AssignmentStatus) -> &'static str {
    use AssignmentStatus::*;
    match status {
        Dispatched => "dispatched",
        Accepted => "accepted",
        InProgress => "in_progress",
        Submitted => "submitted",
        UnderReview => "under_review",
        Blocked => "blocked",
        Approved => "approved",
        Rejected => "rejected",
        ChangesRequested => "changes_requested",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

fn parse_assignment_status(s: &str) -> Result<AssignmentStatus, KernelError> {
    use AssignmentStatus::*;
    Ok(match s {
        "dispatched" => Dispatched,
        "accepted" => Accepted,
        "in_progress" => InProgress,
        "submitted" => Submitted,
        "under_review" => UnderReview,
        "blocked" => Blocked,
        "approved" => Approved,
        "rejected" => Rejected,
        "changes_requested" => ChangesRequested,
        "completed" => Completed,
        "cancelled" => Cancelled,
        other => return Err(KernelError::store(format!("unknown assignment status {other:?}"))),
    })
}

pub(super) fn verdict_str(verdict: ReviewVerdict) -> &'static str {
    match verdict {
        ReviewVerdict::Approved => "approved",
        ReviewVerdict::Rejected => "rejected",
        ReviewVerdict::ChangesRequested => "changes_requested",
    }
}

pub(super) fn parse_verdict(s: &str) -> Result<ReviewVerdict, KernelError> {
    match s {
        "approved" => Ok(ReviewVerdict::Approved),
        "rejected" => Ok(ReviewVerdict::Rejected),
        "changes_requested" => Ok(ReviewVerdict::ChangesRequested),
        other => Err(KernelError::store(format!("unknown verdict {other:?}"))),
    }
}

pub(super) fn risk_level_str(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "low",
        RiskLevel::Medium => "medium",
        RiskLevel::High => "high",
        RiskLevel::Critical => "critical",
    }
}

fn parse_risk_level(s: &str) -> Result<RiskLevel, KernelError> {
    match s {
        "low" => Ok(RiskLevel::Low),
        "medium" => Ok(RiskLevel::Medium),
        "high" => Ok(RiskLevel::High),
        "critical" => Ok(RiskLevel::Critical),
        other => Err(KernelError::store(format!("unknown risk level {other:?}"))),
    }
}

fn parse_board_status(s: &str) -> Result<BoardStatus, KernelError> {
    match s {
        "open" => Ok(BoardStatus::Open),
        "finalized" => Ok(BoardStatus::Finalized),
        other => Err(KernelError::store(format!("unknown board status {other:?}"))),
    }
}

pub(super) fn defect_category_str(category: DefectCategory) -> &'static str {
    match category {
        DefectCategory::Logic => "LOGIC",
        DefectCategory::Data => "DATA",
        DefectCategory::Interface => "INTERFACE",
        DefectCategory::Docs => "DOCS",
        DefectCategory::Syntax => "SYNTAX",
        DefectCategory::Standards => "STANDARDS",
        DefectCategory::Security => "SECURITY",
        DefectCategory::Performance => "PERFORMANCE",
        DefectCategory::Testing => "TESTING",
        DefectCategory::Architecture => "ARCHITECTURE",
        DefectCategory::Style => "STYLE",
    }
}

fn parse_defect_category(s: &str) -> Result<DefectCategory, KernelError> {
    use DefectCategory::*;
    Ok(match s {
        "LOGIC" => Logic,
        "DATA" => Data,
        "INTERFACE" => Interface,
        "DOCS" => Docs,
        "SYNTAX" => Syntax,
        "STANDARDS" => Standards,
        "SECURITY" => Security,
        "PERFORMANCE" => Performance,
        "TESTING" => Testing,
        "ARCHITECTURE" => Architecture,
        "STYLE" => Style,
        other => return Err(KernelError::store(format!("unknown defect category {other:?}"))),
    })
}

pub(super) fn defect_severity_str(severity: DefectSeverity) -> &'static str {
    match severity {
        DefectSeverity::Info => "info",
        DefectSeverity::Low => "low",
        DefectSeverity::Medium => "medium",
        DefectSeverity::High => "high",
        DefectSeverity::Critical => "critical",
    }
}

fn parse_defect_severity(s: &str) -> Result<DefectSeverity, KernelError> {
    match s {
        "info" => Ok(DefectSeverity::Info),
        "low" => Ok(DefectSeverity::Low),
        "medium" => Ok(DefectSeverity::Medium),
        "high" => Ok(DefectSeverity::High),
        "critical" => Ok(DefectSeverity::Critical),
        other => Err(KernelError::store(format!("unknown defect severity {other:?}"))),
    }
}

pub(super) fn worker_status_str(status: WorkerStatus) -> &'static str {
    match status {
        WorkerStatus::Open => "open",
        WorkerStatus::Completed => "completed",
        WorkerStatus::Failed => "failed",
    }
}

pub(super) fn agent_from_row(row: SqliteRow) -> Result<Agent, KernelError> {
    Ok(Agent {
        agent_id: AgentId::new(row.try_get::<String, _>("agent_id")?),
        role: parse_agent_role(&row.try_get::<String, _>("role")?)?,
        model: row.try_get("model")?,
        pane_id: row.try_get("pane_id")?,
        pid: row.try_get::<Option<i64>, _>("pid")?.map(|v| v as u32),
        theme: row.try_get("theme")?,
        project_path: row.try_get("project_path")?,
        status: parse_agent_status(&row.try_get::<String, _>("status")?)?,
        current_assignment_id: row.try_get("current_assignment_id")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
        last_seen_at: parse_dt(&row.try_get::<String, _>("last_seen_at")?)?,
        shutdown_reason: row.try_get("shutdown_reason")?,
    })
}

pub(super) fn task_from_row(row: SqliteRow) -> Result<Task, KernelError> {
    let requirements: String = row.try_get("requirements")?;
    Ok(Task {
        task_id: TaskId::new(row.try_get::<String, _>("task_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        priority: row.try_get::<i64, _>("priority")? as u32,
        status: parse_task_status(&row.try_get::<String, _>("status")?)?,
        origin_source: row.try_get("origin_source")?,
        repo_reference: row.try_get("repo_reference")?,
        requirements: serde_json::from_str(&requirements).unwrap_or_default(),
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
    })
}

pub(super) fn assignment_from_row(row: SqliteRow) -> Result<Assignment, KernelError> {
    let submitted_at: Option<String> = row.try_get("submitted_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;
    Ok(Assignment {
        id: row.try_get("id")?,
        task_id: TaskId::new(row.try_get::<String, _>("task_id")?),
        assignee: AgentId::new(row.try_get::<String, _>("assignee")?),
        kind: parse_assignment_kind(&row.try_get::<String, _>("kind")?)?,
        branch_name: row.try_get("branch_name")?,
        status: parse_assignment_status(&row.try_get::<String, _>("status")?)?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
        submitted_at: submitted_at.map(|s| parse_dt(&s)).transpose()?,
        completed_at: completed_at.map(|s| parse_dt(&s)).transpose()?,
        feedback: row.try_get("feedback")?,
    })
}

pub(super) fn board_from_row(row: SqliteRow) -> Result<ReviewBoard, KernelError> {
    let verdict: Option<String> = row.try_get("verdict")?;
    Ok(ReviewBoard {
        id: row.try_get("id")?,
        assignment_id: row.try_get("assignment_id")?,
        reviewer_count: row.try_get::<i64, _>("reviewer_count")? as u8,
        complexity_score: row.try_get::<i64, _>("complexity_score")? as u8,
        risk_level: parse_risk_level(&row.try_get::<String, _>("risk_level")?)?,
        status: parse_board_status(&row.try_get::<String, _>("status")?)?,
        verdict: verdict.map(|v| parse_verdict(&v)).transpose()?,
        votes: Vec::new(),
        defects: Vec::new(),
    })
}

pub(super) fn vote_from_row(row: SqliteRow) -> Result<ReviewerVote, KernelError> {
    Ok(ReviewerVote {
        board_id: row.try_get("board_id")?,
        reviewer: AgentId::new(row.try_get::<String, _>("reviewer_id")?),
        approved: row.try_get("approved")?,
        confidence: row.try_get::<i64, _>("confidence")? as u8,
        defects_found: row.try_get::<i64, _>("defects_found")? as u32,
        tokens_used: row.try_get::<i64, _>("tokens_used")? as u64,
    })
}

pub(super) fn defect_from_row(row: SqliteRow) -> Result<Defect, KernelError> {
    let line_start: Option<i64> = row.try_get("line_start")?;
    let line_end: Option<i64> = row.try_get("line_end")?;
    Ok(Defect {
        id: row.try_get("id")?,
        board_id: row.try_get("board_id")?,
        reporter: AgentId::new(row.try_get::<String, _>("reporter")?),
        category: parse_defect_category(&row.try_get::<String, _>("category")?)?,
        severity: parse_defect_severity(&row.try_get::<String, _>("severity")?)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        file_path: row.try_get("file_path")?,
        line_range: line_start.zip(line_end).map(|(s, e)| (s as u32, e as u32)),
        suggested_fix: row.try_get("suggested_fix")?,
    })
}

/// One row of the leaderboard view tool handlers expose read-only.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LeaderboardEntry {
    pub agent_id: AgentId,
    pub defects_reported: u32,
    pub reviews_completed: u32,
    pub average_reviewer_agreement: f64,
}

pub(super) fn leaderboard_from_row(row: SqliteRow) -> Result<LeaderboardEntry, KernelError> {
    let sum: f64 = row.try_get("reviewer_agreement_sum")?;
    let count: i64 = row.try_get("reviewer_agreement_count")?;
    Ok(LeaderboardEntry {
        agent_id: AgentId::new(row.try_get::<String, _>("agent_id")?),
        defects_reported: row.try_get::<i64, _>("defects_reported")? as u32,
        reviews_completed: row.try_get::<i64, _>("reviews_completed")? as u32,
        average_reviewer_agreement: if count > 0 { sum / count as f64 } else { 0.0 },
    })
}
