// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactional persistence for agents, tasks, assignments, review boards,
//! and the leaderboard — the single embedded relational store the core
//! treats as an external collaborator, with its in-core contract
//! implemented here directly (schema/migrations beyond idempotent
//! creation are out of scope).
//!
//! SQLite via `sqlx`, queried with the runtime-checked `query`/`query_as`
//! calls rather than the `query!` compile-time macros, so opening this
//! crate never requires a live `DATABASE_URL` at build time.

mod rows;
mod schema;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::agent::{Agent, AgentId, AgentRole, AgentStatus};
use crate::assignment::{Assignment, AssignmentKind, AssignmentStatus, ReviewVerdict};
use crate::error::KernelError;
use crate::review::{BoardStatus, Defect, DefectCategory, DefectSeverity, ReviewBoard, ReviewerVote, RiskLevel};
use crate::task::{Task, TaskId, TaskStatus};

pub use rows::LeaderboardEntry;

/// A worker record: a sub-task an agent spawned (a child model call).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WorkerRecord {
    pub id: i64,
    pub parent_assignment_id: i64,
    pub creator: AgentId,
    pub kind: String,
    pub description: String,
    pub status: WorkerStatus,
    pub result: Option<String>,
    pub tokens_used: u64,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Open,
    Completed,
    Failed,
}

/// Persistence façade. Holds the pool and nothing else — no in-memory
/// caching, so every call site sees the latest committed state.
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if absent) the SQLite file at `path` and run the
    /// idempotent schema creation pass.
    pub async fn open(path: &str) -> Result<Self, KernelError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| KernelError::store(format!("invalid database path {path}: {e}")))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| KernelError::store(format!("failed to open store: {e}")))?;
        schema::create_all(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory store for tests: `sqlite::memory:` with a single pooled
    /// connection (SQLite's `:memory:` database is connection-local).
    pub async fn open_in_memory() -> Result<Self, KernelError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| KernelError::store(format!("failed to open in-memory store: {e}")))?;
        schema::create_all(&pool).await?;
        Ok(Self { pool })
    }

    // -- Agents -----------------------------------------------------------

    pub async fn register_agent(&self, agent: &Agent) -> Result<(), KernelError> {
        sqlx::query(
            "INSERT INTO agents (agent_id, role, model, pane_id, pid, theme, project_path, status, \
             current_assignment_id, created_at, last_seen_at, shutdown_reason, shutdown_requested) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(agent.agent_id.as_str())
        .bind(rows::role_str(agent.role))
        .bind(&agent.model)
        .bind(agent.pane_id)
        .bind(agent.pid.map(|p| p as i64))
        .bind(&agent.theme)
        .bind(&agent.project_path)
        .bind(rows::agent_status_str(agent.status))
        .bind(agent.current_assignment_id)
        .bind(agent.created_at.to_rfc3339())
        .bind(agent.last_seen_at.to_rfc3339())
        .bind(&agent.shutdown_reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_status(&self, agent_id: &AgentId, status: AgentStatus) -> Result<(), KernelError> {
        sqlx::query("UPDATE agents SET status = ?, last_seen_at = ? WHERE agent_id = ?")
            .bind(rows::agent_status_str(status))
            .bind(Utc::now().to_rfc3339())
            .bind(agent_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn touch_last_seen(&self, agent_id: &AgentId) -> Result<(), KernelError> {
        sqlx::query("UPDATE agents SET last_seen_at = ? WHERE agent_id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(agent_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_stopped(&self, agent_id: &AgentId, reason: &str) -> Result<(), KernelError> {
        sqlx::query("UPDATE agents SET status = ?, shutdown_reason = ? WHERE agent_id = ?")
            .bind(rows::agent_status_str(AgentStatus::Stopped))
            .bind(reason)
            .bind(agent_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_shutdown_flag(&self, agent_id: &AgentId) -> Result<(), KernelError> {
        sqlx::query("UPDATE agents SET shutdown_requested = 1 WHERE agent_id = ?")
            .bind(agent_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn check_shutdown_flag(&self, agent_id: &AgentId) -> Result<bool, KernelError> {
        let row = sqlx::query("SELECT shutdown_requested FROM agents WHERE agent_id = ?")
            .bind(agent_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>("shutdown_requested") != 0).unwrap_or(false))
    }

    pub async fn clear_shutdown_flag(&self, agent_id: &AgentId) -> Result<(), KernelError> {
        sqlx::query("UPDATE agents SET shutdown_requested = 0 WHERE agent_id = ?")
            .bind(agent_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>, KernelError> {
        let row = sqlx::query("SELECT * FROM agents WHERE agent_id = ?")
            .bind(agent_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(rows::agent_from_row).transpose()
    }

    pub async fn get_all_agents(&self) -> Result<Vec<Agent>, KernelError> {
        let result = sqlx::query("SELECT * FROM agents ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        result.into_iter().map(rows::agent_from_row).collect()
    }

    pub async fn get_agents_by_status(&self, status: AgentStatus) -> Result<Vec<Agent>, KernelError> {
        let result = sqlx::query("SELECT * FROM agents WHERE status = ? ORDER BY created_at")
            .bind(rows::agent_status_str(status))
            .fetch_all(&self.pool)
            .await?;
        result.into_iter().map(rows::agent_from_row).collect()
    }

    /// Agents whose `last_seen_at` is older than `threshold` — candidates
    /// for the presence sweeper's own bookkeeping (the store is read-only
    /// here; the in-memory `PresenceTracker` owns the authoritative clock).
    pub async fn get_stale(&self, threshold: DateTime<Utc>) -> Result<Vec<Agent>, KernelError> {
        let result = sqlx::query("SELECT * FROM agents WHERE last_seen_at < ? AND status != ?")
            .bind(threshold.to_rfc3339())
            .bind(rows::agent_status_str(AgentStatus::Stopped))
            .fetch_all(&self.pool)
            .await?;
        result.into_iter().map(rows::agent_from_row).collect()
    }

    // -- Tasks --------------------------------------------------------------

    pub async fn upsert_task(&self, task: &Task) -> Result<(), KernelError> {
        sqlx::query(
            "INSERT INTO tasks (task_id, title, description, priority, status, origin_source, \
             repo_reference, requirements, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(task_id) DO UPDATE SET title = excluded.title, description = excluded.description, \
             priority = excluded.priority, status = excluded.status, repo_reference = excluded.repo_reference, \
             requirements = excluded.requirements",
        )
        .bind(task.task_id.as_str())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority as i64)
        .bind(rows::task_status_str(task.status))
        .bind(&task.origin_source)
        .bind(&task.repo_reference)
        .bind(serde_json::to_string(&task.requirements).unwrap_or_default())
        .bind(task.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_task(&self, task_id: &TaskId) -> Result<Option<Task>, KernelError> {
        let row =
            sqlx::query("SELECT * FROM tasks WHERE task_id = ?").bind(task_id.as_str()).fetch_optional(&self.pool).await?;
        row.map(rows::task_from_row).transpose()
    }

    pub async fn set_task_status(&self, task_id: &TaskId, status: TaskStatus) -> Result<(), KernelError> {
        sqlx::query("UPDATE tasks SET status = ? WHERE task_id = ?")
            .bind(rows::task_status_str(status))
            .bind(task_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -- Assignments ----------------------------------------------------

    /// Create a new assignment for `(task_id, assignee, kind)`, enforcing
    /// "at most one non-terminal assignment per agent" inside a
    /// single transaction.
    pub async fn create_assignment(
        &self,
        task_id: &TaskId,
        assignee: &AgentId,
        kind: AssignmentKind,
        branch_name: Option<&str>,
    ) -> Result<Assignment, KernelError> {
        let mut tx = self.pool.begin().await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM assignments WHERE assignee = ? AND status NOT IN ('completed', 'cancelled')",
        )
        .bind(assignee.as_str())
        .fetch_one(&mut *tx)
        .await?;
        if active > 0 {
            tx.rollback().await?;
            return Err(KernelError::state_transition(format!("{assignee} already has a non-terminal assignment")));
        }

        let assignment = Assignment::new(0, task_id.clone(), assignee.clone(), kind);
        let id = sqlx::query(
            "INSERT INTO assignments (task_id, assignee, kind, branch_name, status, created_at, \
             submitted_at, completed_at, feedback) VALUES (?, ?, ?, ?, ?, ?, NULL, NULL, NULL)",
        )
        .bind(task_id.as_str())
        .bind(rows::assignment_kind_str(kind))
        .bind(branch_name)
        .bind(rows::assignment_status_str(assignment.status))
        .bind(assignment.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("UPDATE tasks SET status = 'assigned' WHERE task_id = ? AND status = 'pending'")
            .bind(task_id.as_str())
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE agents SET current_assignment_id = ? WHERE agent_id = ?")
            .bind(id)
            .bind(assignee.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Assignment { id, branch_name: branch_name.map(str::to_owned), ..assignment })
    }

    pub async fn get_assignment(&self, id: i64) -> Result<Option<Assignment>, KernelError> {
        let row = sqlx::query("SELECT * FROM assignments WHERE id = ?").bind(id).fetch_optional(&self.pool).await?;
        row.map(rows::assignment_from_row).transpose()
    }

    pub async fn get_active_assignment_for(&self, agent_id: &AgentId) -> Result<Option<Assignment>, KernelError> {
        let row = sqlx::query(
            "SELECT * FROM assignments WHERE assignee = ? AND status NOT IN ('completed', 'cancelled') \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(agent_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(rows::assignment_from_row).transpose()
    }

    /// Apply a validated transition and persist it. The caller (the
    /// Assignment & Review-Board state machine component) is responsible
    /// for calling [`Assignment::validate_transition`] first; this method
    /// trusts the already-validated `next` status and writes it alongside
    /// its derived timestamps in one statement.
    pub async fn transition_assignment(
        &self,
        id: i64,
        next: AssignmentStatus,
        branch_name: Option<&str>,
        feedback: Option<&str>,
    ) -> Result<(), KernelError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        match next {
            AssignmentStatus::Submitted => {
                sqlx::query(
                    "UPDATE assignments SET status = ?, submitted_at = ?, branch_name = COALESCE(?, branch_name) \
                     WHERE id = ?",
                )
                .bind(rows::assignment_status_str(next))
                .bind(&now)
                .bind(branch_name)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
            AssignmentStatus::Completed | AssignmentStatus::Cancelled => {
                sqlx::query("UPDATE assignments SET status = ?, completed_at = ?, feedback = COALESCE(?, feedback) WHERE id = ?")
                    .bind(rows::assignment_status_str(next))
                    .bind(&now)
                    .bind(feedback)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            _ => {
                sqlx::query("UPDATE assignments SET status = ?, feedback = COALESCE(?, feedback) WHERE id = ?")
                    .bind(rows::assignment_status_str(next))
                    .bind(feedback)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        if next.is_terminal() {
            let assignee: Option<String> = sqlx::query_scalar("SELECT assignee FROM assignments WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(assignee) = assignee {
                sqlx::query("UPDATE agents SET current_assignment_id = NULL WHERE agent_id = ? AND current_assignment_id = ?")
                    .bind(&assignee)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        if next == AssignmentStatus::Completed {
            let task_id: Option<String> = sqlx::query_scalar("SELECT task_id FROM assignments WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(task_id) = task_id {
                sqlx::query("UPDATE tasks SET status = 'completed' WHERE task_id = ?").bind(&task_id).execute(&mut *tx).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    // -- Worker records -----------------------------------------------------

    pub async fn log_worker(
        &self,
        parent_assignment_id: i64,
        creator: &AgentId,
        kind: &str,
        description: &str,
        model: &str,
    ) -> Result<i64, KernelError> {
        let id = sqlx::query(
            "INSERT INTO worker_records (parent_assignment_id, creator, kind, description, status, result, \
             tokens_used, model) VALUES (?, ?, ?, ?, 'open', NULL, 0, ?)",
        )
        .bind(parent_assignment_id)
        .bind(creator.as_str())
        .bind(kind)
        .bind(description)
        .bind(model)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    pub async fn complete_worker(
        &self,
        id: i64,
        status: WorkerStatus,
        result: Option<&str>,
        tokens_used: u64,
    ) -> Result<(), KernelError> {
        sqlx::query("UPDATE worker_records SET status = ?, result = ?, tokens_used = ? WHERE id = ?")
            .bind(rows::worker_status_str(status))
            .bind(result)
            .bind(tokens_used as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -- Review boards, votes, defects --------------------------------------

    /// Returns the existing board id if one already exists for this
    /// assignment or creates a new one.
    pub async fn create_review_board(
        &self,
        assignment_id: i64,
        reviewer_count: u8,
        complexity_score: u8,
        risk_level: RiskLevel,
    ) -> Result<i64, KernelError> {
        if let Some(id) = sqlx::query_scalar::<_, i64>("SELECT id FROM review_boards WHERE assignment_id = ?")
            .bind(assignment_id)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(id);
        }

        let id = sqlx::query(
            "INSERT INTO review_boards (assignment_id, reviewer_count, complexity_score, risk_level, status, verdict) \
             VALUES (?, ?, ?, ?, 'open', NULL)",
        )
        .bind(assignment_id)
        .bind(reviewer_count as i64)
        .bind(complexity_score as i64)
        .bind(rows::risk_level_str(risk_level))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    pub async fn get_review_board(&self, id: i64) -> Result<Option<ReviewBoard>, KernelError> {
        let Some(row) = sqlx::query("SELECT * FROM review_boards WHERE id = ?").bind(id).fetch_optional(&self.pool).await?
        else {
            return Ok(None);
        };
        let mut board = rows::board_from_row(row)?;

        let vote_rows = sqlx::query("SELECT * FROM reviewer_votes WHERE board_id = ?").bind(id).fetch_all(&self.pool).await?;
        board.votes = vote_rows.into_iter().map(rows::vote_from_row).collect::<Result<_, _>>()?;

        let defect_rows = sqlx::query("SELECT * FROM defects WHERE board_id = ?").bind(id).fetch_all(&self.pool).await?;
        board.defects = defect_rows.into_iter().map(rows::defect_from_row).collect::<Result<_, _>>()?;

        Ok(Some(board))
    }

    pub async fn submit_defect(&self, defect: &Defect) -> Result<i64, KernelError> {
        let status: String =
            sqlx::query_scalar("SELECT status FROM review_boards WHERE id = ?").bind(defect.board_id).fetch_one(&self.pool).await?;
        if status != "open" {
            return Err(KernelError::state_transition(format!("board {} is not open", defect.board_id)));
        }

        let (line_start, line_end) = defect.line_range.map_or((None, None), |(s, e)| (Some(s as i64), Some(e as i64)));
        let id = sqlx::query(
            "INSERT INTO defects (board_id, reporter, category, severity, title, description, file_path, \
             line_start, line_end, suggested_fix) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(defect.board_id)
        .bind(defect.reporter.as_str())
        .bind(rows::defect_category_str(defect.category))
        .bind(rows::defect_severity_str(defect.severity))
        .bind(&defect.title)
        .bind(&defect.description)
        .bind(&defect.file_path)
        .bind(line_start)
        .bind(line_end)
        .bind(&defect.suggested_fix)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    pub async fn record_reviewer_vote(&self, vote: &ReviewerVote) -> Result<(), KernelError> {
        let status: String =
            sqlx::query_scalar("SELECT status FROM review_boards WHERE id = ?").bind(vote.board_id).fetch_one(&self.pool).await?;
        if status != "open" {
            return Err(KernelError::state_transition(format!("board {} is not open", vote.board_id)));
        }

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviewer_votes WHERE board_id = ? AND reviewer_id = ?")
            .bind(vote.board_id)
            .bind(vote.reviewer.as_str())
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Err(KernelError::new(
                crate::error::ErrorCode::StateTransitionError,
                format!("duplicate vote from {} on board {}", vote.reviewer, vote.board_id),
            ));
        }

        sqlx::query(
            "INSERT INTO reviewer_votes (board_id, reviewer_id, approved, confidence, defects_found, tokens_used) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(vote.board_id)
        .bind(vote.reviewer.as_str())
        .bind(vote.approved)
        .bind(vote.confidence as i64)
        .bind(vote.defects_found as i64)
        .bind(vote.tokens_used as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Aggregate votes and defects, derive the verdict, persist it, and
    /// transition the bound assignment — all inside one transaction, so a
    /// crash mid-finalize never leaves the board and its assignment out
    /// of sync.
    pub async fn finalize_board(&self, board_id: i64, forced: bool) -> Result<ReviewVerdict, KernelError> {
        let mut tx = self.pool.begin().await?;

        let existing_verdict: Option<String> =
            sqlx::query_scalar("SELECT verdict FROM review_boards WHERE id = ?").bind(board_id).fetch_optional(&mut *tx).await?.flatten();
        if let Some(v) = existing_verdict {
            tx.rollback().await?;
            return rows::parse_verdict(&v);
        }

        let board_row = sqlx::query("SELECT * FROM review_boards WHERE id = ?")
            .bind(board_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| KernelError::state_transition(format!("no such board {board_id}")))?;
        let mut board = rows::board_from_row(board_row)?;

        let vote_rows = sqlx::query("SELECT * FROM reviewer_votes WHERE board_id = ?").bind(board_id).fetch_all(&mut *tx).await?;
        board.votes = vote_rows.into_iter().map(rows::vote_from_row).collect::<Result<_, _>>()?;
        let defect_rows = sqlx::query("SELECT * FROM defects WHERE board_id = ?").bind(board_id).fetch_all(&mut *tx).await?;
        board.defects = defect_rows.into_iter().map(rows::defect_from_row).collect::<Result<_, _>>()?;

        let verdict = board.finalize(forced)?;

        sqlx::query("UPDATE review_boards SET status = 'finalized', verdict = ? WHERE id = ?")
            .bind(rows::verdict_str(verdict))
            .bind(board_id)
            .execute(&mut *tx)
            .await?;

        // Approved assignments go straight to `completed` rather than
        // stopping at `approved`: spec §4.6 shows `approved -> completed`,
        // and leaving it at `approved` (non-terminal) would permanently
        // pin the coder's "one non-terminal assignment" slot.
        let next_status = match verdict {
            ReviewVerdict::Approved => AssignmentStatus::Completed,
            ReviewVerdict::Rejected => AssignmentStatus::Rejected,
            ReviewVerdict::ChangesRequested => AssignmentStatus::ChangesRequested,
        };

        if next_status == AssignmentStatus::Completed {
            let now = Utc::now().to_rfc3339();
            sqlx::query("UPDATE assignments SET status = ?, completed_at = ? WHERE id = ?")
                .bind(rows::assignment_status_str(next_status))
                .bind(&now)
                .bind(board.assignment_id)
                .execute(&mut *tx)
                .await?;

            let assignee: Option<String> = sqlx::query_scalar("SELECT assignee FROM assignments WHERE id = ?")
                .bind(board.assignment_id)
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(assignee) = assignee {
                sqlx::query("UPDATE agents SET current_assignment_id = NULL WHERE agent_id = ? AND current_assignment_id = ?")
                    .bind(&assignee)
                    .bind(board.assignment_id)
                    .execute(&mut *tx)
                    .await?;
            }

            let task_id: Option<String> = sqlx::query_scalar("SELECT task_id FROM assignments WHERE id = ?")
                .bind(board.assignment_id)
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(task_id) = task_id {
                sqlx::query("UPDATE tasks SET status = 'completed' WHERE task_id = ?").bind(&task_id).execute(&mut *tx).await?;
            }
        } else {
            sqlx::query("UPDATE assignments SET status = ? WHERE id = ?")
                .bind(rows::assignment_status_str(next_status))
                .bind(board.assignment_id)
                .execute(&mut *tx)
                .await?;
        }

        for vote in &board.votes {
            let agreement = if vote.approved == matches!(verdict, ReviewVerdict::Approved) { 1.0 } else { 0.0 };
            record_reviewer_agreement_tx(&mut tx, &vote.reviewer, agreement).await?;
        }
        for defect in &board.defects {
            record_defect_credit_tx(&mut tx, &defect.reporter, 1).await?;
        }

        tx.commit().await?;
        Ok(verdict)
    }

    // -- Leaderboard ------------------------------------------------------

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, KernelError> {
        let rows = sqlx::query(
            "SELECT agent_id, defects_reported, reviews_completed, reviewer_agreement_sum, reviewer_agreement_count \
             FROM leaderboard ORDER BY defects_reported DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(rows::leaderboard_from_row).collect()
    }
}

async fn record_defect_credit_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    reporter: &AgentId,
    delta: i64,
) -> Result<(), KernelError> {
    sqlx::query(
        "INSERT INTO leaderboard (agent_id, defects_reported) VALUES (?, ?) \
         ON CONFLICT(agent_id) DO UPDATE SET defects_reported = defects_reported + excluded.defects_reported",
    )
    .bind(reporter.as_str())
    .bind(delta)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn record_reviewer_agreement_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    reviewer: &AgentId,
    agreement: f64,
) -> Result<(), KernelError> {
    sqlx::query(
        "INSERT INTO leaderboard (agent_id, reviews_completed, reviewer_agreement_sum, reviewer_agreement_count) \
         VALUES (?, 1, ?, 1) \
         ON CONFLICT(agent_id) DO UPDATE SET reviews_completed = reviews_completed + 1, \
         reviewer_agreement_sum = reviewer_agreement_sum + excluded.reviewer_agreement_sum, \
         reviewer_agreement_count = reviewer_agreement_count + 1",
    )
    .bind(reviewer.as_str())
    .bind(agreement)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// AgentRole round-trips through these four-letter tags everywhere the
/// store needs a bare string (not just `AgentId`'s `team-<tag><nnn>`).
pub(crate) fn parse_agent_role(s: &str) -> Result<AgentRole, KernelError> {
    match s {
        "coder" => Ok(AgentRole::Coder),
        "reviewer" => Ok(AgentRole::Reviewer),
        "recon" => Ok(AgentRole::Reconnaissance),
        "security" => Ok(AgentRole::Security),
        "captain" => Ok(AgentRole::Supervisor),
        other => Err(KernelError::store(format!("unknown agent role {other:?}"))),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
