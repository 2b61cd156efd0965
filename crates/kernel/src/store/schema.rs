// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use sqlx::SqlitePool;

use crate::error::KernelError;

/// Idempotent schema creation: every statement is `CREATE TABLE IF NOT
/// EXISTS`, so opening an already-initialized database file is a no-op.
/// No migration framework — a single forward-only DDL pass is enough for
/// a persisted shape that stays fixed for the lifetime of a deployment.
pub(super) async fn create_all(pool: &SqlitePool) -> Result<(), KernelError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS agents (
            agent_id TEXT PRIMARY KEY,
            role TEXT NOT NULL,
            model TEXT NOT NULL,
            pane_id INTEGER,
            pid INTEGER,
            theme TEXT,
            project_path TEXT NOT NULL,
            status TEXT NOT NULL,
            current_assignment_id INTEGER,
            created_at TEXT NOT NULL,
            last_seen_at TEXT NOT NULL,
            shutdown_reason TEXT,
            shutdown_requested INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tasks (
            task_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            priority INTEGER NOT NULL,
            status TEXT NOT NULL,
            origin_source TEXT NOT NULL,
            repo_reference TEXT,
            requirements TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS assignments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id TEXT NOT NULL,
            assignee TEXT NOT NULL,
            kind TEXT NOT NULL,
            branch_name TEXT,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            submitted_at TEXT,
            completed_at TEXT,
            feedback TEXT
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_assignments_assignee ON assignments (assignee)").execute(pool).await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS worker_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_assignment_id INTEGER NOT NULL,
            creator TEXT NOT NULL,
            kind TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL,
            result TEXT,
            tokens_used INTEGER NOT NULL DEFAULT 0,
            model TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS review_boards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            assignment_id INTEGER NOT NULL,
            reviewer_count INTEGER NOT NULL,
            complexity_score INTEGER NOT NULL,
            risk_level TEXT NOT NULL,
            status TEXT NOT NULL,
            verdict TEXT
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_boards_assignment ON review_boards (assignment_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS reviewer_votes (
            board_id INTEGER NOT NULL,
            reviewer_id TEXT NOT NULL,
            approved INTEGER NOT NULL,
            confidence INTEGER NOT NULL,
            defects_found INTEGER NOT NULL,
            tokens_used INTEGER NOT NULL,
            PRIMARY KEY (board_id, reviewer_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS defects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            board_id INTEGER NOT NULL,
            reporter TEXT NOT NULL,
            category TEXT NOT NULL,
            severity TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            file_path TEXT,
            line_start INTEGER,
            line_end INTEGER,
            suggested_fix TEXT
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS leaderboard (
            agent_id TEXT PRIMARY KEY,
            defects_reported INTEGER NOT NULL DEFAULT 0,
            reviews_completed INTEGER NOT NULL DEFAULT 0,
            reviewer_agreement_sum REAL NOT NULL DEFAULT 0,
            reviewer_agreement_count INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
