// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::error::KernelError;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentKind {
    Implementation,
    Review,
    Rework,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Dispatched,
    Accepted,
    InProgress,
    Submitted,
    UnderReview,
    Blocked,
    Approved,
    Rejected,
    ChangesRequested,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    /// Non-terminal statuses count toward the "at most one active
    /// assignment per agent" invariant.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Verdict a reviewer or `finalize_board` can render against a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Approved,
    Rejected,
    ChangesRequested,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub task_id: TaskId,
    pub assignee: AgentId,
    pub kind: AssignmentKind,
    pub branch_name: Option<String>,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub feedback: Option<String>,
}

impl Assignment {
    pub fn new(id: i64, task_id: TaskId, assignee: AgentId, kind: AssignmentKind) -> Self {
        Self {
            id,
            task_id,
            assignee,
            kind,
            branch_name: None,
            status: AssignmentStatus::Dispatched,
            created_at: Utc::now(),
            submitted_at: None,
            completed_at: None,
            feedback: None,
        }
    }

    /// Validate (but do not apply) a requested transition against the
    /// lifecycle diagram. Returns the resulting status on success; never
    /// mutates `self` on error.
    pub fn validate_transition(&self, next: AssignmentStatus) -> Result<AssignmentStatus, KernelError> {
        use AssignmentStatus::*;
        let allowed = matches!(
            (self.status, next),
            (Dispatched, Accepted)
                | (Accepted, InProgress)
                | (InProgress, Submitted)
                | (InProgress, Blocked)
                | (Blocked, InProgress)
                | (Submitted, UnderReview)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Submitted, ChangesRequested)
                | (UnderReview, Approved)
                | (UnderReview, Rejected)
                | (UnderReview, ChangesRequested)
                | (ChangesRequested, InProgress)
                | (Approved, Completed)
        ) || (!self.status.is_terminal() && next == Cancelled);

        if allowed {
            Ok(next)
        } else {
            Err(KernelError::state_transition(format!(
                "cannot transition assignment {} from {:?} to {:?}",
                self.id, self.status, next
            )))
        }
    }

    pub fn apply_transition(&mut self, next: AssignmentStatus) -> Result<(), KernelError> {
        self.validate_transition(next)?;
        match next {
            AssignmentStatus::Submitted => self.submitted_at = Some(Utc::now()),
            AssignmentStatus::Completed | AssignmentStatus::Cancelled => self.completed_at = Some(Utc::now()),
            _ => {}
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "assignment_tests.rs"]
mod tests;
