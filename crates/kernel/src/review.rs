// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::assignment::ReviewVerdict;
use crate::error::KernelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefectCategory {
    Logic,
    Data,
    Interface,
    Docs,
    Syntax,
    Standards,
    Security,
    Performance,
    Testing,
    Architecture,
    Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardStatus {
    Open,
    Finalized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defect {
    pub id: i64,
    pub board_id: i64,
    pub reporter: AgentId,
    pub category: DefectCategory,
    pub severity: DefectSeverity,
    pub title: String,
    pub description: String,
    pub file_path: Option<String>,
    pub line_range: Option<(u32, u32)>,
    pub suggested_fix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerVote {
    pub board_id: i64,
    pub reviewer: AgentId,
    pub approved: bool,
    pub confidence: u8,
    pub defects_found: u32,
    pub tokens_used: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewBoard {
    pub id: i64,
    pub assignment_id: i64,
    pub reviewer_count: u8,
    pub complexity_score: u8,
    pub risk_level: RiskLevel,
    pub status: BoardStatus,
    pub verdict: Option<ReviewVerdict>,
    pub votes: Vec<ReviewerVote>,
    pub defects: Vec<Defect>,
}

impl ReviewBoard {
    pub fn new(id: i64, assignment_id: i64, reviewer_count: u8, complexity_score: u8, risk_level: RiskLevel) -> Self {
        Self {
            id,
            assignment_id,
            reviewer_count,
            complexity_score,
            risk_level,
            status: BoardStatus::Open,
            verdict: None,
            votes: Vec::new(),
            defects: Vec::new(),
        }
    }

    pub fn submit_defect(&mut self, defect: Defect) -> Result<(), KernelError> {
        if self.status != BoardStatus::Open {
            return Err(KernelError::state_transition(format!("board {} is not open", self.id)));
        }
        self.defects.push(defect);
        Ok(())
    }

    /// One vote per reviewer id; a second vote from the same reviewer is
    /// rejected with `DuplicateVote`.
    pub fn record_vote(&mut self, vote: ReviewerVote) -> Result<(), KernelError> {
        if self.status != BoardStatus::Open {
            return Err(KernelError::state_transition(format!("board {} is not open", self.id)));
        }
        if self.votes.iter().any(|v| v.reviewer == vote.reviewer) {
            return Err(KernelError::new(
                crate::error::ErrorCode::StateTransitionError,
                format!("duplicate vote from {} on board {}", vote.reviewer, self.id),
            ));
        }
        self.votes.push(vote);
        Ok(())
    }

    pub fn ready_to_finalize(&self) -> bool {
        self.votes.len() as u8 >= self.reviewer_count
    }

    /// Consensus formula with a 1-2 reviewer clamp: boards with
    /// `reviewer_count <= 2` require unanimous approval (the literal
    /// ⌈n/2⌉+1 threshold is unreachable at that size).
    fn compute_verdict(&self) -> ReviewVerdict {
        let approvals = self.votes.iter().filter(|v| v.approved).count() as u32;
        let n = self.reviewer_count as u32;
        let has_critical = self.defects.iter().any(|d| d.severity == DefectSeverity::Critical);

        if has_critical {
            return ReviewVerdict::Rejected;
        }

        let approved = if n <= 2 {
            approvals == n && n > 0
        } else {
            approvals >= n.div_ceil(2) + 1
        };
        if approved {
            return ReviewVerdict::Approved;
        }

        let rejected = approvals < n / 2;
        if rejected {
            ReviewVerdict::Rejected
        } else {
            ReviewVerdict::ChangesRequested
        }
    }

    /// Legal when vote count >= reviewer_count, or an operator forces it.
    /// Idempotent once finalized: re-finalizing returns the stored verdict
    /// without recomputing.
    pub fn finalize(&mut self, forced: bool) -> Result<ReviewVerdict, KernelError> {
        if self.status == BoardStatus::Finalized {
            return Ok(self.verdict.unwrap_or(ReviewVerdict::ChangesRequested));
        }
        if !self.ready_to_finalize() && !forced {
            return Err(KernelError::state_transition(format!(
                "board {} has {} of {} votes",
                self.id,
                self.votes.len(),
                self.reviewer_count
            )));
        }

        let verdict = self.compute_verdict();
        self.verdict = Some(verdict);
        self.status = BoardStatus::Finalized;
        Ok(verdict)
    }

    pub fn defect_counts_by_severity(&self) -> [(DefectSeverity, usize); 5] {
        use DefectSeverity::*;
        let count = |sev: DefectSeverity| self.defects.iter().filter(|d| d.severity == sev).count();
        [(Critical, count(Critical)), (High, count(High)), (Medium, count(Medium)), (Low, count(Low)), (Info, count(Info))]
    }
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
