// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::agent::AgentId;

fn board(reviewer_count: u8) -> ReviewBoard {
    ReviewBoard::new(1, 100, reviewer_count, 40, RiskLevel::Low)
}

fn vote(board_id: i64, reviewer: &str, approved: bool) -> ReviewerVote {
    ReviewerVote { board_id, reviewer: AgentId::new(reviewer), approved, confidence: 80, defects_found: 0, tokens_used: 500 }
}

#[test]
fn three_reviewer_unanimous_approval() {
    let mut b = board(3);
    b.record_vote(vote(b.id, "team-reviewer001", true)).unwrap();
    b.record_vote(vote(b.id, "team-reviewer002", true)).unwrap();
    b.record_vote(vote(b.id, "team-reviewer003", true)).unwrap();
    assert!(b.ready_to_finalize());
    assert_eq!(b.finalize(false).unwrap(), ReviewVerdict::Approved);
}

#[test]
fn three_reviewer_majority_approval() {
    let mut b = board(3);
    b.record_vote(vote(b.id, "team-reviewer001", true)).unwrap();
    b.record_vote(vote(b.id, "team-reviewer002", true)).unwrap();
    b.record_vote(vote(b.id, "team-reviewer003", false)).unwrap();
    assert_eq!(b.finalize(false).unwrap(), ReviewVerdict::ChangesRequested);
}

#[test]
fn critical_defect_forces_rejection_even_with_all_approvals() {
    let mut b = board(3);
    b.submit_defect(Defect {
        id: 1,
        board_id: b.id,
        reporter: AgentId::new("team-reviewer002"),
        category: DefectCategory::Security,
        severity: DefectSeverity::Critical,
        title: "auth bypass".into(),
        description: "missing check".into(),
        file_path: Some("src/auth.rs".into()),
        line_range: Some((10, 20)),
        suggested_fix: None,
    })
    .unwrap();
    b.record_vote(vote(b.id, "team-reviewer001", true)).unwrap();
    b.record_vote(vote(b.id, "team-reviewer002", true)).unwrap();
    b.record_vote(vote(b.id, "team-reviewer003", true)).unwrap();
    assert_eq!(b.finalize(false).unwrap(), ReviewVerdict::Rejected);
}

#[test]
fn single_reviewer_board_requires_unanimous_approval() {
    let mut b = board(1);
    b.record_vote(vote(b.id, "team-reviewer001", true)).unwrap();
    assert_eq!(b.finalize(false).unwrap(), ReviewVerdict::Approved);

    let mut b2 = board(1);
    b2.record_vote(vote(b2.id, "team-reviewer001", false)).unwrap();
    assert_eq!(b2.finalize(false).unwrap(), ReviewVerdict::Rejected);
}

#[test]
fn two_reviewer_board_requires_unanimous_approval() {
    let mut b = board(2);
    b.record_vote(vote(b.id, "team-reviewer001", true)).unwrap();
    b.record_vote(vote(b.id, "team-reviewer002", false)).unwrap();
    assert_eq!(b.finalize(false).unwrap(), ReviewVerdict::Rejected);
}

#[test]
fn duplicate_vote_from_same_reviewer_rejected() {
    let mut b = board(3);
    b.record_vote(vote(b.id, "team-reviewer001", true)).unwrap();
    let err = b.record_vote(vote(b.id, "team-reviewer001", false));
    assert!(err.is_err());
    assert_eq!(b.votes.len(), 1);
}

#[test]
fn cannot_vote_or_submit_defect_once_finalized() {
    let mut b = board(1);
    b.record_vote(vote(b.id, "team-reviewer001", true)).unwrap();
    b.finalize(false).unwrap();
    assert!(b.record_vote(vote(b.id, "team-reviewer002", true)).is_err());
    assert!(b
        .submit_defect(Defect {
            id: 2,
            board_id: b.id,
            reporter: AgentId::new("team-reviewer001"),
            category: DefectCategory::Style,
            severity: DefectSeverity::Low,
            title: "nit".into(),
            description: "".into(),
            file_path: None,
            line_range: None,
            suggested_fix: None,
        })
        .is_err());
}

#[test]
fn finalize_is_idempotent() {
    let mut b = board(1);
    b.record_vote(vote(b.id, "team-reviewer001", true)).unwrap();
    let first = b.finalize(false).unwrap();
    let second = b.finalize(false).unwrap();
    assert_eq!(first, second);
}

#[test]
fn finalize_forced_before_all_votes_in() {
    let mut b = board(3);
    b.record_vote(vote(b.id, "team-reviewer001", true)).unwrap();
    assert!(!b.ready_to_finalize());
    assert!(b.finalize(false).is_err());
    assert_eq!(b.finalize(true).unwrap(), ReviewVerdict::Rejected);
}

#[test]
fn defect_counts_by_severity_tally_correctly() {
    let mut b = board(3);
    b.submit_defect(Defect {
        id: 1,
        board_id: b.id,
        reporter: AgentId::new("team-reviewer001"),
        category: DefectCategory::Logic,
        severity: DefectSeverity::High,
        title: "off by one".into(),
        description: "".into(),
        file_path: None,
        line_range: None,
        suggested_fix: None,
    })
    .unwrap();
    b.submit_defect(Defect {
        id: 2,
        board_id: b.id,
        reporter: AgentId::new("team-reviewer002"),
        category: DefectCategory::Style,
        severity: DefectSeverity::Low,
        title: "naming".into(),
        description: "".into(),
        file_path: None,
        line_range: None,
        suggested_fix: None,
    })
    .unwrap();
    let counts = b.defect_counts_by_severity();
    assert_eq!(counts[1], (DefectSeverity::High, 1));
    assert_eq!(counts[3], (DefectSeverity::Low, 1));
}
