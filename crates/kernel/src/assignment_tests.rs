// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn assignment() -> Assignment {
    Assignment::new(1, TaskId::new("t1"), AgentId::new("team-coder001"), AssignmentKind::Implementation)
}

#[test]
fn happy_path_dispatched_to_completed() {
    let mut a = assignment();
    a.apply_transition(AssignmentStatus::Accepted).unwrap();
    a.apply_transition(AssignmentStatus::InProgress).unwrap();
    a.apply_transition(AssignmentStatus::Submitted).unwrap();
    assert!(a.submitted_at.is_some());
    a.apply_transition(AssignmentStatus::UnderReview).unwrap();
    a.apply_transition(AssignmentStatus::Approved).unwrap();
    a.apply_transition(AssignmentStatus::Completed).unwrap();
    assert!(a.completed_at.is_some());
    assert_eq!(a.status, AssignmentStatus::Completed);
}

#[test]
fn invalid_transition_does_not_mutate_state() {
    let mut a = assignment();
    let err = a.apply_transition(AssignmentStatus::Completed);
    assert!(err.is_err());
    assert_eq!(a.status, AssignmentStatus::Dispatched);
}

#[test]
fn changes_requested_loops_back_to_in_progress() {
    let mut a = assignment();
    a.apply_transition(AssignmentStatus::Accepted).unwrap();
    a.apply_transition(AssignmentStatus::InProgress).unwrap();
    a.apply_transition(AssignmentStatus::Submitted).unwrap();
    a.apply_transition(AssignmentStatus::ChangesRequested).unwrap();
    a.apply_transition(AssignmentStatus::InProgress).unwrap();
    assert_eq!(a.status, AssignmentStatus::InProgress);
}

#[test]
fn blocked_returns_to_in_progress() {
    let mut a = assignment();
    a.apply_transition(AssignmentStatus::Accepted).unwrap();
    a.apply_transition(AssignmentStatus::InProgress).unwrap();
    a.apply_transition(AssignmentStatus::Blocked).unwrap();
    a.apply_transition(AssignmentStatus::InProgress).unwrap();
    assert_eq!(a.status, AssignmentStatus::InProgress);
}

#[test]
fn cancel_allowed_from_any_non_terminal_state() {
    let mut a = assignment();
    a.apply_transition(AssignmentStatus::Cancelled).unwrap();
    assert_eq!(a.status, AssignmentStatus::Cancelled);
}

#[test]
fn cancel_not_allowed_once_terminal() {
    let mut a = assignment();
    a.apply_transition(AssignmentStatus::Cancelled).unwrap();
    assert!(a.apply_transition(AssignmentStatus::Cancelled).is_err());
}
