use super::*;
use crate::agent::{Agent, AgentId, AgentRole};
use crate::assignment::AssignmentKind;
use crate::review::{Defect, DefectCategory, DefectSeverity, ReviewerVote, RiskLevel};
use crate::task::{Task, TaskStatus};

async fn store() -> Store {
    Store::open_in_memory().await.expect("in-memory store opens")
}

fn agent(id: &str) -> Agent {
    Agent::new(AgentId::new(id), AgentRole::Coder, "claude-opus", "/repo")
}

fn task(id: &str) -> Task {
    Task {
        task_id: TaskId::new(id),
        title: "do the thing".into(),
        description: "".into(),
        priority: 1,
        status: TaskStatus::Pending,
        origin_source: "static".into(),
        repo_reference: None,
        requirements: vec![],
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn register_and_fetch_agent_round_trips() {
    let store = store().await;
    store.register_agent(&agent("team-coder001")).await.unwrap();

    let fetched = store.get_agent(&AgentId::new("team-coder001")).await.unwrap().unwrap();
    assert_eq!(fetched.role, AgentRole::Coder);
    assert_eq!(fetched.status, AgentStatus::Pending);
}

#[tokio::test]
async fn second_non_terminal_assignment_for_same_agent_is_rejected() {
    let store = store().await;
    store.register_agent(&agent("team-coder001")).await.unwrap();
    store.upsert_task(&task("t1")).await.unwrap();
    store.upsert_task(&task("t2")).await.unwrap();

    store.create_assignment(&TaskId::new("t1"), &AgentId::new("team-coder001"), AssignmentKind::Implementation, None).await.unwrap();

    let second = store.create_assignment(&TaskId::new("t2"), &AgentId::new("team-coder001"), AssignmentKind::Implementation, None).await;
    assert!(second.is_err());
}

#[tokio::test]
async fn completing_an_assignment_frees_the_agent_for_a_new_one() {
    let store = store().await;
    store.register_agent(&agent("team-coder001")).await.unwrap();
    store.upsert_task(&task("t1")).await.unwrap();
    store.upsert_task(&task("t2")).await.unwrap();

    let first = store.create_assignment(&TaskId::new("t1"), &AgentId::new("team-coder001"), AssignmentKind::Implementation, None).await.unwrap();
    store.transition_assignment(first.id, AssignmentStatus::Accepted, None, None).await.unwrap();
    store.transition_assignment(first.id, AssignmentStatus::InProgress, None, None).await.unwrap();
    store.transition_assignment(first.id, AssignmentStatus::Submitted, Some("branch/x"), None).await.unwrap();
    store.transition_assignment(first.id, AssignmentStatus::Approved, None, None).await.unwrap();
    store.transition_assignment(first.id, AssignmentStatus::Completed, None, None).await.unwrap();

    let agent_row = store.get_agent(&AgentId::new("team-coder001")).await.unwrap().unwrap();
    assert_eq!(agent_row.current_assignment_id, None);

    store.create_assignment(&TaskId::new("t2"), &AgentId::new("team-coder001"), AssignmentKind::Implementation, None).await.unwrap();
}

#[tokio::test]
async fn finalize_board_is_idempotent_and_updates_assignment() {
    let store = store().await;
    store.register_agent(&agent("team-coder001")).await.unwrap();
    store.register_agent(&agent("team-reviewer001")).await.unwrap();
    store.upsert_task(&task("t1")).await.unwrap();

    let assignment =
        store.create_assignment(&TaskId::new("t1"), &AgentId::new("team-coder001"), AssignmentKind::Implementation, None).await.unwrap();
    let board_id = store.create_review_board(assignment.id, 1, 5, RiskLevel::Low).await.unwrap();

    store
        .record_reviewer_vote(&ReviewerVote {
            board_id,
            reviewer: AgentId::new("team-reviewer001"),
            approved: true,
            confidence: 90,
            defects_found: 0,
            tokens_used: 100,
        })
        .await
        .unwrap();

    let first = store.finalize_board(board_id, false).await.unwrap();
    assert_eq!(first, ReviewVerdict::Approved);

    let second = store.finalize_board(board_id, false).await.unwrap();
    assert_eq!(second, ReviewVerdict::Approved);

    // An approved verdict lands on `completed`, not `approved`: `approved` is
    // non-terminal and would otherwise pin the coder's one-active-assignment
    // slot forever.
    let assignment = store.get_assignment(assignment.id).await.unwrap().unwrap();
    assert_eq!(assignment.status, AssignmentStatus::Completed);
    assert!(assignment.completed_at.is_some());

    let task = store.get_task(&TaskId::new("t1")).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    let agent_row = store.get_agent(&AgentId::new("team-coder001")).await.unwrap().unwrap();
    assert_eq!(agent_row.current_assignment_id, None);
}

#[tokio::test]
async fn duplicate_create_review_board_returns_existing_id() {
    let store = store().await;
    store.register_agent(&agent("team-coder001")).await.unwrap();
    store.upsert_task(&task("t1")).await.unwrap();
    let assignment =
        store.create_assignment(&TaskId::new("t1"), &AgentId::new("team-coder001"), AssignmentKind::Implementation, None).await.unwrap();

    let first = store.create_review_board(assignment.id, 2, 3, RiskLevel::Medium).await.unwrap();
    let second = store.create_review_board(assignment.id, 2, 3, RiskLevel::Medium).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn critical_defect_forces_rejection_even_with_unanimous_approval() {
    let store = store().await;
    store.register_agent(&agent("team-coder001")).await.unwrap();
    store.register_agent(&agent("team-reviewer001")).await.unwrap();
    store.upsert_task(&task("t1")).await.unwrap();
    let assignment =
        store.create_assignment(&TaskId::new("t1"), &AgentId::new("team-coder001"), AssignmentKind::Implementation, None).await.unwrap();
    let board_id = store.create_review_board(assignment.id, 1, 8, RiskLevel::High).await.unwrap();

    store
        .submit_defect(&Defect {
            id: 0,
            board_id,
            reporter: AgentId::new("team-reviewer001"),
            category: DefectCategory::Security,
            severity: DefectSeverity::Critical,
            title: "sql injection".into(),
            description: "unescaped input".into(),
            file_path: Some("src/db.rs".into()),
            line_range: Some((10, 12)),
            suggested_fix: None,
        })
        .await
        .unwrap();
    store
        .record_reviewer_vote(&ReviewerVote {
            board_id,
            reviewer: AgentId::new("team-reviewer001"),
            approved: true,
            confidence: 95,
            defects_found: 1,
            tokens_used: 50,
        })
        .await
        .unwrap();

    let verdict = store.finalize_board(board_id, false).await.unwrap();
    assert_eq!(verdict, ReviewVerdict::Rejected);
}

#[tokio::test]
async fn leaderboard_accumulates_defect_credit_and_reviewer_agreement() {
    let store = store().await;
    store.register_agent(&agent("team-coder001")).await.unwrap();
    store.register_agent(&agent("team-reviewer001")).await.unwrap();
    store.upsert_task(&task("t1")).await.unwrap();
    let assignment =
        store.create_assignment(&TaskId::new("t1"), &AgentId::new("team-coder001"), AssignmentKind::Implementation, None).await.unwrap();
    let board_id = store.create_review_board(assignment.id, 1, 2, RiskLevel::Low).await.unwrap();

    store
        .submit_defect(&Defect {
            id: 0,
            board_id,
            reporter: AgentId::new("team-reviewer001"),
            category: DefectCategory::Style,
            severity: DefectSeverity::Low,
            title: "nit".into(),
            description: "".into(),
            file_path: None,
            line_range: None,
            suggested_fix: None,
        })
        .await
        .unwrap();
    store
        .record_reviewer_vote(&ReviewerVote {
            board_id,
            reviewer: AgentId::new("team-reviewer001"),
            approved: true,
            confidence: 80,
            defects_found: 1,
            tokens_used: 10,
        })
        .await
        .unwrap();
    store.finalize_board(board_id, false).await.unwrap();

    let board = store.get_review_board(board_id).await.unwrap().unwrap();
    assert_eq!(board.verdict, Some(ReviewVerdict::Approved));

    let leaderboard = store.leaderboard().await.unwrap();
    let reviewer_entry = leaderboard.iter().find(|e| e.agent_id == AgentId::new("team-reviewer001")).unwrap();
    assert_eq!(reviewer_entry.defects_reported, 1);
    assert_eq!(reviewer_entry.reviews_completed, 1);
    assert!((reviewer_entry.average_reviewer_agreement - 1.0).abs() < f64::EPSILON);
}
