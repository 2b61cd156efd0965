use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::*;
use crate::task::TaskStatus;

struct FlakySource {
    name: &'static str,
    fail: bool,
    tasks: Vec<Task>,
}

#[async_trait]
impl TaskSource for FlakySource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch_pending(&self) -> Result<Vec<Task>, KernelError> {
        if self.fail {
            Err(KernelError::tool_error("source unavailable"))
        } else {
            Ok(self.tasks.clone())
        }
    }

    async fn claim(&self, _task_id: &TaskId, _agent_id: &AgentId) -> Result<(), KernelError> {
        Ok(())
    }

    async fn complete(&self, _task_id: &TaskId, _result: &str) -> Result<(), KernelError> {
        Ok(())
    }
}

fn task(id: &str, priority: u32, source: &str) -> Task {
    Task {
        task_id: TaskId::new(id),
        title: id.to_owned(),
        description: String::new(),
        priority,
        status: TaskStatus::Pending,
        origin_source: source.to_owned(),
        repo_reference: None,
        requirements: vec![],
        created_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn one_failing_source_does_not_suppress_others() {
    let good = Arc::new(FlakySource { name: "good", fail: false, tasks: vec![task("t1", 1, "good")] });
    let bad = Arc::new(FlakySource { name: "bad", fail: true, tasks: vec![] });
    let broker = TaskBroker::new(vec![good, bad]);

    let tasks = broker.fetch_pending().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_id.as_str(), "t1");
}

#[tokio::test]
async fn merged_results_are_priority_first_source_stable_on_ties() {
    let a = Arc::new(FlakySource { name: "a", fail: false, tasks: vec![task("a2", 2, "a"), task("a1", 1, "a")] });
    let b = Arc::new(FlakySource { name: "b", fail: false, tasks: vec![task("b1", 1, "b")] });
    let broker = TaskBroker::new(vec![a, b]);

    let tasks = broker.fetch_pending().await;
    let ids: Vec<&str> = tasks.iter().map(|t| t.task_id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "b1", "a2"]);
}

#[tokio::test]
async fn claim_routes_back_to_the_originating_source() {
    let claimed = Arc::new(AtomicBool::new(false));

    struct Tracking {
        claimed: Arc<AtomicBool>,
    }
    #[async_trait]
    impl TaskSource for Tracking {
        fn name(&self) -> &str {
            "tracking"
        }
        async fn fetch_pending(&self) -> Result<Vec<Task>, KernelError> {
            Ok(vec![task("only", 1, "tracking")])
        }
        async fn claim(&self, _task_id: &TaskId, _agent_id: &AgentId) -> Result<(), KernelError> {
            self.claimed.store(true, Ordering::SeqCst);
            Ok(())
        }
        async fn complete(&self, _task_id: &TaskId, _result: &str) -> Result<(), KernelError> {
            Ok(())
        }
    }

    let broker = TaskBroker::new(vec![Arc::new(Tracking { claimed: Arc::clone(&claimed) })]);
    broker.fetch_pending().await;
    broker.claim(&TaskId::new("only"), &AgentId::new("team-coder001")).await.unwrap();

    assert!(claimed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn claim_on_unknown_task_id_is_an_error() {
    let broker = TaskBroker::new(vec![]);
    let result = broker.claim(&TaskId::new("ghost"), &AgentId::new("team-coder001")).await;
    assert!(result.is_err());
}
