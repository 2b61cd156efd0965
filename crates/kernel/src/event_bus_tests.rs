// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::EventPriority;

fn agent(s: &str) -> AgentId {
    AgentId::new(s)
}

fn new_task_event(source: &str, target: Option<&str>) -> Event {
    Event::new(
        EventType::NewTask,
        agent(source),
        target.map(agent),
        EventPriority::Normal,
        serde_json::json!({}),
    )
}

#[tokio::test]
async fn publish_delivers_to_live_subscriber_without_persisting() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe(agent("team-coder001"), vec![]).await;

    let published = bus.publish(new_task_event("team-captain001", Some("team-coder001"))).await;
    assert!(published.delivered);

    let received = rx.recv().await.expect("event delivered");
    assert_eq!(received.id, published.id);
    assert_eq!(bus.pending_count(&agent("team-coder001")).await, 0);
}

#[tokio::test]
async fn publish_persists_when_target_offline() {
    let bus = EventBus::new();
    let published = bus.publish(new_task_event("team-captain001", Some("team-coder001"))).await;
    assert!(!published.delivered);

    let pending = bus.get_pending_events(&agent("team-coder001"), &[]).await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, published.id);
}

#[tokio::test]
async fn mark_delivered_consumes_pending_event() {
    let bus = EventBus::new();
    let published = bus.publish(new_task_event("team-captain001", Some("team-coder001"))).await;

    assert!(bus.mark_delivered(&agent("team-coder001"), published.id).await);
    assert_eq!(bus.pending_count(&agent("team-coder001")).await, 0);
    assert!(!bus.mark_delivered(&agent("team-coder001"), published.id).await);
}

#[tokio::test]
async fn broadcast_reaches_every_subscriber_and_is_never_persisted() {
    let bus = EventBus::new();
    let mut rx1 = bus.subscribe(agent("team-coder001"), vec![]).await;
    let mut rx2 = bus.subscribe(agent("team-reviewer001"), vec![]).await;

    bus.publish(new_task_event("team-captain001", None)).await;

    assert!(rx1.recv().await.is_some());
    assert!(rx2.recv().await.is_some());
}

#[tokio::test]
async fn filter_excludes_non_matching_types() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe(agent("team-coder001"), vec![EventType::TaskCompleted]).await;

    bus.publish(new_task_event("team-captain001", Some("team-coder001"))).await;

    // No live subscriber matched the filter, so it must have been queued.
    let pending = bus.get_pending_events(&agent("team-coder001"), &[]).await;
    assert_eq!(pending.len(), 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn pending_store_evicts_oldest_when_full() {
    let bus = EventBus::new();
    let mut first_id = None;
    for i in 0..PENDING_STORE_CAP + 5 {
        let published = bus.publish(new_task_event("team-captain001", Some("team-coder001"))).await;
        if i == 0 {
            first_id = Some(published.id);
        }
    }
    assert_eq!(bus.pending_count(&agent("team-coder001")).await, PENDING_STORE_CAP);
    let pending = bus.get_pending_events(&agent("team-coder001"), &[]).await;
    assert!(!pending.iter().any(|e| Some(e.id) == first_id));
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    let bus = EventBus::new();
    bus.subscribe(agent("team-coder001"), vec![]).await;
    bus.unsubscribe(&agent("team-coder001")).await;
    bus.unsubscribe(&agent("team-coder001")).await;
}
