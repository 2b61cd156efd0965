use std::sync::Arc;

use super::*;
use crate::agent::AgentRole;

async fn harness() -> (Spawner, Arc<Store>, Arc<PresenceTracker>) {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    let presence = Arc::new(PresenceTracker::new());
    let controller: Arc<dyn PaneController> = Arc::new(FakePaneController::new());
    (Spawner::new(controller, Arc::clone(&store), Arc::clone(&presence)), store, presence)
}

#[tokio::test]
async fn spawn_agent_creates_pending_presence_and_store_row() {
    let (spawner, store, presence) = harness().await;

    let agent = spawner.spawn_agent(AgentRole::Coder, "claude-opus", "/repo", "start working").await.unwrap();

    assert_eq!(agent.agent_id.as_str(), "team-coder001");
    assert!(agent.pane_id.is_some());
    assert_eq!(presence.status(&agent.agent_id).await, Some(crate::agent::AgentStatus::Pending));

    let stored = store.get_agent(&agent.agent_id).await.unwrap().unwrap();
    assert_eq!(stored.status, crate::agent::AgentStatus::Pending);
}

#[tokio::test]
async fn successive_spawns_of_the_same_role_get_distinct_sequential_ids() {
    let (spawner, _store, _presence) = harness().await;

    let a = spawner.spawn_agent(AgentRole::Reviewer, "m", "/repo", "go").await.unwrap();
    let b = spawner.spawn_agent(AgentRole::Reviewer, "m", "/repo", "go").await.unwrap();

    assert_eq!(a.agent_id.as_str(), "team-reviewer001");
    assert_eq!(b.agent_id.as_str(), "team-reviewer002");
}

#[tokio::test]
async fn stop_agent_with_reason_kills_pane_and_sets_shutdown_flag() {
    let (spawner, store, presence) = harness().await;
    let agent = spawner.spawn_agent(AgentRole::Coder, "m", "/repo", "go").await.unwrap();

    spawner.stop_agent_with_reason(&agent.agent_id, "operator request").await.unwrap();

    assert_eq!(presence.status(&agent.agent_id).await, Some(crate::agent::AgentStatus::Stopped));
    assert!(store.check_shutdown_flag(&agent.agent_id).await.unwrap());

    let panes = spawner.list_panes().await.unwrap();
    assert!(panes.iter().all(|p| p.pane_id != agent.pane_id.unwrap()));
}

async fn harness_with_fake() -> (Spawner, Arc<FakePaneController>) {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    let presence = Arc::new(PresenceTracker::new());
    let fake = Arc::new(FakePaneController::new());
    let controller: Arc<dyn PaneController> = fake.clone();
    (Spawner::new(controller, store, presence), fake)
}

#[tokio::test]
async fn spawn_agent_omits_nats_export_when_unset() {
    let (spawner, fake) = harness_with_fake().await;

    spawner.spawn_agent(AgentRole::Coder, "m", "/repo", "go").await.unwrap();

    let sent = fake.sent_text().await;
    let boot = &sent.first().expect("boot command recorded").1;
    assert!(!boot.contains("NATS_CLIENT_ID"), "unexpected NATS export in {boot:?}");
}

#[tokio::test]
async fn spawn_agent_forwards_nats_client_id_into_the_boot_command() {
    let (spawner, fake) = harness_with_fake().await;
    let spawner = spawner.with_nats_client_id(Some("agent-7".to_string()));

    spawner.spawn_agent(AgentRole::Coder, "m", "/repo", "go").await.unwrap();

    let sent = fake.sent_text().await;
    let boot = &sent.first().expect("boot command recorded").1;
    assert!(boot.contains("export NATS_CLIENT_ID=\"agent-7\""), "missing NATS export in {boot:?}");
}

#[tokio::test]
async fn stop_agent_with_reason_falls_back_to_window_title_when_kill_pane_fails() {
    let (spawner, store, presence) = harness().await;
    let agent = spawner.spawn_agent(AgentRole::Coder, "m", "/repo", "go").await.unwrap();

    // Simulate the multiplexer losing track of the recorded pane id (e.g.
    // it was recreated) while the pane itself, titled with the agent id,
    // is still listed under a different id.
    let controller = spawner.pane_controller();
    controller.kill_pane(agent.pane_id.unwrap()).await.unwrap();
    let (new_pane_id, _) = controller.spawn_pane("/repo", agent.agent_id.as_str()).await.unwrap();

    spawner.stop_agent_with_reason(&agent.agent_id, "operator request").await.unwrap();

    assert_eq!(presence.status(&agent.agent_id).await, Some(crate::agent::AgentStatus::Stopped));
    assert!(store.check_shutdown_flag(&agent.agent_id).await.unwrap());
    let panes = spawner.list_panes().await.unwrap();
    assert!(panes.iter().all(|p| p.pane_id != new_pane_id));
}

#[tokio::test]
async fn graceful_kill_panes_kills_every_pane_in_the_batch() {
    let (spawner, _store, _presence) = harness().await;
    let controller = spawner.pane_controller();
    let (p1, _) = controller.spawn_pane("/repo", "one").await.unwrap();
    let (p2, _) = controller.spawn_pane("/repo", "two").await.unwrap();

    let results = spawner.graceful_kill_panes(&[p1, p2]).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let panes = spawner.list_panes().await.unwrap();
    assert!(panes.is_empty());
}
