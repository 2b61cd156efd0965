// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a minimal `Core` wired with an in-memory
//! store, no task sources, and the [`crate::spawner::FakePaneController`]
//! instead of a real `wezterm` binary. Every `_tests.rs` file builds its
//! own fakes for the thing it's actually testing (e.g. `RecordingTransport`
//! in `connection_tests.rs`); this module only covers the one piece every
//! dispatcher/tool test needs and would otherwise duplicate: a fully wired
//! `Core`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::broker::TaskBroker;
use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::event_bus::EventBus;
use crate::presence::PresenceTracker;
use crate::spawner::{FakePaneController, Spawner};
use crate::state::Core;
use crate::store::Store;

/// A `Config` with every field set to a value valid for an ephemeral test
/// run. No flag parsing involved — this is the struct clap would have
/// produced from an empty argv plus defaults.
pub fn test_config() -> Config {
    Config {
        port: 0,
        host: "127.0.0.1".to_owned(),
        db_path: ":memory:".to_owned(),
        wezterm_bin: "wezterm".to_owned(),
        task_file: None,
        task_source_urls: Vec::new(),
        task_poll_seconds: 30,
        log_format: "json".to_owned(),
        log_level: "info".to_owned(),
        nats_client_id: None,
    }
}

/// Build a `Core` over an in-memory store, a `FakePaneController`, and no
/// configured task sources. Callers that need a task source push one onto
/// the broker themselves (the broker's source list is fixed at
/// construction, so this helper can't retrofit one after the fact).
pub async fn test_core() -> Arc<Core> {
    let store = Arc::new(Store::open_in_memory().await.expect("open in-memory store"));
    let presence = Arc::new(PresenceTracker::new());
    let connections = Arc::new(ConnectionManager::new());
    let events = Arc::new(EventBus::new());
    let spawner = Arc::new(Spawner::new(Arc::new(FakePaneController::new()), store.clone(), presence.clone()));
    let broker = Arc::new(TaskBroker::new(Vec::new()));

    Arc::new(Core {
        store,
        connections,
        presence,
        events,
        spawner,
        broker,
        config: test_config(),
        shutdown: CancellationToken::new(),
    })
}
