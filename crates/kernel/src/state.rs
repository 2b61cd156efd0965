// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate of every long-lived component the transport layer needs a
//! handle to. Named `Core` rather than `Store` to avoid colliding with
//! the persistence façade at [`crate::store::Store`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::broker::TaskBroker;
use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::dispatcher::ToolRegistry;
use crate::event_bus::EventBus;
use crate::presence::PresenceTracker;
use crate::spawner::Spawner;
use crate::store::Store;

/// Every component a tool handler or transport route might need, minus
/// the tool registry itself (which closes over an `Arc<Core>`, so it
/// cannot live inside the struct it captures).
pub struct Core {
    pub store: Arc<Store>,
    pub connections: Arc<ConnectionManager>,
    pub presence: Arc<PresenceTracker>,
    pub events: Arc<EventBus>,
    pub spawner: Arc<Spawner>,
    pub broker: Arc<TaskBroker>,
    pub config: Config,
    pub shutdown: CancellationToken,
}

/// The axum router's shared state: the wired-up `Core` plus the tool
/// registry built from it.
pub struct AppState {
    pub core: Arc<Core>,
    pub registry: ToolRegistry,
}

impl AppState {
    pub fn new(core: Arc<Core>, registry: ToolRegistry) -> Arc<Self> {
        Arc::new(Self { core, registry })
    }
}
