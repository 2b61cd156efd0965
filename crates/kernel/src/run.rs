// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level process runner — wires every component into a [`Core`],
//! starts the background loops, and serves the MCP HTTP surface until
//! shutdown.

use std::sync::{Arc, Once};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::broker::{HttpPollSource, StaticFileSource, TaskBroker, TaskSource};
use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::event_bus::EventBus;
use crate::presence::PresenceTracker;
use crate::spawner::{Spawner, WeztermPaneController};
use crate::state::{AppState, Core};
use crate::store::Store;
use crate::tools::build_registry;
use crate::transport::build_router;

/// Initialize tracing from config. Uses `try_init` so it is safe to call
/// more than once, e.g. from integration tests that build their own
/// [`Core`] without going through [`run`].
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider rustls needs before any `reqwest`
/// client is built — the workspace depends on `reqwest` with
/// `rustls-no-provider`, so a process-wide default must be installed once
/// before the task broker's `HttpPollSource` can make its first request.
/// Safe to call more than once; only the first call has effect.
fn ensure_crypto_provider() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

fn build_task_sources(config: &Config) -> Vec<Arc<dyn TaskSource>> {
    let mut sources: Vec<Arc<dyn TaskSource>> = Vec::new();

    if let Some(ref path) = config.task_file {
        sources.push(Arc::new(StaticFileSource::new("task-file", path.clone())));
    }

    for (index, url) in config.task_source_urls.iter().enumerate() {
        sources.push(Arc::new(HttpPollSource::new(format!("task-source-{index}"), url.clone())));
    }

    sources
}

/// Build a fully wired [`Core`] without starting the HTTP server or any
/// background loops. Used by [`run`] and by integration tests that want
/// the real wiring against a temporary store.
pub async fn build_core(config: Config) -> anyhow::Result<Arc<Core>> {
    ensure_crypto_provider();

    let store = if config.db_path == ":memory:" {
        Arc::new(Store::open_in_memory().await?)
    } else {
        Arc::new(Store::open(&config.db_path).await?)
    };

    let connections = Arc::new(ConnectionManager::new());
    let presence = Arc::new(PresenceTracker::new());
    let events = Arc::new(EventBus::new());
    let controller = Arc::new(WeztermPaneController::new(config.wezterm_bin.clone()));
    let spawner = Arc::new(
        Spawner::new(controller, Arc::clone(&store), Arc::clone(&presence))
            .with_nats_client_id(config.nats_client_id.clone()),
    );
    let broker = Arc::new(TaskBroker::new(build_task_sources(&config)));
    let shutdown = CancellationToken::new();

    // Presence owns the two-phase pending/connected/stopped state machine;
    // the Connection Manager only knows about transport-level connect and
    // disconnect, so it defers to Presence on both transitions.
    {
        let presence = Arc::clone(&presence);
        connections
            .on_connect(move |agent_id| {
                let presence = Arc::clone(&presence);
                let agent_id = agent_id.clone();
                tokio::spawn(async move {
                    if let Err(e) = presence.mark_connected(&agent_id).await {
                        error!(agent_id = %agent_id, error = %e, "failed to mark agent connected");
                    }
                });
            })
            .await;
    }
    {
        let presence = Arc::clone(&presence);
        connections
            .on_disconnect(move |agent_id| {
                let presence = Arc::clone(&presence);
                let agent_id = agent_id.clone();
                tokio::spawn(async move {
                    presence.mark_stopped(&agent_id).await;
                });
            })
            .await;
    }

    Ok(Arc::new(Core { store, connections, presence, events, spawner, broker, config, shutdown }))
}

/// Run the kernel to completion: build the `Core`, spawn the background
/// loops, serve the MCP HTTP surface, and block until a shutdown signal
/// fires the `CancellationToken`.
pub async fn run(config: Config) -> anyhow::Result<()> {
    init_tracing(&config);

    let core = build_core(config).await?;
    let registry = build_registry(Arc::clone(&core));
    let state = AppState::new(Arc::clone(&core), registry);

    // Background loops: connection reaper (idle session cleanup), presence
    // sweeper (pending/connected timeout demotion), task broker poll.
    tokio::spawn(Arc::clone(&core.connections).run_reaper(core.shutdown.clone()));
    tokio::spawn(Arc::clone(&core.presence).run_sweeper(core.shutdown.clone()));
    {
        let broker = Arc::clone(&core.broker);
        let interval = Duration::from_secs(core.config.task_poll_seconds);
        let shutdown = core.shutdown.clone();
        tokio::spawn(broker.run_poll_loop(interval, shutdown));
    }

    let router = build_router(state);
    let addr = format!("{}:{}", core.config.host, core.config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("MCP transport listening on {}", listener.local_addr()?);

    {
        let shutdown = core.shutdown.clone();
        tokio::spawn(async move {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
            let mut sigint =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

            tokio::select! {
                _ = async {
                    if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
                } => info!("received SIGTERM"),
                _ = async {
                    if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
                } => info!("received SIGINT"),
            }
            shutdown.cancel();
        });
    }

    let shutdown = core.shutdown.clone();
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    core.connections.shutdown().await;
    Ok(())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
