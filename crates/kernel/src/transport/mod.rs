// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Axum router assembly for the MCP surface. Thin by design: routing and
//! SSE framing only, the JSON-RPC semantics live in [`crate::dispatcher`].

pub mod auth;
pub mod http;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the axum `Router` serving `/healthz` plus the MCP surface: one
/// router, one set of layers, no per-route middleware stacks to keep in
/// sync.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(http::health))
        .route("/mcp", get(http::mcp_sse).post(http::mcp_direct))
        .route("/mcp/sse", get(http::mcp_sse))
        .route("/mcp/messages", post(http::mcp_messages))
        .layer(middleware::from_fn(auth::identity_layer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
