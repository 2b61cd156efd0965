// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::state::AppState;
use crate::test_support::test_core;
use crate::tools::build_registry;

use super::build_router;

async fn test_app() -> axum::Router {
    let core = test_core().await;
    let registry = build_registry(core.clone());
    build_router(AppState::new(core, registry))
}

#[tokio::test]
async fn healthz_requires_no_identity() -> anyhow::Result<()> {
    let app = test_app().await;
    let req = Request::builder().uri("/healthz").body(Body::empty())?;
    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn mcp_post_without_agent_id_is_unauthorized() -> anyhow::Result<()> {
    let app = test_app().await;
    let req = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}).to_string()))?;
    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn mcp_post_with_agent_id_dispatches_initialize() -> anyhow::Result<()> {
    let app = test_app().await;
    let req = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("x-agent-id", "team-coder001")
        .body(Body::from(serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}).to_string()))?;
    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["result"]["serverInfo"]["name"], "cliaimonitor");
    Ok(())
}
