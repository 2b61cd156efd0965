// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `cliaimonitor` binary and
//! exercise its one transport surface: `/healthz` and the MCP JSON-RPC
//! POST path.

use std::time::Duration;

use cliaimonitor_specs::{tool_call, KernelProcess};

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn healthz_reports_ok() -> anyhow::Result<()> {
    let kernel = KernelProcess::start()?;
    kernel.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value = reqwest::get(format!("{}/healthz", kernel.base_url())).await?.json().await?;
    assert_eq!(resp["status"], "ok");

    Ok(())
}

#[tokio::test]
async fn missing_agent_id_is_rejected() -> anyhow::Result<()> {
    let kernel = KernelProcess::start()?;
    kernel.wait_healthy(TIMEOUT).await?;

    let resp = kernel
        .call_anonymous(serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await?;
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn initialize_reports_server_info() -> anyhow::Result<()> {
    let kernel = KernelProcess::start()?;
    kernel.wait_healthy(TIMEOUT).await?;

    let resp = kernel
        .call("team-coder001", serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}))
        .await?;

    assert_eq!(resp["result"]["serverInfo"]["name"], "cliaimonitor");
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");

    Ok(())
}

#[tokio::test]
async fn tools_list_contains_well_known_tools() -> anyhow::Result<()> {
    let kernel = KernelProcess::start()?;
    kernel.wait_healthy(TIMEOUT).await?;

    let resp = kernel
        .call("team-coder001", serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await?;

    let tools = resp["result"]["tools"].as_array().expect("tools array");
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();

    for expected in [
        "register_agent",
        "dispatch_task",
        "accept_assignment",
        "submit_for_review",
        "create_review_board",
        "record_reviewer_vote",
        "finalize_board",
        "wait_for_events",
        "wezterm_list_panes",
    ] {
        assert!(names.contains(&expected), "missing tool {expected} in {names:?}");
    }

    Ok(())
}

#[tokio::test]
async fn unknown_tool_returns_method_not_found() -> anyhow::Result<()> {
    let kernel = KernelProcess::start()?;
    kernel.wait_healthy(TIMEOUT).await?;

    let resp = kernel.call("team-coder001", tool_call(1, "not_a_real_tool", serde_json::json!({}))).await?;

    assert_eq!(resp["error"]["code"], -32601);

    Ok(())
}

#[tokio::test]
async fn register_agent_for_unknown_agent_is_a_tool_error() -> anyhow::Result<()> {
    let kernel = KernelProcess::start()?;
    kernel.wait_healthy(TIMEOUT).await?;

    // No Spawner ever created a pending row for this agent id, so
    // `register_agent` must fail rather than silently create one.
    let resp = kernel.call("team-coder999", tool_call(1, "register_agent", serde_json::json!({}))).await?;

    assert_eq!(resp["error"]["code"], -32000);

    Ok(())
}

#[tokio::test]
async fn wait_for_events_times_out_with_no_events() -> anyhow::Result<()> {
    let kernel = KernelProcess::start()?;
    kernel.wait_healthy(TIMEOUT).await?;

    let started = tokio::time::Instant::now();
    let resp = kernel
        .call("team-coder001", tool_call(1, "wait_for_events", serde_json::json!({"timeout_seconds": 1})))
        .await?;
    let elapsed = started.elapsed();

    let text = resp["result"]["content"][0]["text"].as_str().expect("text content");
    let payload: serde_json::Value = serde_json::from_str(text)?;
    assert_eq!(payload["status"], "timeout");
    // Must return within timeout + 1s wall-clock, not just eventually.
    assert!(elapsed < Duration::from_secs(2), "wait_for_events took {elapsed:?}");

    Ok(())
}

#[tokio::test]
async fn malformed_json_rpc_is_a_parse_error() -> anyhow::Result<()> {
    let kernel = KernelProcess::start()?;
    kernel.wait_healthy(TIMEOUT).await?;

    // A well-formed JSON value that is not a valid JSON-RPC request object
    // (missing the required "method" field).
    let resp = kernel.call("team-coder001", serde_json::json!({"jsonrpc": "2.0", "id": 1})).await?;

    assert_eq!(resp["error"]["code"], -32600);

    Ok(())
}
