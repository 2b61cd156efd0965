// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `cliaimonitor` binary as a subprocess, against an
//! ephemeral in-memory store, and exercises it over its one transport
//! surface: HTTP with an SSE stream and JSON-RPC POSTs.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Once;
use std::time::Duration;

use serde_json::Value;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times — only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to the compiled `cliaimonitor` binary.
pub fn kernel_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("cliaimonitor")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running `cliaimonitor` process that is killed on drop. Always bound
/// to an ephemeral port and an in-memory store, so parallel tests never
/// collide on a file or a socket.
pub struct KernelProcess {
    child: Child,
    port: u16,
}

impl KernelProcess {
    /// Spawn the kernel with an ephemeral port, an in-memory store, and no
    /// task sources. The `wezterm` binary is left at its default name and
    /// is never invoked by the scenarios this harness targets.
    pub fn start() -> anyhow::Result<Self> {
        ensure_crypto();
        let binary = kernel_binary();
        anyhow::ensure!(binary.exists(), "cliaimonitor binary not found at {}", binary.display());

        let port = free_port()?;
        let child = Command::new(&binary)
            .args([
                "--port",
                &port.to_string(),
                "--host",
                "127.0.0.1",
                "--db-path",
                ":memory:",
                "--log-format",
                "text",
                "--log-level",
                "warn",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child, port })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Poll `/healthz` until it answers or `timeout` elapses.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let client = reqwest::Client::new();
        let url = format!("{}/healthz", self.base_url());
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("cliaimonitor did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// POST one JSON-RPC frame to `/mcp` with the given agent identity,
    /// returning the decoded response body.
    pub async fn call(&self, agent_id: &str, frame: Value) -> anyhow::Result<Value> {
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}/mcp", self.base_url()))
            .header("X-Agent-ID", agent_id)
            .json(&frame)
            .send()
            .await?;
        Ok(resp.json().await?)
    }

    /// Same as [`Self::call`] but without any `X-Agent-ID` header, to
    /// exercise the identity-required rejection path.
    pub async fn call_anonymous(&self, frame: Value) -> anyhow::Result<reqwest::Response> {
        let client = reqwest::Client::new();
        Ok(client.post(format!("{}/mcp", self.base_url())).json(&frame).send().await?)
    }
}

impl Drop for KernelProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Build a `tools/call` JSON-RPC request frame.
pub fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments },
    })
}
