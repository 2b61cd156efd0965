// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use super::{PaneController, PaneInfo};
use crate::error::{ErrorCode, KernelError};

/// Shells out to the `wezterm cli` subcommand family. No FFI, no PTY
/// forking — every call is a short-lived child process that talks to
/// the multiplexer's own CLI contract, rather than the direct
/// `forkpty` backend some PTY-spawning designs use.
pub struct WeztermPaneController {
    wezterm_bin: String,
}

impl WeztermPaneController {
    pub fn new(wezterm_bin: impl Into<String>) -> Self {
        Self { wezterm_bin: wezterm_bin.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<String, KernelError> {
        debug!(args = ?args, "wezterm cli invocation");
        let output = Command::new(&self.wezterm_bin)
            .arg("cli")
            .args(args)
            .output()
            .await
            .map_err(|e| KernelError::new(ErrorCode::SpawnError, format!("failed to run wezterm cli: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KernelError::new(ErrorCode::SpawnError, format!("wezterm cli {args:?} failed: {stderr}")));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Deserialize)]
struct WeztermPaneJson {
    pane_id: i64,
    title: String,
    is_active: bool,
}

#[async_trait]
impl PaneController for WeztermPaneController {
    async fn spawn_pane(&self, cwd: &str, title: &str) -> Result<(i64, Option<u32>), KernelError> {
        let stdout = self.run(&["spawn", "--cwd", cwd]).await?;
        let pane_id: i64 = stdout
            .trim()
            .parse()
            .map_err(|e| KernelError::new(ErrorCode::SpawnError, format!("unparseable pane id {stdout:?}: {e}")))?;
        self.set_title(pane_id, title).await?;
        Ok((pane_id, None))
    }

    async fn list_panes(&self) -> Result<Vec<PaneInfo>, KernelError> {
        let stdout = self.run(&["list", "--format", "json"]).await?;
        let raw: Vec<WeztermPaneJson> = serde_json::from_str(&stdout)
            .map_err(|e| KernelError::new(ErrorCode::SpawnError, format!("unparseable pane list: {e}")))?;
        Ok(raw.into_iter().map(|p| PaneInfo { pane_id: p.pane_id, title: p.title, is_active: p.is_active }).collect())
    }

    async fn send_text(&self, pane_id: i64, text: &str) -> Result<(), KernelError> {
        let pane_id = pane_id.to_string();
        self.run(&["send-text", "--no-paste", "--pane-id", &pane_id, text]).await?;
        Ok(())
    }

    async fn kill_pane(&self, pane_id: i64) -> Result<(), KernelError> {
        let pane_id = pane_id.to_string();
        self.run(&["kill-pane", "--pane-id", &pane_id]).await?;
        Ok(())
    }

    async fn set_title(&self, pane_id: i64, title: &str) -> Result<(), KernelError> {
        let pane_id = pane_id.to_string();
        self.run(&["set-tab-title", "--pane-id", &pane_id, title]).await?;
        Ok(())
    }

    async fn get_text(&self, pane_id: i64) -> Result<String, KernelError> {
        let pane_id = pane_id.to_string();
        self.run(&["get-text", "--pane-id", &pane_id]).await
    }

    async fn focus_pane(&self, pane_id: i64) -> Result<(), KernelError> {
        let pane_id = pane_id.to_string();
        self.run(&["activate-pane", "--pane-id", &pane_id]).await?;
        Ok(())
    }
}
