// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Creates a pane in the host terminal multiplexer for each agent, seeds
//! its environment, and provides a graceful termination path that cannot
//! deadlock the host terminal.
//!
//! A directly-forked PTY (`nix::pty::forkpty`) would need `unsafe`, which
//! this workspace denies, and the target here is a pane inside an
//! already-running host multiplexer rather than a freestanding PTY
//! anyway. So the equivalent capability is expressed as a
//! [`PaneController`] trait shelled out to the `wezterm cli` binary via
//! [`tokio::process::Command`] — no `unsafe` required. The graceful-kill
//! ladder (Ctrl-C, `exit`, delay, `kill-pane`) generalizes the
//! SIGHUP-then-SIGKILL shape a PTY `Drop` impl would use into the
//! multi-step sequence a host multiplexer needs.

mod wezterm;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::agent::{Agent, AgentId, AgentIdGenerator, AgentRole};
use crate::error::KernelError;
use crate::presence::PresenceTracker;
use crate::store::Store;

pub use wezterm::WeztermPaneController;

/// A single pane entry as the host multiplexer reports it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PaneInfo {
    pub pane_id: i64,
    pub title: String,
    pub is_active: bool,
}

/// Abstraction over "the host terminal multiplexer": split,
/// list, send text to, and kill panes, plus set a pane's title. Exactly
/// the five capabilities the `wezterm_*` tool names expose.
#[async_trait]
pub trait PaneController: Send + Sync {
    async fn spawn_pane(&self, cwd: &str, title: &str) -> Result<(i64, Option<u32>), KernelError>;
    async fn list_panes(&self) -> Result<Vec<PaneInfo>, KernelError>;
    async fn send_text(&self, pane_id: i64, text: &str) -> Result<(), KernelError>;
    async fn kill_pane(&self, pane_id: i64) -> Result<(), KernelError>;
    async fn set_title(&self, pane_id: i64, title: &str) -> Result<(), KernelError>;
    async fn get_text(&self, pane_id: i64) -> Result<String, KernelError>;
    async fn focus_pane(&self, pane_id: i64) -> Result<(), KernelError>;
}

/// Test double: an in-memory pane table with no subprocess calls, for
/// tests that need a scripted controller instead of a real one.
#[derive(Default)]
pub struct FakePaneController {
    panes: Mutex<Vec<PaneInfo>>,
    next_id: std::sync::atomic::AtomicI64,
    sent: Mutex<Vec<(i64, String)>>,
}

impl FakePaneController {
    pub fn new() -> Self {
        Self { panes: Mutex::new(Vec::new()), next_id: std::sync::atomic::AtomicI64::new(1), sent: Mutex::new(Vec::new()) }
    }

    /// Every `(pane_id, text)` pair passed to `send_text`, in call order —
    /// lets tests assert on the exact boot command a pane received.
    pub async fn sent_text(&self) -> Vec<(i64, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PaneController for FakePaneController {
    async fn spawn_pane(&self, _cwd: &str, title: &str) -> Result<(i64, Option<u32>), KernelError> {
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.panes.lock().await.push(PaneInfo { pane_id: id, title: title.to_owned(), is_active: true });
        // Fake pid is deliberately above any real `pid_max` so tests that
        // exercise the OS-pid fallback kill never risk signaling a real
        // process on the host.
        Ok((id, Some(90_000_000 + id as u32)))
    }

    async fn list_panes(&self) -> Result<Vec<PaneInfo>, KernelError> {
        Ok(self.panes.lock().await.clone())
    }

    async fn send_text(&self, pane_id: i64, text: &str) -> Result<(), KernelError> {
        self.sent.lock().await.push((pane_id, text.to_owned()));
        let panes = self.panes.lock().await;
        if panes.iter().any(|p| p.pane_id == pane_id) {
            Ok(())
        } else {
            Err(KernelError::new(crate::error::ErrorCode::SpawnError, format!("no such pane {pane_id}")))
        }
    }

    async fn kill_pane(&self, pane_id: i64) -> Result<(), KernelError> {
        let mut panes = self.panes.lock().await;
        let before = panes.len();
        panes.retain(|p| p.pane_id != pane_id);
        if panes.len() == before {
            return Err(KernelError::new(crate::error::ErrorCode::SpawnError, format!("no such pane {pane_id}")));
        }
        Ok(())
    }

    async fn set_title(&self, pane_id: i64, title: &str) -> Result<(), KernelError> {
        let mut panes = self.panes.lock().await;
        match panes.iter_mut().find(|p| p.pane_id == pane_id) {
            Some(p) => {
                p.title = title.to_owned();
                Ok(())
            }
            None => Err(KernelError::new(crate::error::ErrorCode::SpawnError, format!("no such pane {pane_id}"))),
        }
    }

    async fn get_text(&self, pane_id: i64) -> Result<String, KernelError> {
        let panes = self.panes.lock().await;
        if panes.iter().any(|p| p.pane_id == pane_id) {
            Ok(String::new())
        } else {
            Err(KernelError::new(crate::error::ErrorCode::SpawnError, format!("no such pane {pane_id}")))
        }
    }

    async fn focus_pane(&self, pane_id: i64) -> Result<(), KernelError> {
        let mut panes = self.panes.lock().await;
        if !panes.iter().any(|p| p.pane_id == pane_id) {
            return Err(KernelError::new(crate::error::ErrorCode::SpawnError, format!("no such pane {pane_id}")));
        }
        for p in panes.iter_mut() {
            p.is_active = p.pane_id == pane_id;
        }
        Ok(())
    }
}

/// Send `SIGKILL` directly to a recorded OS pid — the first fallback step
/// when `kill-pane` itself fails (e.g. the multiplexer lost track of the
/// pane but the child process is still alive).
fn kill_by_pid(pid: u32) -> Result<(), KernelError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGKILL)
        .map_err(|e| KernelError::new(crate::error::ErrorCode::SpawnError, format!("kill(pid={pid}) failed: {e}")))
}

/// Minimum spacing `GracefulKillPanes` holds between consecutive kills, so
/// a batch teardown doesn't hammer the host multiplexer with concurrent
/// `kill-pane` calls.
const KILL_SPACING: Duration = Duration::from_millis(500);

/// Delay the ladder waits after sending `exit` before falling back to
/// `kill-pane`, giving a well-behaved child time to exit on its own.
const GRACE_DELAY: Duration = Duration::from_millis(800);

/// Creates panes, seeds their boot command, and owns the graceful-kill
/// ladder. The per-role id counter and the store/presence handles it
/// needs all sit behind one `Arc`, so a single `Spawner` can be shared
/// across every request handler.
pub struct Spawner {
    controller: Arc<dyn PaneController>,
    ids: AgentIdGenerator,
    store: Arc<Store>,
    presence: Arc<PresenceTracker>,
    nats_client_id: Option<String>,
}

impl Spawner {
    pub fn new(controller: Arc<dyn PaneController>, store: Arc<Store>, presence: Arc<PresenceTracker>) -> Self {
        Self { controller, ids: AgentIdGenerator::new(), store, presence, nats_client_id: None }
    }

    /// Set the `NATS_CLIENT_ID` forwarded to every subsequently spawned
    /// agent's pane environment (spec §6: "passed to spawned child
    /// processes if set by the server").
    pub fn with_nats_client_id(mut self, nats_client_id: Option<String>) -> Self {
        self.nats_client_id = nats_client_id;
        self
    }

    pub fn pane_controller(&self) -> Arc<dyn PaneController> {
        Arc::clone(&self.controller)
    }

    /// Allocate an id, split a pane, seed its boot command, and register
    /// the presence row as `pending`.
    pub async fn spawn_agent(
        &self,
        role: AgentRole,
        model: &str,
        project_path: &str,
        initial_prompt: &str,
    ) -> Result<Agent, KernelError> {
        let agent_id = self.ids.next(role);

        let (pane_id, pid) = self.controller.spawn_pane(project_path, agent_id.as_str()).await?;

        // Single CRLF-terminated line: title set + optional NATS identity
        // export + MCP handshake + agent invocation, sent with "no
        // bracketed paste" so the shell reads it as a typed command rather
        // than a pasted block.
        let nats_export = match &self.nats_client_id {
            Some(id) => format!("export NATS_CLIENT_ID={id:?}; "),
            None => String::new(),
        };
        let boot_command = format!(
            "echo -n | true; clear; printf '\\033]0;%s\\007' '{agent_id}'; {nats_export}{model} --agent-id {agent_id} --prompt {initial_prompt:?}\r\n"
        );
        self.controller.send_text(pane_id, &boot_command).await?;

        let mut agent = Agent::new(agent_id.clone(), role, model, project_path);
        agent.pane_id = Some(pane_id);
        agent.pid = pid;

        self.store.register_agent(&agent).await?;
        self.presence.register_pending(agent_id.clone()).await;

        info!(agent_id = %agent_id, pane_id, "spawned agent pane");
        Ok(agent)
    }

    /// Raise the shutdown flag, mark stopped in the store, then kill the
    /// pane. Preferred path is `kill-pane` by id; if that fails, fall
    /// through the fallback ladder in order: kill by OS pid, then kill by
    /// window title. Each step logs and continues to the next on failure
    /// rather than giving up.
    pub async fn stop_agent_with_reason(&self, agent_id: &AgentId, reason: &str) -> Result<(), KernelError> {
        self.store.set_shutdown_flag(agent_id).await?;
        self.presence.mark_stopped(agent_id).await;
        self.store.mark_stopped(agent_id, reason).await?;

        if let Some(agent) = self.store.get_agent(agent_id).await? {
            if let Some(pane_id) = agent.pane_id {
                if let Err(e) = self.graceful_kill_pane(pane_id).await {
                    warn!(agent_id = %agent_id, pane_id, error = %e, "kill-pane failed, falling back");
                    self.fallback_kill(agent_id, agent.pid).await;
                }
            } else {
                self.fallback_kill(agent_id, agent.pid).await;
            }
        }

        info!(agent_id = %agent_id, reason, "stopped agent");
        Ok(())
    }

    /// Fallback ladder after `kill-pane` fails or no pane id was on
    /// record: kill by OS process id, then by window title (the pane
    /// boot command titles the pane with the agent id, per
    /// `spawn_agent`). Every step is best-effort; failures are logged and
    /// the ladder moves on rather than propagating an error.
    async fn fallback_kill(&self, agent_id: &AgentId, pid: Option<u32>) {
        if let Some(pid) = pid {
            match kill_by_pid(pid) {
                Ok(()) => {
                    info!(agent_id = %agent_id, pid, "fallback kill by pid succeeded");
                    return;
                }
                Err(e) => warn!(agent_id = %agent_id, pid, error = %e, "fallback kill by pid failed"),
            }
        }

        match self.controller.list_panes().await {
            Ok(panes) => {
                if let Some(pane) = panes.iter().find(|p| p.title == agent_id.as_str()) {
                    if let Err(e) = self.controller.kill_pane(pane.pane_id).await {
                        warn!(agent_id = %agent_id, pane_id = pane.pane_id, error = %e, "fallback kill by window title failed");
                    }
                }
            }
            Err(e) => warn!(agent_id = %agent_id, error = %e, "fallback kill by window title could not list panes"),
        }
    }

    /// `GracefulKillPane(pane_id)`: Ctrl-C, `exit`, delay, then `kill-pane`
    /// — required on multiplexers that deadlock killing a pane whose
    /// child is still writing.
    pub async fn graceful_kill_pane(&self, pane_id: i64) -> Result<(), KernelError> {
        let ctrl_c = "\u{0003}";
        if let Err(e) = self.controller.send_text(pane_id, ctrl_c).await {
            warn!(pane_id, error = %e, "ctrl-c send failed, continuing kill ladder");
        }
        if let Err(e) = self.controller.send_text(pane_id, "exit\r\n").await {
            warn!(pane_id, error = %e, "exit send failed, continuing kill ladder");
        }
        tokio::time::sleep(GRACE_DELAY).await;
        self.controller.kill_pane(pane_id).await
    }

    /// Kills a batch of panes with `KILL_SPACING` between each, sleeping
    /// outside any lock.
    pub async fn graceful_kill_panes(&self, pane_ids: &[i64]) -> Vec<Result<(), KernelError>> {
        let mut results = Vec::with_capacity(pane_ids.len());
        for (i, pane_id) in pane_ids.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(KILL_SPACING).await;
            }
            results.push(self.graceful_kill_pane(*pane_id).await);
        }
        results
    }

    pub async fn list_panes(&self) -> Result<Vec<PaneInfo>, KernelError> {
        self.controller.list_panes().await
    }

    pub async fn send_text(&self, pane_id: i64, text: &str) -> Result<(), KernelError> {
        self.controller.send_text(pane_id, text).await
    }

    pub async fn set_title(&self, pane_id: i64, title: &str) -> Result<(), KernelError> {
        self.controller.set_title(pane_id, title).await
    }

    pub async fn get_text(&self, pane_id: i64) -> Result<String, KernelError> {
        self.controller.get_text(pane_id).await
    }

    pub async fn focus_pane(&self, pane_id: i64) -> Result<(), KernelError> {
        self.controller.focus_pane(pane_id).await
    }
}

#[cfg(test)]
#[path = "spawner_tests.rs"]
mod tests;
