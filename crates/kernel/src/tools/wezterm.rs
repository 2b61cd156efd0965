// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct terminal-multiplexer control tools, exposing the [`crate::spawner::Spawner`]'s
//! [`crate::spawner::PaneController`] capabilities to agents. `wezterm_spawn_pane` is distinct from the
//! captain-only `SpawnAgent` operation: it opens a bare pane
//! with no boot command, for an agent that wants a scratch terminal.

use std::sync::Arc;

use serde::Deserialize;

use crate::dispatcher::{ToolParam, ToolRegistryBuilder};
use crate::error::KernelError;
use crate::state::Core;

use super::args::decode;

#[derive(Debug, Deserialize)]
struct WeztermSpawnPaneArgs {
    cwd: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WeztermSendTextArgs {
    pane_id: i64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WeztermClosePaneArgs {
    pane_id: i64,
}

#[derive(Debug, Deserialize)]
struct WeztermClosePanesArgs {
    pane_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct WeztermFocusPaneArgs {
    pane_id: i64,
}

#[derive(Debug, Deserialize)]
struct WeztermGetTextArgs {
    pane_id: i64,
}

pub fn register(mut builder: ToolRegistryBuilder, core: Arc<Core>) -> ToolRegistryBuilder {
    {
        let core = core.clone();
        builder = builder.register(
            "wezterm_spawn_pane",
            "Open a new bare pane in the host terminal multiplexer.",
            vec![
                ToolParam { name: "cwd", ty: "string", required: true },
                ToolParam { name: "title", ty: "string", required: false },
            ],
            move |agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: WeztermSpawnPaneArgs = decode(args)?;
                    let title = parsed.title.unwrap_or_else(|| agent_id.to_string());
                    let (pane_id, pid) = core.spawner.pane_controller().spawn_pane(&parsed.cwd, &title).await?;
                    Ok(serde_json::json!({ "pane_id": pane_id, "pid": pid }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "wezterm_list_panes",
            "List every pane the host terminal multiplexer currently tracks.",
            vec![],
            move |_agent_id, _args| {
                let core = core.clone();
                async move {
                    let panes = core.spawner.list_panes().await?;
                    serde_json::to_value(panes).map_err(|e| KernelError::tool_error(e.to_string()))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "wezterm_send_text",
            "Send raw text (no bracketed paste) to a pane.",
            vec![
                ToolParam { name: "pane_id", ty: "number", required: true },
                ToolParam { name: "text", ty: "string", required: true },
            ],
            move |_agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: WeztermSendTextArgs = decode(args)?;
                    core.spawner.send_text(parsed.pane_id, &parsed.text).await?;
                    Ok(serde_json::json!({ "sent": true }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "wezterm_close_pane",
            "Gracefully kill a single pane (Ctrl-C, exit, delay, kill-pane).",
            vec![ToolParam { name: "pane_id", ty: "number", required: true }],
            move |_agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: WeztermClosePaneArgs = decode(args)?;
                    core.spawner.graceful_kill_pane(parsed.pane_id).await?;
                    Ok(serde_json::json!({ "closed": true }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "wezterm_close_panes",
            "Gracefully kill a batch of panes, spaced out so the host multiplexer is not hammered with concurrent kills.",
            vec![ToolParam { name: "pane_ids", ty: "array", required: true }],
            move |_agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: WeztermClosePanesArgs = decode(args)?;
                    let results = core.spawner.graceful_kill_panes(&parsed.pane_ids).await;
                    let failures: Vec<String> = results.into_iter().filter_map(|r| r.err().map(|e| e.message)).collect();
                    Ok(serde_json::json!({ "closed": parsed.pane_ids.len() - failures.len(), "failures": failures }))
                }
            },
        );
    }

    {
        let core = core.clone();
        builder = builder.register(
            "wezterm_focus_pane",
            "Bring a pane to the foreground.",
            vec![ToolParam { name: "pane_id", ty: "number", required: true }],
            move |_agent_id, args| {
                let core = core.clone();
                async move {
                    let parsed: WeztermFocusPaneArgs = decode(args)?;
                    core.spawner.focus_pane(parsed.pane_id).await?;
                    Ok(serde_json::json!({ "focused": true }))
                }
            },
        );
    }

    builder = builder.register(
        "wezterm_get_text",
        "Read the current visible text of a pane.",
        vec![ToolParam { name: "pane_id", ty: "number", required: true }],
        move |_agent_id, args| {
            let core = core.clone();
            async move {
                let parsed: WeztermGetTextArgs = decode(args)?;
                let text = core.spawner.get_text(parsed.pane_id).await?;
                Ok(serde_json::json!({ "text": text }))
            }
        },
    );

    builder
}
