// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed set of well-known MCP tools agents call against.
//! Each submodule owns one cohesive slice and registers its handlers
//! through [`crate::dispatcher::ToolRegistryBuilder`]; [`build_registry`]
//! chains every submodule then builds the final append-only registry.

mod args;

mod activity;
mod assignments;
mod events;
mod registration;
mod review;
mod tasks;
mod wezterm;

use std::sync::Arc;

use crate::dispatcher::ToolRegistry;
use crate::state::Core;

pub fn build_registry(core: Arc<Core>) -> ToolRegistry {
    let builder = ToolRegistry::builder();
    let builder = registration::register(builder, core.clone());
    let builder = activity::register(builder, core.clone());
    let builder = tasks::register(builder, core.clone());
    let builder = assignments::register(builder, core.clone());
    let builder = review::register(builder, core.clone());
    let builder = events::register(builder, core.clone());
    let builder = wezterm::register(builder, core);
    builder.build()
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
