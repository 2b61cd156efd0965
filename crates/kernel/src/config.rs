// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// Multi-agent orchestration kernel for terminal-based AI coding agents.
#[derive(Debug, Parser)]
#[command(name = "cliaimonitor", version, about)]
pub struct Config {
    /// HTTP port the MCP transport listens on.
    #[arg(long, env = "CLIAIMONITOR_PORT", default_value = "7420")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "CLIAIMONITOR_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Path to the embedded SQLite store. `:memory:` is accepted for
    /// ephemeral runs but loses all state on restart.
    #[arg(long, env = "CLIAIMONITOR_DB_PATH", default_value = "cliaimonitor.sqlite3")]
    pub db_path: String,

    /// `wezterm` binary used by the Spawner's `wezterm cli` invocations.
    #[arg(long, env = "CLIAIMONITOR_WEZTERM_BIN", default_value = "wezterm")]
    pub wezterm_bin: String,

    /// Path to a static JSON task file, polled as one [`crate::broker::TaskSource`].
    #[arg(long, env = "CLIAIMONITOR_TASK_FILE")]
    pub task_file: Option<PathBuf>,

    /// Base URLs of HTTP task sources, each polled as its own
    /// [`crate::broker::TaskSource`]. May be repeated or comma-separated.
    #[arg(long = "task-source-url", env = "CLIAIMONITOR_TASK_SOURCE_URLS", value_delimiter = ',')]
    pub task_source_urls: Vec<String>,

    /// Interval in seconds between task broker poll rounds.
    #[arg(long, env = "CLIAIMONITOR_TASK_POLL_SECONDS", default_value = "30")]
    pub task_poll_seconds: u64,

    /// Log format (json or text).
    #[arg(long, env = "CLIAIMONITOR_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CLIAIMONITOR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Secondary messaging identity forwarded to spawned child processes,
    /// if set.
    #[arg(long, env = "NATS_CLIENT_ID")]
    pub nats_client_id: Option<String>,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.db_path.trim().is_empty() {
            anyhow::bail!("--db-path must not be empty");
        }
        if self.task_poll_seconds == 0 {
            anyhow::bail!("--task-poll-seconds must be greater than zero");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other} (expected json or text)"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
