// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task sources implement a uniform interface; the broker fans
//! `fetch_pending` across all configured sources concurrently, with
//! per-source error isolation, and routes `claim`/`complete` back to the
//! task's origin source. Scheduling is priority-first, source-stable on
//! ties; the broker does not itself decide assignment.
//!
//! A `Semaphore`-bounded `tokio::spawn` fan-out collects a `Result` per
//! source, so one slow or failing source never blocks or suppresses the
//! others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::agent::AgentId;
use crate::error::KernelError;
use crate::task::{Task, TaskId};

/// Bounds how many sources are polled concurrently.
const MAX_CONCURRENT_SOURCES: usize = 10;

/// A uniform task feed a deployment can plug in: a static file, an HTTP
/// endpoint, a ticket tracker, etc.
#[async_trait]
pub trait TaskSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_pending(&self) -> Result<Vec<Task>, KernelError>;
    async fn claim(&self, task_id: &TaskId, agent_id: &AgentId) -> Result<(), KernelError>;
    async fn complete(&self, task_id: &TaskId, result: &str) -> Result<(), KernelError>;
}

/// Fans `fetch_pending` out across every configured source in parallel
/// with per-source error isolation, and remembers which source minted
/// each `TaskId` so `claim`/`complete` can be routed back correctly.
pub struct TaskBroker {
    sources: Vec<Arc<dyn TaskSource>>,
    origins: tokio::sync::RwLock<HashMap<TaskId, usize>>,
}

impl TaskBroker {
    pub fn new(sources: Vec<Arc<dyn TaskSource>>) -> Self {
        Self { sources, origins: tokio::sync::RwLock::new(HashMap::new()) }
    }

    /// Merge `fetch_pending` results from every source, priority-first and
    /// source-stable on ties (`Task::schedule_key`). One source erroring
    /// does not suppress the others' results.
    pub async fn fetch_pending(&self) -> Vec<Task> {
        if self.sources.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_SOURCES));
        let mut handles = Vec::with_capacity(self.sources.len());

        for (index, source) in self.sources.iter().cloned().enumerate() {
            let sem = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await;
                let result = source.fetch_pending().await;
                (index, source.name().to_owned(), result)
            }));
        }

        let mut merged = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((index, name, Ok(tasks))) => {
                    let mut origins = self.origins.write().await;
                    for task in &tasks {
                        origins.insert(task.task_id.clone(), index);
                    }
                    merged.extend(tasks);
                }
                Ok((_, name, Err(e))) => {
                    warn!(source = name.as_str(), error = %e, "task source fetch_pending failed, skipping");
                }
                Err(e) => {
                    error!("task source fetch_pending task panicked: {e}");
                }
            }
        }

        merged.sort_by(|a, b| a.schedule_key().cmp(&b.schedule_key()));
        merged
    }

    pub async fn claim(&self, task_id: &TaskId, agent_id: &AgentId) -> Result<(), KernelError> {
        let source = self.origin_source(task_id).await?;
        source.claim(task_id, agent_id).await
    }

    pub async fn complete(&self, task_id: &TaskId, result: &str) -> Result<(), KernelError> {
        let source = self.origin_source(task_id).await?;
        source.complete(task_id, result).await
    }

    async fn origin_source(&self, task_id: &TaskId) -> Result<Arc<dyn TaskSource>, KernelError> {
        let index = *self
            .origins
            .read()
            .await
            .get(task_id)
            .ok_or_else(|| KernelError::tool_error(format!("unknown task origin for {task_id}")))?;
        self.sources.get(index).cloned().ok_or_else(|| KernelError::tool_error(format!("stale task origin index for {task_id}")))
    }

    /// Background poll loop: re-fetch on `interval`, logging but never
    /// panicking on a failed round.
    pub async fn run_poll_loop(self: Arc<Self>, interval: Duration, shutdown: tokio_util::sync::CancellationToken) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.cancelled() => {
                    debug!("task broker poll loop shutting down");
                    return;
                }
            }
            let tasks = self.fetch_pending().await;
            debug!(count = tasks.len(), "task broker poll round complete");
        }
    }
}

/// Reads a static JSON array of tasks from disk on every `fetch_pending`
/// call — a deployment with no live ticket tracker just edits the file.
pub struct StaticFileSource {
    name: String,
    path: std::path::PathBuf,
}

impl StaticFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<std::path::PathBuf>) -> Self {
        Self { name: name.into(), path: path.into() }
    }
}

#[async_trait]
impl TaskSource for StaticFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_pending(&self) -> Result<Vec<Task>, KernelError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| KernelError::tool_error(format!("reading {}: {e}", self.path.display())))?;
        let tasks: Vec<Task> = serde_json::from_str(&contents)
            .map_err(|e| KernelError::tool_error(format!("parsing {}: {e}", self.path.display())))?;
        Ok(tasks.into_iter().filter(|t| t.status == crate::task::TaskStatus::Pending).collect())
    }

    async fn claim(&self, _task_id: &TaskId, _agent_id: &AgentId) -> Result<(), KernelError> {
        // A flat file has no remote state to update; claim/complete are
        // reflected only in the Store's own assignment rows.
        Ok(())
    }

    async fn complete(&self, _task_id: &TaskId, _result: &str) -> Result<(), KernelError> {
        Ok(())
    }
}

/// Polls a configurable URL returning the same JSON task array shape as
/// [`StaticFileSource`], and posts claim/complete back to sibling
/// endpoints on that same host.
pub struct HttpPollSource {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpPollSource {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl TaskSource for HttpPollSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_pending(&self) -> Result<Vec<Task>, KernelError> {
        let url = format!("{}/tasks/pending", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| KernelError::tool_error(format!("GET {url}: {e}")))?
            .error_for_status()
            .map_err(|e| KernelError::tool_error(format!("GET {url}: {e}")))?;
        response.json().await.map_err(|e| KernelError::tool_error(format!("decoding {url}: {e}")))
    }

    async fn claim(&self, task_id: &TaskId, agent_id: &AgentId) -> Result<(), KernelError> {
        let url = format!("{}/tasks/{}/claim", self.base_url.trim_end_matches('/'), task_id.as_str());
        self.client
            .post(&url)
            .json(&serde_json::json!({ "agent_id": agent_id.as_str() }))
            .send()
            .await
            .map_err(|e| KernelError::tool_error(format!("POST {url}: {e}")))?
            .error_for_status()
            .map_err(|e| KernelError::tool_error(format!("POST {url}: {e}")))?;
        Ok(())
    }

    async fn complete(&self, task_id: &TaskId, result: &str) -> Result<(), KernelError> {
        let url = format!("{}/tasks/{}/complete", self.base_url.trim_end_matches('/'), task_id.as_str());
        self.client
            .post(&url)
            .json(&serde_json::json!({ "result": result }))
            .send()
            .await
            .map_err(|e| KernelError::tool_error(format!("POST {url}: {e}")))?
            .error_for_status()
            .map_err(|e| KernelError::tool_error(format!("POST {url}: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
