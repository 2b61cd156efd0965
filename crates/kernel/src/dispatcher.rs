// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 frame parsing and the `tools/call` dispatch path.
//!
//! Hand-rolled request/response/error envelopes rather than a
//! third-party JSON-RPC crate — the wire shape is small and fixed enough
//! that a generic RPC crate would buy little.

use std::future::Future;
use std::pin::Pin;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::agent::AgentId;
use crate::error::{ErrorCode, KernelError, RpcErrorBody};

/// A single JSON-RPC 2.0 request frame.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// A single JSON-RPC 2.0 response frame. Exactly one of `result`/`error`
/// is ever present.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    pub fn err(id: Value, error: &KernelError) -> Self {
        Self { jsonrpc: "2.0", id, result: None, error: Some(error.into()) }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({"jsonrpc": "2.0", "id": Value::Null, "error": {"code": -32603, "message": "internal"}})
        })
    }
}

/// One declared parameter of a registered tool, for `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolParam {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: &'static str,
    pub required: bool,
}

pub type ToolOutput = Result<Value, KernelError>;
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolOutput> + Send>>;
pub type ToolHandler = Box<dyn Fn(AgentId, Value) -> ToolFuture + Send + Sync>;

/// One registered tool: its declared schema plus the closure that serves
/// `tools/call`. Handlers receive the identity the transport established,
/// never a caller-supplied `agent_id` in the payload.
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ToolParam>,
    handler: ToolHandler,
}

/// Append-only name→definition map, built once at startup and read
/// lock-free thereafter. Insertion-ordered so `tools/list`
/// returns a stable, human-meaningful ordering.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<&'static str, ToolDef>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder { tools: IndexMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.tools.get(name)
    }

    pub fn list(&self) -> Vec<&ToolDef> {
        self.tools.values().collect()
    }
}

pub struct ToolRegistryBuilder {
    tools: IndexMap<&'static str, ToolDef>,
}

impl ToolRegistryBuilder {
    /// Register a tool. Panics on a duplicate name — a programmer error at
    /// startup, never reachable once the registry is built (the registry
    /// itself offers no "remove" or "replace" operation).
    pub fn register<F, Fut>(mut self, name: &'static str, description: &'static str, params: Vec<ToolParam>, handler: F) -> Self
    where
        F: Fn(AgentId, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolOutput> + Send + 'static,
    {
        let boxed: ToolHandler = Box::new(move |agent_id, args| Box::pin(handler(agent_id, args)));
        let previous = self.tools.insert(name, ToolDef { name, description, params, handler: boxed });
        assert!(previous.is_none(), "duplicate tool registration: {name}");
        self
    }

    pub fn build(self) -> ToolRegistry {
        ToolRegistry { tools: self.tools }
    }
}

/// Optional callback consulted after a successful tool call: when it
/// reports `true`, the result envelope gains `_shutdown_requested: true`
/// so the agent can exit cooperatively.
pub type ShutdownChecker = Box<dyn Fn(&AgentId) -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

/// Hook fired once per `tools/call`, before the handler runs — metrics and
/// the presence tracker's liveness bump both hang off this.
pub type ToolCalledHook = Box<dyn Fn(&AgentId, &str) + Send + Sync>;

/// Dispatch one JSON-RPC frame for `agent_id` (the identity the transport
/// established). Never panics on malformed input: every failure mode
/// becomes a well-formed JSON-RPC error response.
pub async fn dispatch(
    registry: &ToolRegistry,
    agent_id: &AgentId,
    frame: Value,
    on_tool_called: &ToolCalledHook,
    shutdown_checker: &ShutdownChecker,
) -> Value {
    let request: RpcRequest = match serde_json::from_value(frame) {
        Ok(r) => r,
        Err(e) => {
            let err = KernelError::new(ErrorCode::InvalidRequest, format!("malformed JSON-RPC request: {e}"));
            return RpcResponse::err(Value::Null, &err).to_value();
        }
    };

    let id = request.id.clone();

    match request.method.as_str() {
        "initialize" => RpcResponse::ok(
            id,
            serde_json::json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": { "name": "cliaimonitor", "version": env!("CARGO_PKG_VERSION") },
                "capabilities": { "tools": {} },
            }),
        )
        .to_value(),

        "tools/list" => {
            let tools: Vec<Value> = registry
                .list()
                .into_iter()
                .map(|t| {
                    let properties: serde_json::Map<String, Value> = t
                        .params
                        .iter()
                        .map(|p| (p.name.to_owned(), serde_json::json!({ "type": p.ty })))
                        .collect();
                    let required: Vec<&str> = t.params.iter().filter(|p| p.required).map(|p| p.name).collect();
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "inputSchema": { "type": "object", "properties": properties, "required": required },
                    })
                })
                .collect();
            RpcResponse::ok(id, serde_json::json!({ "tools": tools })).to_value()
        }

        "tools/call" => handle_tools_call(registry, agent_id, id, request.params, on_tool_called, shutdown_checker).await,

        other => {
            warn!(method = other, "unknown JSON-RPC method");
            let err = KernelError::new(ErrorCode::MethodNotFound, format!("unknown method {other}"));
            RpcResponse::err(id, &err).to_value()
        }
    }
}

async fn handle_tools_call(
    registry: &ToolRegistry,
    agent_id: &AgentId,
    id: Value,
    params: Value,
    on_tool_called: &ToolCalledHook,
    shutdown_checker: &ShutdownChecker,
) -> Value {
    let name = match params.get("name").and_then(Value::as_str) {
        Some(n) => n.to_owned(),
        None => {
            let err = KernelError::new(ErrorCode::InvalidParams, "tools/call requires a string \"name\"");
            return RpcResponse::err(id, &err).to_value();
        }
    };
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Object(Default::default()));

    let Some(tool) = registry.get(&name) else {
        let err = KernelError::new(ErrorCode::MethodNotFound, format!("unknown tool {name}"));
        return RpcResponse::err(id, &err).to_value();
    };

    // Side effect fires before the handler runs: this
    // is the presence tracker's liveness proxy, so it must not depend on
    // the handler's outcome.
    on_tool_called(agent_id, &name);
    info!(agent_id = %agent_id, tool = %name, "tool_called");

    match (tool.handler)(agent_id.clone(), arguments).await {
        Ok(result) => {
            let mut envelope = serde_json::json!({
                "content": [ { "type": "text", "text": serde_json::to_string(&result).unwrap_or_default() } ],
            });
            if shutdown_checker(agent_id).await {
                envelope["_shutdown_requested"] = Value::Bool(true);
            }
            RpcResponse::ok(id, envelope).to_value()
        }
        Err(e) => {
            let err = KernelError::new(ErrorCode::ToolError, e.message.clone());
            RpcResponse::err(id, &err).to_value()
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
