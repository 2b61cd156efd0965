// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error codes shared across the JSON-RPC tool surface and the
/// handful of plain-HTTP endpoints (`/healthz`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// JSON-RPC: malformed frame that is not even valid JSON.
    ParseError,
    /// JSON-RPC: frame is valid JSON but not a valid request object.
    InvalidRequest,
    /// JSON-RPC: `method` is not `initialize`/`tools/list`/`tools/call`.
    MethodNotFound,
    /// JSON-RPC: `params`/tool `arguments` failed to decode.
    InvalidParams,
    /// A registered tool handler returned an application error.
    ToolError,
    /// An invalid assignment/board state transition was attempted.
    StateTransitionError,
    /// A bounded resource (subscriber queue, pending-event cap) is full.
    ResourceExhausted,
    /// The terminal multiplexer is missing or refused to create a pane.
    SpawnError,
    /// The store's transaction failed and was rolled back.
    StoreError,
    /// `X-Agent-ID` was missing or did not match a known agent.
    Unauthorized,
    /// Transport-level failure (write failed, stream not open).
    TransportError,
    /// Unclassified internal error.
    Internal,
}

impl ErrorCode {
    /// JSON-RPC 2.0 numeric error code for this error's category.
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::ToolError => -32000,
            Self::StateTransitionError => -32001,
            Self::ResourceExhausted => -32002,
            Self::SpawnError => -32003,
            Self::StoreError => -32004,
            Self::Unauthorized => -32005,
            Self::TransportError => -32006,
            Self::Internal => -32603,
        }
    }

    /// HTTP status used for the handful of plain (non-RPC) endpoints and
    /// for the synchronous HTTP-ack path of `POST /mcp/messages`.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ParseError | Self::InvalidRequest | Self::InvalidParams => 400,
            Self::MethodNotFound => 404,
            Self::ToolError => 500,
            Self::StateTransitionError => 409,
            Self::ResourceExhausted => 429,
            Self::SpawnError => 500,
            Self::StoreError => 500,
            Self::Unauthorized => 401,
            Self::TransportError => 502,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "PARSE_ERROR",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::MethodNotFound => "METHOD_NOT_FOUND",
            Self::InvalidParams => "INVALID_PARAMS",
            Self::ToolError => "TOOL_ERROR",
            Self::StateTransitionError => "STATE_TRANSITION_ERROR",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::SpawnError => "SPAWN_ERROR",
            Self::StoreError => "STORE_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error carrying both a machine code and a human message — the shape
/// every tool handler returns and every JSON-RPC error response wraps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelError {
    pub code: ErrorCode,
    pub message: String,
}

impl KernelError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn tool_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ToolError, message)
    }

    pub fn state_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StateTransitionError, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn transport_not_streaming() -> Self {
        Self::new(ErrorCode::TransportError, "transport does not support streaming")
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for KernelError {}

impl From<sqlx::Error> for KernelError {
    fn from(e: sqlx::Error) -> Self {
        Self::store(e.to_string())
    }
}

/// Top-level JSON-RPC error body (the `error` member of a response frame).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<&KernelError> for RpcErrorBody {
    fn from(e: &KernelError) -> Self {
        Self { code: e.code.rpc_code(), message: e.message.clone(), data: None }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
