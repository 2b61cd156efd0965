// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity-from-transport middleware. Extracts `X-Agent-ID` (required)
//! and the advisory `X-Project-Path`/`X-Access-Level` headers into an
//! [`AgentIdentity`] request extension ahead of every MCP route — one
//! `from_fn` layer that inspects headers and skips a named path. This
//! never rejects on *authentication*; it establishes *identity*. A
//! missing `X-Agent-ID` is still a 401: the dispatcher has no notion of
//! an anonymous caller.

use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};

use crate::agent::AgentId;
use crate::error::KernelError;

/// The identity the transport established for this request. Tool handlers
/// receive `agent_id` as an explicit dispatch parameter, never read from
/// the JSON-RPC payload; `project_path`/`access_level` are advisory and
/// carried for the agent's runtime context only.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    pub agent_id: AgentId,
    pub project_path: Option<String>,
    pub access_level: Option<String>,
}

/// Parse identity headers. `X-Agent-ID` is required and must be non-empty;
/// `X-Project-Path`/`X-Access-Level` are carried through verbatim if
/// present, unvalidated.
pub fn extract_identity(headers: &HeaderMap) -> Result<AgentIdentity, KernelError> {
    let agent_id = match headers.get("x-agent-id").and_then(|v| v.to_str().ok()) {
        Some(id) if !id.is_empty() => AgentId::new(id),
        _ => return Err(KernelError::unauthorized("missing X-Agent-ID header")),
    };
    let project_path = headers.get("x-project-path").and_then(|v| v.to_str().ok()).map(str::to_owned);
    let access_level = headers.get("x-access-level").and_then(|v| v.to_str().ok()).map(str::to_owned);
    Ok(AgentIdentity { agent_id, project_path, access_level })
}

fn error_response(err: KernelError) -> Response {
    let status = StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::UNAUTHORIZED);
    (status, Json(serde_json::json!({ "error": { "code": err.code.as_str(), "message": err.message } }))).into_response()
}

/// Axum middleware installed ahead of the MCP routes. `/healthz` skips
/// identity extraction entirely, since a liveness probe has no agent to
/// identify.
pub async fn identity_layer(mut req: Request, next: Next) -> Response {
    if req.uri().path() == "/healthz" {
        return next.run(req).await;
    }

    match extract_identity(req.headers()) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
