// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP/SSE transport handlers: the MCP stream (`GET /mcp`, `/mcp/sse`),
//! the JSON-RPC POST surface (`POST /mcp`, `/mcp/messages`), and a bare
//! `/healthz`. One `async fn` per route, `State<Arc<AppState>>`
//! extraction, `Json`/`Sse` responses.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::Extension;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::agent::AgentId;
use crate::connection::{SessionLifecycle, Transport};
use crate::dispatcher::{dispatch, ShutdownChecker, ToolCalledHook};
use crate::error::{ErrorCode, KernelError};
use crate::state::{AppState, Core};

use super::auth::AgentIdentity;

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// One frame destined for an agent's SSE channel. Kept distinct from a
/// bare `Value` so the encoder can pick the `ping` event name without
/// inspecting the payload.
enum OutboundFrame {
    Data(Value),
    Ping,
}

/// [`Transport`] that forwards dispatcher responses onto an agent's SSE
/// channel. `close` cancels the stream rather than dropping the sender
/// directly, since the sender is also held by the ping loop.
struct SseTransport {
    tx: mpsc::Sender<OutboundFrame>,
    cancel: CancellationToken,
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    async fn send_frame(&self, frame: Value) -> Result<(), KernelError> {
        self.tx.send(OutboundFrame::Data(frame)).await.map_err(|_| KernelError::transport_not_streaming())
    }

    async fn close(&self) {
        self.cancel.cancel();
    }
}

/// `GET /healthz` — liveness probe, no identity required.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /mcp` or `/mcp/sse` — opens the agent's server-push stream.
/// First frame is `event: endpoint` carrying the POST URL with this
/// session's id; subsequent frames are JSON-RPC responses or `event: ping`
/// every 30 s.
pub async fn mcp_sse(State(state): State<Arc<AppState>>, Extension(identity): Extension<AgentIdentity>) -> Response {
    let (tx, rx) = mpsc::channel::<OutboundFrame>(32);
    let cancel = CancellationToken::new();
    let transport: Arc<dyn Transport> = Arc::new(SseTransport { tx: tx.clone(), cancel: cancel.clone() });
    let session = state.core.connections.add(identity.agent_id.clone(), transport).await;

    let endpoint = format!("/mcp/messages?session_id={}", session.id);

    let ping_tx = tx;
    let ping_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(PING_INTERVAL) => {
                    if ping_tx.send(OutboundFrame::Ping).await.is_err() {
                        return;
                    }
                }
                _ = ping_cancel.cancelled() => return,
            }
        }
    });

    let endpoint_frame = stream::once(futures_util::future::ready(Ok::<_, Infallible>(
        SseEvent::default().event("endpoint").data(endpoint),
    )));

    let forwarded = ReceiverStream::new(rx).take_until(cancel.cancelled()).map(|frame| {
        let event = match frame {
            OutboundFrame::Data(value) => SseEvent::default().event("message").data(value.to_string()),
            OutboundFrame::Ping => SseEvent::default().event("ping").data(""),
        };
        Ok::<_, Infallible>(event)
    });

    Sse::new(endpoint_frame.chain(forwarded)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub session_id: Option<Uuid>,
}

/// `POST /mcp/messages?session_id=<sid>` — deliver one JSON-RPC frame.
/// The response is pushed onto the matching SSE stream and the POST is
/// acknowledged with 202; if no stream is open for the agent (or
/// `session_id` doesn't match its current one), the response is returned
/// on the POST itself with 200.
pub async fn mcp_messages(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AgentIdentity>,
    Query(query): Query<MessagesQuery>,
    Json(frame): Json<Value>,
) -> Response {
    if let Some(session_id) = query.session_id {
        match state.core.connections.get_by_session(session_id).await {
            Some(session) if session.agent_id == identity.agent_id => {}
            _ => {
                let err = KernelError::new(ErrorCode::TransportError, "unknown or mismatched session_id");
                return (StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::BAD_GATEWAY), Json(serde_json::json!({"error": {"code": err.code.as_str(), "message": err.message}}))).into_response();
            }
        }
    }
    respond_to_frame(&state, &identity.agent_id, frame).await
}

/// `POST /mcp` with `X-Agent-ID` — same as `mcp_messages` without a
/// `session_id` query parameter, for agents that skip the SSE stream
/// entirely and call request/response style.
pub async fn mcp_direct(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AgentIdentity>,
    Json(frame): Json<Value>,
) -> Response {
    respond_to_frame(&state, &identity.agent_id, frame).await
}

async fn respond_to_frame(state: &Arc<AppState>, agent_id: &AgentId, frame: Value) -> Response {
    let hook = on_tool_called_hook(state.core.clone());
    let checker = shutdown_checker_hook(state.core.clone());
    let result = dispatch(&state.registry, agent_id, frame, &hook, &checker).await;

    if let Some(session) = state.core.connections.get(agent_id).await {
        if session.lifecycle().await == SessionLifecycle::Active {
            if let Err(e) = session.send(result).await {
                warn!(agent_id = %agent_id, error = %e, "failed to deliver response over stream");
            }
            return StatusCode::ACCEPTED.into_response();
        }
    }

    (StatusCode::OK, Json(result)).into_response()
}

/// Bumps the presence idle clock before the handler runs. Fire-and-forget: the hook itself is synchronous, so the bump runs
/// on a detached task rather than blocking dispatch.
fn on_tool_called_hook(core: Arc<Core>) -> ToolCalledHook {
    Box::new(move |agent_id, _tool| {
        let core = core.clone();
        let agent_id = agent_id.clone();
        tokio::spawn(async move {
            core.presence.bump_last_seen(&agent_id).await;
        });
    })
}

fn shutdown_checker_hook(core: Arc<Core>) -> ShutdownChecker {
    Box::new(move |agent_id| {
        let core = core.clone();
        let agent_id = agent_id.clone();
        Box::pin(async move { core.store.check_shutdown_flag(&agent_id).await.unwrap_or(false) })
    })
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
