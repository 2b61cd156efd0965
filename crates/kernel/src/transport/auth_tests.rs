// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::HeaderMap;

use crate::error::ErrorCode;
use crate::transport::auth::extract_identity;

fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        headers.insert(
            axum::http::HeaderName::from_bytes(name.as_bytes()).expect("header name"),
            value.parse().expect("header value"),
        );
    }
    headers
}

#[test]
fn missing_agent_id_is_unauthorized() {
    let result = extract_identity(&headers(&[]));
    assert_eq!(result.err().map(|e| e.code), Some(ErrorCode::Unauthorized));
}

#[test]
fn empty_agent_id_is_unauthorized() {
    let result = extract_identity(&headers(&[("x-agent-id", "")]));
    assert_eq!(result.err().map(|e| e.code), Some(ErrorCode::Unauthorized));
}

#[test]
fn agent_id_alone_is_sufficient() {
    let identity = extract_identity(&headers(&[("x-agent-id", "team-coder001")])).expect("identity");
    assert_eq!(identity.agent_id, crate::agent::AgentId::new("team-coder001"));
    assert_eq!(identity.project_path, None);
    assert_eq!(identity.access_level, None);
}

#[test]
fn advisory_headers_are_carried_through() {
    let identity = extract_identity(&headers(&[
        ("x-agent-id", "team-reviewer002"),
        ("x-project-path", "/repo/a"),
        ("x-access-level", "elevated"),
    ]))
    .expect("identity");
    assert_eq!(identity.project_path.as_deref(), Some("/repo/a"));
    assert_eq!(identity.access_level.as_deref(), Some("elevated"));
}
