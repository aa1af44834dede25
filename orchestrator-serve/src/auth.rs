//! API key authentication middleware (§4.1).
//!
//! A single opaque shared key, compared in constant time, attached as
//! `Authorization: Bearer <key>` or `X-API-Key: <key>`. `health`/`metrics` are
//! exempt (they never reach this middleware; see the router in [`crate::routes`]).
//! When [`crate::config::ServeConfig::api_key`] is `None`, every request passes
//! (local dev only).

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::state::AppState;

fn extract_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(v) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(v);
    }
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Constant-time comparison; short-circuits safely on length mismatch since the
/// length itself isn't the secret (only its bytes are).
fn keys_match(expected: &str, given: &str) -> bool {
    expected.len() == given.len() && expected.as_bytes().ct_eq(given.as_bytes()).into()
}

pub async fn require_api_key(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    req: axum::extract::Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    match extract_key(&headers) {
        Some(given) if keys_match(expected, given) => Ok(next.run(req).await),
        _ => {
            warn!(%client, "rejected request: missing or incorrect API key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
