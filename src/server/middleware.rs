// Copyright (c) 2025 - Cowboy AI, Inc.
//! HTTP middleware mapping governance decisions onto responses

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::any::Any;
use std::net::SocketAddr;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, error};

use super::state::AppState;
use crate::errors::BridgeError;
use crate::governance::{AuthOutcome, CorsDecision, RateDecision};

/// Client identifier used when the peer address is unavailable
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Rejects requests from origins outside the allow-list
pub async fn cors_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .map(|value| value.to_str().unwrap_or_default().to_string());

    match state.cors.evaluate(origin.as_deref()) {
        CorsDecision::Allow => next.run(request).await,
        CorsDecision::Reject => {
            BridgeError::CorsRejected(origin.unwrap_or_default()).into_response()
        }
    }
}

/// Per-client fixed-window rate limiting
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = client_id(&request);

    match state.limiter.check(&client) {
        RateDecision::Allow => next.run(request).await,
        RateDecision::Deny { retry_after } => {
            debug!(client = %client, retry_after, "Rate limit exceeded");
            BridgeError::RateLimited { retry_after }.into_response()
        }
    }
}

/// API key check for protected routes
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match state.auth.authenticate(request.headers()) {
        AuthOutcome::Authorized => next.run(request).await,
        AuthOutcome::Unauthorized => BridgeError::Unauthorized.into_response(),
        AuthOutcome::Forbidden => BridgeError::Forbidden.into_response(),
    }
}

/// Peer IP address, or [`UNKNOWN_CLIENT`]
pub fn client_id(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Fixed security headers attached to every response
pub fn security_headers() -> [SetResponseHeaderLayer<HeaderValue>; 4] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_XSS_PROTECTION, "1; mode=block"),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    ]
    .map(|(name, value): (HeaderName, &'static str)| {
        SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
    })
}

/// Final boundary: a panicking handler still yields a JSON 500
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "Handler panicked");

    BridgeError::Internal("Internal server error".to_string()).into_response()
}
