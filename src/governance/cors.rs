// Copyright (c) 2025 - Cowboy AI, Inc.
//! CORS origin policy
//!
//! [`CorsPolicy::evaluate`] decides whether an origin may talk to the bridge;
//! [`CorsPolicy::layer`] turns the same decision into the response headers
//! browsers expect.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use super::auth::API_KEY_HEADER;

/// Wildcard entry admitting every origin
pub const WILDCARD: &str = "*";

/// Outcome of an origin check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorsDecision {
    Allow,
    Reject,
}

/// Origin allow-list
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_list: Vec<String>,
}

impl CorsPolicy {
    pub fn new(allow_list: Vec<String>) -> Self {
        Self { allow_list }
    }

    pub fn allows_all(&self) -> bool {
        self.allow_list.iter().any(|entry| entry == WILDCARD)
    }

    pub fn allow_list(&self) -> &[String] {
        &self.allow_list
    }

    /// Decide on an `Origin` header value. Absent origins (curl, server-side
    /// callers) are always allowed.
    pub fn evaluate(&self, origin: Option<&str>) -> CorsDecision {
        let decision = evaluate(origin, &self.allow_list);
        if let (CorsDecision::Reject, Some(origin)) = (decision, origin) {
            warn!(origin, "CORS blocked origin");
        }
        decision
    }

    /// Response-header layer for admitted origins.
    ///
    /// Rejected origins never get here; the guard middleware answers them first.
    pub fn layer(&self) -> CorsLayer {
        let policy = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
                let origin = origin.to_str().ok();
                origin.is_some() && evaluate(origin, &policy.allow_list) == CorsDecision::Allow
            }))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(API_KEY_HEADER),
                header::AUTHORIZATION,
            ])
    }
}

/// Pure origin decision against an allow-list
pub fn evaluate(origin: Option<&str>, allow_list: &[String]) -> CorsDecision {
    match origin {
        None => CorsDecision::Allow,
        Some(origin) if allow_list.iter().any(|e| e == WILDCARD || e == origin) => {
            CorsDecision::Allow
        }
        Some(_) => CorsDecision::Reject,
    }
}
