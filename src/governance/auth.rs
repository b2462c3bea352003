// Copyright (c) 2025 - Cowboy AI, Inc.
//! Shared-secret API key authentication
//!
//! The key is read from `X-API-Key`, falling back to `Authorization: Bearer <key>`.
//! With no key configured every request is authorized (open mode).

use axum::http::{header, HeaderMap};
use subtle::ConstantTimeEq;

/// Primary header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

const BEARER_PREFIX: &str = "Bearer ";

/// Outcome of an authentication check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized,
    /// No candidate key supplied
    Unauthorized,
    /// Candidate key supplied but wrong
    Forbidden,
}

/// API key authenticator
#[derive(Clone)]
pub struct ApiKeyAuth {
    key: Option<String>,
}

impl ApiKeyAuth {
    /// Create an authenticator; `None` or an empty key selects open mode
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|k| !k.is_empty()),
        }
    }

    /// Whether a key must be presented
    pub fn is_required(&self) -> bool {
        self.key.is_some()
    }

    /// Authenticate a request by its headers
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let Some(expected) = self.key.as_deref() else {
            return AuthOutcome::Authorized;
        };

        match candidate_key(headers) {
            None => AuthOutcome::Unauthorized,
            Some(provided) if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) => {
                AuthOutcome::Authorized
            }
            Some(_) => AuthOutcome::Forbidden,
        }
    }
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("required", &self.is_required())
            .finish()
    }
}

fn candidate_key(headers: &HeaderMap) -> Option<&str> {
    let primary = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty());

    primary.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.strip_prefix(BEARER_PREFIX).unwrap_or(value))
            .filter(|value| !value.is_empty())
    })
}
