// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for bridge operations
//!
//! Every failure the bridge can report maps onto one [`BridgeError`] variant,
//! and every variant renders as a JSON object with an `error` field.

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors that can occur while serving a bridge request
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Malformed, oversized or missing input
    #[error("{0}")]
    Validation(String),

    /// No live database handle
    #[error("Not connected to Neo4j. Please connect first.")]
    NotConnected,

    /// API key configured but not supplied
    #[error("API key required. Provide via X-API-Key header or Authorization: Bearer <key>")]
    Unauthorized,

    /// API key supplied but wrong
    #[error("Invalid API key")]
    Forbidden,

    /// Origin is not on the CORS allow-list
    #[error("Not allowed by CORS")]
    CorsRejected(String),

    /// Per-client quota exhausted
    #[error("Too many requests. Please try again later.")]
    RateLimited {
        /// Seconds until the client's window resets
        retry_after: u64,
    },

    /// Database unreachable, misconfigured or failing its liveness check
    #[error("{0}")]
    Connection(String),

    /// Query rejected or failed at the database
    #[error("{0}")]
    Execution(String),

    /// Query exceeded the configured timeout
    #[error("Query timed out after {0} seconds")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Socket or filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything unexpected
    #[error("{0}")]
    Internal(String),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::Validation(_) | BridgeError::NotConnected => StatusCode::BAD_REQUEST,
            BridgeError::Unauthorized => StatusCode::UNAUTHORIZED,
            BridgeError::Forbidden | BridgeError::CorsRejected(_) => StatusCode::FORBIDDEN,
            BridgeError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            BridgeError::Connection(_)
            | BridgeError::Execution(_)
            | BridgeError::Timeout(_)
            | BridgeError::Configuration(_)
            | BridgeError::Io(_)
            | BridgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let BridgeError::RateLimited { retry_after } = self {
            let mut response = (
                status,
                Json(json!({
                    "error": self.to_string(),
                    "retryAfter": retry_after,
                })),
            )
                .into_response();

            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from(retry_after));
            return response;
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for BridgeError {
    fn from(rejection: JsonRejection) -> Self {
        BridgeError::Validation(rejection.body_text())
    }
}
