// Copyright (c) 2025 - Cowboy AI, Inc.
//! Request governance
//!
//! The policy decisions made for every inbound request before any database
//! work happens:
//!
//! - [`RateLimiter`]: per-client fixed-window request counting
//! - [`ApiKeyAuth`]: shared-secret authentication for protected routes
//! - [`CorsPolicy`]: origin allow-list
//! - [`CypherValidator`]: structural checks on query text
//!
//! Each component is a plain decision function over its inputs; the HTTP
//! middleware in [`crate::server`] maps decisions onto responses.

pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod validation;

pub use auth::{ApiKeyAuth, AuthOutcome};
pub use cors::{CorsDecision, CorsPolicy};
pub use rate_limit::{RateDecision, RateLimiter, RateRecord};
pub use validation::{CypherError, CypherValidator, MAX_CYPHER_LENGTH};
