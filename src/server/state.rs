// Copyright (c) 2025 - Cowboy AI, Inc.
//! Shared state handed to every handler and middleware

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::connection::{ConnectionManager, GraphConnector};
use crate::errors::{BridgeError, BridgeResult};
use crate::governance::{ApiKeyAuth, CorsPolicy, CypherValidator, RateLimiter};

/// Request-context state; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<ConnectionManager>,
    pub limiter: Arc<RateLimiter>,
    pub auth: ApiKeyAuth,
    pub cors: CorsPolicy,
    pub validator: Arc<CypherValidator>,
    /// Whether startup connection parameters were supplied
    pub auto_connect: bool,
}

impl AppState {
    /// Assemble state from configuration and a database connector
    pub fn from_config(
        config: &BridgeConfig,
        connector: Arc<dyn GraphConnector>,
    ) -> BridgeResult<Self> {
        let validator = CypherValidator::from_settings(config.deny_admin, &config.denylist)
            .map_err(|e| BridgeError::Configuration(e.to_string()))?;

        Ok(Self {
            connections: Arc::new(ConnectionManager::new(
                connector,
                config.transport,
                config.query_timeout,
            )),
            limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            auth: ApiKeyAuth::new(config.api_key.clone()),
            cors: CorsPolicy::new(config.cors_origins.clone()),
            validator: Arc::new(validator),
            auto_connect: config.auto_connect.is_some(),
        })
    }
}
