// Copyright (c) 2025 - Cowboy AI, Inc.

//! HTTP surface
//!
//! Routes, middleware and the server lifecycle. Request flow:
//!
//! ```text
//! trace → panic boundary → security headers → CORS guard → CORS headers
//!   → body limit → [/api] rate limit → [protected] API key → handler
//! ```

pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::handler::HandlerWithoutStateExt;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::BridgeConfig;
use crate::connection::GraphConnector;
use crate::errors::BridgeResult;
use crate::governance::rate_limit::SWEEP_INTERVAL;

/// Maximum accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the full application router
pub fn build_router(state: AppState, static_dir: &str) -> Router {
    let protected = Router::new()
        .route("/connect", post(handlers::connect))
        .route("/query", post(handlers::query))
        .route("/info", get(handlers::info))
        .route("/disconnect", post(handlers::disconnect))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit));

    let [nosniff, frame_options, xss_protection, referrer_policy] =
        middleware::security_headers();

    Router::new()
        .route("/", get(handlers::root))
        .nest("/api", api)
        .fallback_service(
            ServeDir::new(static_dir).not_found_service(handlers::not_found.into_service()),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(middleware::panic_response))
                .layer(nosniff)
                .layer(frame_options)
                .layer(xss_protection)
                .layer(referrer_policy)
                .layer(from_fn_with_state(state.clone(), middleware::cors_guard))
                .layer(state.cors.layer()),
        )
        .with_state(state)
}

/// The bridge server: configuration plus shared state
pub struct BridgeServer {
    config: BridgeConfig,
    state: AppState,
}

impl BridgeServer {
    pub fn new(config: BridgeConfig, connector: Arc<dyn GraphConnector>) -> BridgeResult<Self> {
        let state = AppState::from_config(&config, connector)?;

        if !state.auth.is_required() {
            warn!("API_KEY not set; protected endpoints are open to any client");
        }
        info!(
            transport = %state.connections.transport(),
            rate_limit = state.limiter.max_requests(),
            window_ms = state.limiter.window().as_millis() as u64,
            cors = if state.cors.allows_all() { "all" } else { "allow-list" },
            origins = state.cors.allow_list().len(),
            denylist = state.validator.denylist_len(),
            "Bridge configured"
        );

        Ok(Self { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.config.static_dir)
    }

    /// Serve until `shutdown` resolves, then close the database handle
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> BridgeResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&address).await?;
        info!(address = %address, "Neo4j web bridge listening");

        let sweeper = self.state.limiter.clone().spawn_sweeper(SWEEP_INTERVAL);

        if let Some(config) = self.config.auto_connect.clone() {
            let connections = self.state.connections.clone();
            tokio::spawn(async move {
                match connections.connect(&config).await {
                    Ok(connection) => {
                        info!(uri = %connection.uri, database = %connection.database, "Auto-connected to Neo4j")
                    }
                    Err(e) => warn!(error = %e, "Auto-connect failed; waiting for /api/connect"),
                }
            });
        }

        let app = self.router();
        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        sweeper.abort();
        info!("Shutting down; closing Neo4j connection");
        if let Err(e) = self.state.connections.disconnect().await {
            error!(error = %e, "Failed to close Neo4j connection");
        }

        served.map_err(Into::into)
    }
}
