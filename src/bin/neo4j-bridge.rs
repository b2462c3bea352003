// Copyright (c) 2025 - Cowboy AI, Inc.
//! Neo4j Web Bridge
//!
//! Serves the bridge HTTP API and the static browser client.
//!
//! Run with: cargo run --bin neo4j-bridge
//!
//! Configuration comes from the environment (`PORT`, `API_KEY`,
//! `CORS_ORIGINS`, `NEO4J_URI`, ...). Log verbosity follows `RUST_LOG`.

use anyhow::{Context, Result};
use cim_neo4j_bridge::adapters::Neo4jConnector;
use cim_neo4j_bridge::{BridgeConfig, BridgeServer};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Neo4j web bridge v{}", env!("CARGO_PKG_VERSION"));

    let config = BridgeConfig::from_env().context("Invalid bridge configuration")?;
    let server = BridgeServer::new(config, Arc::new(Neo4jConnector::default()))
        .context("Failed to initialize bridge")?;

    server
        .run_with_shutdown(shutdown_signal())
        .await
        .context("Bridge server failed")?;

    info!("Neo4j web bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
