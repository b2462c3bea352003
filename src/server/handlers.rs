// Copyright (c) 2025 - Cowboy AI, Inc.
//! Route handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{error, info};

use super::state::AppState;
use crate::config::{ConnectionConfig, DEFAULT_DATABASE};
use crate::errors::{BridgeError, BridgeResult};
use crate::value::GraphValue;

/// Crate version reported by `/` and `/api/health`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Body of `POST /api/connect`
#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    pub uri: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl ConnectRequest {
    /// Required fields present and non-empty
    pub fn into_config(self) -> BridgeResult<ConnectionConfig> {
        let non_empty = |field: Option<String>| field.filter(|s| !s.is_empty());

        match (
            non_empty(self.uri),
            non_empty(self.username),
            non_empty(self.password),
        ) {
            (Some(uri), Some(username), Some(password)) => {
                let database = non_empty(self.database)
                    .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
                Ok(ConnectionConfig::new(uri, username, password).with_database(database))
            }
            _ => Err(BridgeError::Validation(
                "Missing required fields: uri, username, password".to_string(),
            )),
        }
    }
}

/// Body of `POST /api/query`; `cypher` is kept raw for validation
#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    pub cypher: Option<Value>,
    pub params: Option<Value>,
    pub database: Option<String>,
}

/// `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Neo4j Web Bridge",
        "version": VERSION,
        "status": "running",
        "endpoints": {
            "health": "GET /api/health",
            "connect": "POST /api/connect",
            "query": "POST /api/query",
            "info": "GET /api/info",
            "disconnect": "POST /api/disconnect",
        },
    }))
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let cors_origins = if state.cors.allows_all() {
        json!("all")
    } else {
        json!(state.cors.allow_list().len())
    };

    Json(json!({
        "status": "ok",
        "version": VERSION,
        "connected": state.connections.is_connected().await,
        "autoConnect": state.auto_connect,
        "security": {
            "apiKeyRequired": state.auth.is_required(),
            "corsOrigins": cors_origins,
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// `POST /api/connect`
pub async fn connect(
    State(state): State<AppState>,
    body: Result<Json<ConnectRequest>, JsonRejection>,
) -> BridgeResult<Json<Value>> {
    let Json(request) = body?;
    let config = request.into_config()?;

    let connection = state
        .connections
        .connect(&config)
        .await
        .inspect_err(|e| error!(error = %e, "Connection error"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Connected successfully",
        "uri": connection.uri,
        "database": connection.database,
    })))
}

/// `POST /api/query`
pub async fn query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> BridgeResult<Json<Value>> {
    let Json(request) = body?;

    if !state.connections.is_connected().await {
        return Err(BridgeError::NotConnected);
    }

    let cypher = state
        .validator
        .validate(request.cypher.as_ref())
        .map_err(|e| BridgeError::Validation(e.to_string()))?;
    let params = query_params(request.params)?;

    let result = state
        .connections
        .execute(cypher, params, request.database.as_deref())
        .await?;

    let records: Vec<Value> = result
        .records
        .iter()
        .map(|record| Value::Object(record.to_json()))
        .collect();

    Ok(Json(json!({
        "success": true,
        "records": records,
        "summary": result.summary,
    })))
}

/// `GET /api/info`
pub async fn info(State(state): State<AppState>) -> BridgeResult<Json<Value>> {
    let components = state
        .connections
        .server_info()
        .await
        .inspect_err(|e| error!(error = %e, "Info error"))?;

    Ok(Json(json!({ "success": true, "info": components })))
}

/// `POST /api/disconnect`
pub async fn disconnect(State(state): State<AppState>) -> BridgeResult<Json<Value>> {
    state.connections.disconnect().await?;
    info!("Disconnect requested");

    Ok(Json(json!({ "success": true, "message": "Disconnected" })))
}

/// Unknown `/api/*` routes
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

/// Query parameters must be absent, null or a JSON object
fn query_params(params: Option<Value>) -> BridgeResult<BTreeMap<String, GraphValue>> {
    match params {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, GraphValue::from(value)))
            .collect()),
        Some(_) => Err(BridgeError::Validation(
            "Query params must be an object".to_string(),
        )),
    }
}
