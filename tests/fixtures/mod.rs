// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-neo4j-bridge
//!
//! An in-memory graph connector plus helpers for driving the router without
//! a live Neo4j. Every fixture is deterministic.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use cim_neo4j_bridge::connection::{COMPONENTS_QUERY, LIVENESS_QUERY};
use cim_neo4j_bridge::{
    build_router, AppState, BridgeConfig, BridgeError, BridgeResult, ConnectionConfig,
    GraphClient, GraphConnector, GraphNode, GraphRelationship, GraphValue, QueryResult,
    QuerySummary, QueryType, Record, Statement,
};

pub const TEST_API_KEY: &str = "test-secret-key";
pub const TEST_URI: &str = "bolt://graph.test:7687";
pub const TEST_USER: &str = "neo4j";
pub const TEST_PASSWORD: &str = "password";

/// Statement text that makes the mock client fail with a database error
pub const FAILING_QUERY: &str = "RETRN 1";

/// Fixed connection parameters
pub fn connection_config() -> ConnectionConfig {
    ConnectionConfig::new(TEST_URI, TEST_USER, TEST_PASSWORD)
}

/// Ada, a `Person` node
pub fn ada() -> GraphNode {
    GraphNode::new(1, vec!["Person".into()]).with_property("name", "Ada")
}

/// Charles, a `Person` node
pub fn charles() -> GraphNode {
    GraphNode::new(2, vec!["Person".into()]).with_property("name", "Charles")
}

/// Ada KNOWS Charles
pub fn knows() -> GraphRelationship {
    GraphRelationship::new(7, "KNOWS", 1, 2).with_property("since", 1833_i64)
}

/// Shared log of what the mock database saw
#[derive(Debug, Default)]
pub struct MockLog {
    pub opened_uris: Mutex<Vec<String>>,
    pub statements: Mutex<Vec<Statement>>,
    pub closed: AtomicUsize,
}

impl MockLog {
    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    pub fn last_statement(&self) -> Option<Statement> {
        self.statements.lock().unwrap().last().cloned()
    }

    pub fn opened_uris(&self) -> Vec<String> {
        self.opened_uris.lock().unwrap().clone()
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory stand-in for a Neo4j server
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    pub log: Arc<MockLog>,
    /// Refuse to open handles at all
    pub unreachable: bool,
    /// Open handles whose liveness check fails
    pub reject_liveness: bool,
    /// Artificial latency on every statement
    pub delay: Option<Duration>,
    /// Never finish opening a handle
    pub hang_on_open: bool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn rejecting_liveness() -> Self {
        Self {
            reject_liveness: true,
            ..Self::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang_on_open: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

#[async_trait]
impl GraphConnector for MockConnector {
    async fn open(
        &self,
        uri: &str,
        _config: &ConnectionConfig,
    ) -> BridgeResult<Arc<dyn GraphClient>> {
        if self.hang_on_open {
            std::future::pending::<()>().await;
        }
        if self.unreachable {
            return Err(BridgeError::Connection(format!(
                "Could not reach Neo4j at {uri}"
            )));
        }
        self.log.opened_uris.lock().unwrap().push(uri.to_string());

        Ok(Arc::new(MockClient {
            log: self.log.clone(),
            reject_liveness: self.reject_liveness,
            delay: self.delay,
        }))
    }
}

struct MockClient {
    log: Arc<MockLog>,
    reject_liveness: bool,
    delay: Option<Duration>,
}

#[async_trait]
impl GraphClient for MockClient {
    async fn run(&self, statement: &Statement) -> BridgeResult<QueryResult> {
        self.log.statements.lock().unwrap().push(statement.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let records = match statement.text.as_str() {
            LIVENESS_QUERY if self.reject_liveness => {
                return Err(BridgeError::Execution(
                    "The client is unauthorized due to authentication failure.".into(),
                ))
            }
            LIVENESS_QUERY => vec![Record::new(vec![("1".into(), GraphValue::Integer(1))])],
            COMPONENTS_QUERY => vec![Record::new(vec![
                ("name".into(), "Neo4j Kernel".into()),
                ("versions".into(), vec!["5.15.0"].into()),
                ("edition".into(), "community".into()),
            ])],
            FAILING_QUERY => {
                return Err(BridgeError::Execution(
                    "Invalid input 'RETRN': expected 'RETURN'".into(),
                ))
            }
            _ => vec![Record::new(vec![
                ("a".into(), ada().into()),
                ("r".into(), knows().into()),
                ("b".into(), charles().into()),
                ("params".into(), GraphValue::Map(statement.params.clone())),
            ])],
        };

        Ok(QueryResult {
            records,
            summary: QuerySummary {
                query_type: QueryType::infer(&statement.text),
                counters: BTreeMap::new(),
                result_available_after: 0,
                result_consumed_after: 0,
            },
        })
    }

    async fn close(&self) {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Configuration with an API key, open CORS and a generous rate limit
pub fn bridge_config() -> BridgeConfig {
    let mut config = BridgeConfig {
        api_key: Some(TEST_API_KEY.to_string()),
        static_dir: "tests/fixtures/public".to_string(),
        ..BridgeConfig::default()
    };
    config.rate_limit.max_requests = 1_000;
    config
}

/// Router and state over a mock connector
pub fn app_with(config: BridgeConfig, connector: MockConnector) -> (Router, AppState) {
    let state = AppState::from_config(&config, Arc::new(connector)).unwrap();
    let router = build_router(state.clone(), &config.static_dir);
    (router, state)
}

/// Router with the default test configuration
pub fn app(connector: MockConnector) -> (Router, AppState) {
    app_with(bridge_config(), connector)
}

/// Request builder with optional JSON body, from a fixed peer address
pub fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    request_from(method, uri, body, "10.0.0.1:50000")
}

/// Request builder with an explicit peer address
pub fn request_from(method: Method, uri: &str, body: Option<Value>, peer: &str) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", TEST_API_KEY);

    let mut request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let peer: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

/// Send one request through the router
pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

/// Collect a response body as JSON
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
