// Copyright (c) 2025 - Cowboy AI, Inc.
//! Connection management
//!
//! The [`ConnectionManager`] owns at most one live database handle. Handles are
//! produced by a [`GraphConnector`] and run queries through [`GraphClient`],
//! so the manager is independent of the driver in use.
//!
//! # Locking
//!
//! `connect` opens and checks the new handle without holding any lock, then
//! takes the write lock only to swap it in. `execute` and `server_info` hold
//! the read lock for the whole round trip, so a handle is never closed under
//! a running query.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{ConnectionConfig, TransportPolicy};
use crate::errors::{BridgeError, BridgeResult};
use crate::value::{convert, GraphValue};

/// Liveness check run before a connection is reported as established
pub const LIVENESS_QUERY: &str = "RETURN 1";

/// Component listing used by [`ConnectionManager::server_info`]
pub const COMPONENTS_QUERY: &str =
    "CALL dbms.components() YIELD name, versions, edition RETURN name, versions, edition";

/// A query and where to run it
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: BTreeMap<String, GraphValue>,
    /// Target database; `None` uses the server default
    pub database: Option<String>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
            database: None,
        }
    }

    pub fn with_params(mut self, params: BTreeMap<String, GraphValue>) -> Self {
        self.params = params;
        self
    }

    pub fn on(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

/// One result row, columns in query order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, GraphValue)>,
}

impl Record {
    pub fn new(fields: Vec<(String, GraphValue)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&GraphValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Convert every column into JSON, keeping column order
    pub fn to_json(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), convert(value)))
            .collect()
    }
}

/// Classification of a statement, using Neo4j's short codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryType {
    #[serde(rename = "r")]
    ReadOnly,
    #[serde(rename = "rw")]
    ReadWrite,
    #[serde(rename = "w")]
    WriteOnly,
    #[serde(rename = "s")]
    SchemaWrite,
}

/// Clause keywords that modify the graph
const WRITE_CLAUSES: [&str; 6] = ["CREATE", "MERGE", "DELETE", "DETACH", "SET", "REMOVE"];

/// Procedure-name verbs that modify data or the system graph
const WRITE_PROCEDURE_VERBS: [&str; 14] = [
    "CREATE", "DROP", "DELETE", "REMOVE", "SET", "ADD", "MERGE", "CHANGE", "KILL", "TERMINATE",
    "GRANT", "REVOKE", "ASSIGN", "CLEAR",
];

impl QueryType {
    /// Classify a statement from its keywords.
    ///
    /// Used when the driver does not report the server's own classification.
    /// String literals, quoted identifiers and comments are ignored; a `CALL`
    /// counts as a write when the procedure name's last segment starts with a
    /// write verb (`db.createUser`, `dbms.security.changePassword`).
    pub fn infer(text: &str) -> Self {
        let words = cypher_words(text);
        let has = |keyword: &str| words.iter().any(|w| w == keyword);

        let schema = matches!(words.first().map(String::as_str), Some("CREATE" | "DROP"))
            && matches!(words.get(1).map(String::as_str), Some("INDEX" | "CONSTRAINT"));
        if schema {
            return QueryType::SchemaWrite;
        }

        let (write_calls, read_calls): (Vec<&String>, Vec<&String>) = words
            .windows(2)
            .filter(|pair| pair[0] == "CALL")
            .map(|pair| &pair[1])
            .partition(|name| is_write_procedure(name));

        let writes = WRITE_CLAUSES.iter().any(|keyword| has(keyword)) || !write_calls.is_empty();
        let reads = has("MATCH") || has("RETURN") || !read_calls.is_empty();

        match (writes, reads) {
            (true, true) => QueryType::ReadWrite,
            (true, false) => QueryType::WriteOnly,
            (false, _) => QueryType::ReadOnly,
        }
    }
}

fn is_write_procedure(name: &str) -> bool {
    let last = name.rsplit('.').next().unwrap_or(name);
    WRITE_PROCEDURE_VERBS.iter().any(|verb| last.starts_with(verb))
}

/// Upper-cased words of a statement, skipping literals and comments.
///
/// Dots stay inside words so property accesses and procedure names are
/// single tokens.
fn cypher_words(text: &str) -> Vec<String> {
    fn flush(current: &mut String, words: &mut Vec<String>) {
        if !current.is_empty() {
            words.push(std::mem::take(current));
        }
    }

    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                flush(&mut current, &mut words);
                while let Some(inner) = chars.next() {
                    if inner == '\\' && c != '`' {
                        chars.next();
                    } else if inner == c {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                flush(&mut current, &mut words);
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                flush(&mut current, &mut words);
                chars.next();
                let mut previous = '\0';
                for inner in chars.by_ref() {
                    if previous == '*' && inner == '/' {
                        break;
                    }
                    previous = inner;
                }
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                current.push(c.to_ascii_uppercase())
            }
            _ => flush(&mut current, &mut words),
        }
    }
    flush(&mut current, &mut words);

    words
}

/// Execution summary returned alongside records
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySummary {
    pub query_type: QueryType,
    /// Update counters reported by the server, empty when unavailable
    pub counters: BTreeMap<String, i64>,
    /// Milliseconds until the first record was available
    pub result_available_after: u64,
    /// Milliseconds until all records were consumed
    pub result_consumed_after: u64,
}

/// Records and summary of one statement
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub records: Vec<Record>,
    pub summary: QuerySummary,
}

/// One row of `dbms.components()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerComponent {
    pub name: String,
    pub versions: Vec<String>,
    pub edition: String,
}

/// Where the active connection points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    /// URI after transport normalization
    pub uri: String,
    pub database: String,
}

/// A live, session-producing database handle
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Run a statement on a scoped session and collect every record.
    ///
    /// The session must be released before this returns, on success or error.
    async fn run(&self, statement: &Statement) -> BridgeResult<QueryResult>;

    /// Release the handle's resources
    async fn close(&self);
}

/// Opens database handles
#[async_trait]
pub trait GraphConnector: Send + Sync {
    /// Open a handle to `uri` (already normalized) with the given credentials
    async fn open(&self, uri: &str, config: &ConnectionConfig)
        -> BridgeResult<Arc<dyn GraphClient>>;
}

struct ActiveConnection {
    client: Arc<dyn GraphClient>,
    info: ConnectionInfo,
}

/// Owner of the single shared database handle
pub struct ConnectionManager {
    connector: Arc<dyn GraphConnector>,
    transport: TransportPolicy,
    query_timeout: Duration,
    active: RwLock<Option<ActiveConnection>>,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn GraphConnector>,
        transport: TransportPolicy,
        query_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            transport,
            query_timeout,
            active: RwLock::new(None),
        }
    }

    pub fn transport(&self) -> TransportPolicy {
        self.transport
    }

    /// Whether a live handle exists
    pub async fn is_connected(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// Details of the live handle, if any
    pub async fn connection_info(&self) -> Option<ConnectionInfo> {
        self.active.read().await.as_ref().map(|a| a.info.clone())
    }

    /// Replace any live handle with a new, checked one.
    ///
    /// Opening and the liveness check happen outside the lock. The write lock is held
    /// only to swap handles, so readers never wait on a slow database.
    pub async fn connect(&self, config: &ConnectionConfig) -> BridgeResult<ConnectionInfo> {
        let uri = self.transport.normalize(&config.uri);
        if uri != config.uri {
            debug!(from = %config.uri, to = %uri, "Normalized connection URI");
        }

        info!(uri = %uri, database = %config.database, "Connecting to Neo4j");
        let opened = tokio::time::timeout(self.query_timeout, self.connector.open(&uri, config)).await;
        let client = opened.map_err(|_| {
            BridgeError::Connection(format!(
                "Timed out connecting to {} after {} seconds",
                uri,
                self.query_timeout.as_secs()
            ))
        })??;

        let liveness = Statement::new(LIVENESS_QUERY).on(config.database.clone());
        if let Err(e) = self.run_with_timeout(client.as_ref(), &liveness).await {
            warn!(uri = %uri, error = %e, "Neo4j liveness check failed");
            client.close().await;
            return Err(BridgeError::Connection(e.to_string()));
        }

        let info = ConnectionInfo {
            uri,
            database: config.database.clone(),
        };
        let previous = self.active.write().await.replace(ActiveConnection {
            client,
            info: info.clone(),
        });

        if let Some(previous) = previous {
            info!(uri = %previous.info.uri, "Closing previous Neo4j connection");
            previous.client.close().await;
        }

        info!(uri = %info.uri, "Connected to Neo4j");
        Ok(info)
    }

    /// Run a statement on the live handle.
    ///
    /// `database` defaults to the database named at connect time.
    pub async fn execute(
        &self,
        text: &str,
        params: BTreeMap<String, GraphValue>,
        database: Option<&str>,
    ) -> BridgeResult<QueryResult> {
        let active = self.active.read().await;
        let connection = active.as_ref().ok_or(BridgeError::NotConnected)?;

        let database = database.unwrap_or(connection.info.database.as_str());
        let statement = Statement::new(text).with_params(params).on(database);

        debug!(database, "Executing Cypher statement");
        self.run_with_timeout(connection.client.as_ref(), &statement)
            .await
            .inspect_err(|e| error!(database, error = %e, "Query error"))
    }

    /// List server components on the default database
    pub async fn server_info(&self) -> BridgeResult<Vec<ServerComponent>> {
        let active = self.active.read().await;
        let connection = active.as_ref().ok_or(BridgeError::NotConnected)?;

        let result = self
            .run_with_timeout(connection.client.as_ref(), &Statement::new(COMPONENTS_QUERY))
            .await?;

        Ok(result.records.iter().map(component_from_record).collect())
    }

    /// Close and forget the live handle; a no-op when disconnected
    pub async fn disconnect(&self) -> BridgeResult<()> {
        let previous = self.active.write().await.take();
        if let Some(previous) = previous {
            previous.client.close().await;
            info!(uri = %previous.info.uri, "Disconnected from Neo4j");
        }
        Ok(())
    }

    async fn run_with_timeout(
        &self,
        client: &dyn GraphClient,
        statement: &Statement,
    ) -> BridgeResult<QueryResult> {
        tokio::time::timeout(self.query_timeout, client.run(statement))
            .await
            .map_err(|_| BridgeError::Timeout(self.query_timeout.as_secs()))?
    }
}

fn component_from_record(record: &Record) -> ServerComponent {
    let text = |key: &str| match record.get(key) {
        Some(GraphValue::String(s)) => s.clone(),
        _ => String::new(),
    };

    let versions = match record.get("versions") {
        Some(GraphValue::List(items)) => items
            .iter()
            .filter_map(|item| match item {
                GraphValue::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    ServerComponent {
        name: text("name"),
        versions,
        edition: text("edition"),
    }
}
