// Copyright (c) 2025 - Cowboy AI, Inc.

//! Neo4j adapter
//!
//! Implements [`GraphConnector`] and [`GraphClient`] on top of `neo4rs`, and
//! maps Bolt values into [`GraphValue`]:
//!
//! ```text
//! BoltType::Node      → GraphValue::Node
//! BoltType::Relation  → GraphValue::Relationship
//! BoltType::Path      → GraphValue::Path (relationships re-oriented from path indices)
//! BoltType::List/Map  → element-wise / key-wise
//! temporal values     → GraphValue::Temporal (ISO-8601 text)
//! ```
//!
//! Every `run` opens its own pooled connection through `Graph::execute_on`;
//! the connection returns to the pool when the row stream is dropped, on
//! every exit path.
//!
//! # Example
//!
//! ```rust,no_run
//! use cim_neo4j_bridge::adapters::Neo4jConnector;
//! use cim_neo4j_bridge::config::{ConnectionConfig, TransportPolicy};
//! use cim_neo4j_bridge::connection::ConnectionManager;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ConnectionManager::new(
//!         Arc::new(Neo4jConnector::default()),
//!         TransportPolicy::Downgrade,
//!         Duration::from_secs(120),
//!     );
//!
//!     let config = ConnectionConfig::new("bolt://localhost:7687", "neo4j", "password");
//!     manager.connect(&config).await?;
//!
//!     let result = manager.execute("MATCH (n) RETURN n LIMIT 5", Default::default(), None).await?;
//!     println!("{} records", result.records.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};
use neo4rs::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNode, BoltNull, BoltPath,
    BoltString, BoltType, BoltUnboundedRelation, ConfigBuilder, Graph, Query, Row,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::connection::{
    GraphClient, GraphConnector, QueryResult, QuerySummary, QueryType, Record, Statement,
};
use crate::errors::{BridgeError, BridgeResult};
use crate::value::{
    convert, GraphNode, GraphPath, GraphPoint, GraphRelationship, GraphValue, Properties,
};

/// Connection pool size per handle
pub const DEFAULT_MAX_CONNECTIONS: usize = 50;

/// Opens `neo4rs` connection pools
#[derive(Debug, Clone)]
pub struct Neo4jConnector {
    max_connections: usize,
}

impl Neo4jConnector {
    pub fn new(max_connections: usize) -> Self {
        Self { max_connections }
    }
}

impl Default for Neo4jConnector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS)
    }
}

#[async_trait]
impl GraphConnector for Neo4jConnector {
    async fn open(
        &self,
        uri: &str,
        config: &ConnectionConfig,
    ) -> BridgeResult<Arc<dyn GraphClient>> {
        let neo_config = ConfigBuilder::default()
            .uri(uri)
            .user(config.username.as_str())
            .password(config.password.as_str())
            .max_connections(self.max_connections)
            .build()
            .map_err(|e| BridgeError::Connection(format!("Invalid Neo4j configuration: {}", e)))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| BridgeError::Connection(format!("Failed to connect to Neo4j: {}", e)))?;

        Ok(Arc::new(Neo4jClient { graph }))
    }
}

/// A live `neo4rs` connection pool
pub struct Neo4jClient {
    graph: Graph,
}

#[async_trait]
impl GraphClient for Neo4jClient {
    async fn run(&self, statement: &Statement) -> BridgeResult<QueryResult> {
        let query = statement
            .params
            .iter()
            .fold(Query::new(statement.text.clone()), |query, (key, value)| {
                query.param(key, to_bolt(value))
            });

        let started = Instant::now();
        let stream = match statement.database.as_deref() {
            Some(database) => self.graph.execute_on(database, query).await,
            None => self.graph.execute(query).await,
        };
        let mut stream = stream.map_err(execution_error)?;
        let available_after = started.elapsed();

        let mut records = Vec::new();
        while let Some(row) = stream.next().await.map_err(execution_error)? {
            records.push(record_from_row(&row)?);
        }
        let consumed_after = started.elapsed().saturating_sub(available_after);

        debug!(records = records.len(), "Statement completed");

        Ok(QueryResult {
            records,
            summary: QuerySummary {
                query_type: QueryType::infer(&statement.text),
                counters: BTreeMap::new(),
                result_available_after: available_after.as_millis() as u64,
                result_consumed_after: consumed_after.as_millis() as u64,
            },
        })
    }

    async fn close(&self) {
        // Pooled connections close when the last clone of the graph drops.
        debug!("Releasing Neo4j connection pool");
    }
}

fn execution_error(err: neo4rs::Error) -> BridgeError {
    BridgeError::Execution(err.to_string())
}

fn record_from_row(row: &Row) -> BridgeResult<Record> {
    row.keys()
        .into_iter()
        .map(|key| {
            let name = key.to_string();
            let value: BoltType = row
                .get(&name)
                .map_err(|e| BridgeError::Execution(format!("Failed to read column '{}': {}", name, e)))?;
            Ok((name, from_bolt(value)))
        })
        .collect::<BridgeResult<Vec<_>>>()
        .map(Record::new)
}

/// Map a Bolt value into the graph value space
pub fn from_bolt(value: BoltType) -> GraphValue {
    match value {
        BoltType::Null(_) => GraphValue::Null,
        BoltType::Boolean(b) => GraphValue::Boolean(b.value),
        BoltType::Integer(i) => GraphValue::Integer(i.value),
        BoltType::Float(f) => GraphValue::Float(f.value),
        BoltType::String(s) => GraphValue::String(s.value),
        BoltType::Bytes(b) => GraphValue::Bytes(b.value.to_vec()),
        BoltType::List(list) => GraphValue::List(list.value.into_iter().map(from_bolt).collect()),
        BoltType::Map(map) => GraphValue::Map(properties(map)),
        BoltType::Node(node) => GraphValue::Node(node_from_bolt(node)),
        BoltType::Relation(rel) => GraphValue::Relationship(GraphRelationship {
            id: rel.id.value,
            rel_type: rel.typ.value,
            start: rel.start_node_id.value,
            end: rel.end_node_id.value,
            properties: properties(rel.properties),
        }),
        BoltType::UnboundedRelation(rel) => {
            let mut map = relationship_header(rel.id.value, &rel.typ.value);
            map.insert("properties".into(), GraphValue::Map(properties(rel.properties)));
            GraphValue::Map(map)
        }
        BoltType::Path(path) => GraphValue::Path(path_from_bolt(path)),
        BoltType::Point2D(p) => GraphValue::Point(GraphPoint {
            srid: p.sr_id.value,
            x: p.x.value,
            y: p.y.value,
            z: None,
        }),
        BoltType::Point3D(p) => GraphValue::Point(GraphPoint {
            srid: p.sr_id.value,
            x: p.x.value,
            y: p.y.value,
            z: Some(p.z.value),
        }),
        temporal => temporal_from_bolt(temporal),
    }
}

/// Render a temporal Bolt value as ISO-8601 text.
///
/// `time` carries its offset (`10:15:00+01:00`), zoned datetimes append the
/// zone id in brackets (`2024-03-15T10:15:00[Europe/Berlin]`), durations use
/// seconds only (`PT90.5S`).
fn temporal_from_bolt(value: BoltType) -> GraphValue {
    let rendered = match value {
        BoltType::Date(date) => NaiveDate::try_from(BoltType::Date(date))
            .map(|date| date.format("%Y-%m-%d").to_string()),
        BoltType::LocalTime(time) => Ok(NaiveTime::from(time).format(ISO_TIME).to_string()),
        BoltType::Time(time) => {
            let (time, offset) = <(NaiveTime, FixedOffset)>::from(time);
            Ok(format!("{}{}", time.format(ISO_TIME), offset))
        }
        BoltType::LocalDateTime(datetime) => {
            NaiveDateTime::try_from(BoltType::LocalDateTime(datetime))
                .map(|datetime| datetime.format(ISO_DATETIME).to_string())
        }
        BoltType::DateTime(datetime) => {
            DateTime::<FixedOffset>::try_from(BoltType::DateTime(datetime))
                .map(|datetime| datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        BoltType::DateTimeZoneId(datetime) => {
            <(NaiveDateTime, String)>::try_from(BoltType::DateTimeZoneId(datetime))
                .map(|(datetime, zone)| format!("{}[{}]", datetime.format(ISO_DATETIME), zone))
        }
        BoltType::Duration(duration) => {
            std::time::Duration::try_from(BoltType::Duration(duration)).map(iso_duration)
        }
        other => {
            warn!(value = ?other, "Unsupported Bolt value");
            return GraphValue::Null;
        }
    };

    match rendered {
        Ok(text) => GraphValue::Temporal(text),
        Err(e) => {
            warn!(error = %e, "Temporal value out of range");
            GraphValue::Null
        }
    }
}

const ISO_TIME: &str = "%H:%M:%S%.f";
const ISO_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn iso_duration(duration: std::time::Duration) -> String {
    let nanos = duration.subsec_nanos();
    if nanos == 0 {
        return format!("PT{}S", duration.as_secs());
    }
    let fraction = format!("{:09}", nanos);
    format!("PT{}.{}S", duration.as_secs(), fraction.trim_end_matches('0'))
}

fn properties(map: BoltMap) -> Properties {
    map.value
        .into_iter()
        .map(|(key, value)| (key.value, from_bolt(value)))
        .collect()
}

fn relationship_header(id: i64, rel_type: &str) -> BTreeMap<String, GraphValue> {
    BTreeMap::from([
        ("identity".to_string(), GraphValue::Integer(id)),
        ("type".to_string(), GraphValue::String(rel_type.to_string())),
    ])
}

fn node_from_bolt(node: BoltNode) -> GraphNode {
    GraphNode {
        id: node.id.value,
        labels: node
            .labels
            .value
            .into_iter()
            .filter_map(|label| match label {
                BoltType::String(s) => Some(s.value),
                _ => None,
            })
            .collect(),
        properties: properties(node.properties),
    }
}

/// Rebuild a traversal-ordered path.
///
/// Bolt sends distinct nodes and relationships plus an index sequence of
/// `(relationship, node)` pairs; relationship indices are 1-based and negative
/// when traversed against their direction.
fn path_from_bolt(path: BoltPath) -> GraphPath {
    let nodes: Vec<GraphNode> = path
        .nodes
        .value
        .into_iter()
        .filter_map(|n| match n {
            BoltType::Node(node) => Some(node_from_bolt(node)),
            _ => None,
        })
        .collect();
    let rels: Vec<BoltUnboundedRelation> = path
        .rels
        .value
        .into_iter()
        .filter_map(|r| match r {
            BoltType::UnboundedRelation(rel) => Some(rel),
            _ => None,
        })
        .collect();
    let indices: Vec<i64> = path
        .indices
        .value
        .into_iter()
        .filter_map(|i| match i {
            BoltType::Integer(i) => Some(i.value),
            _ => None,
        })
        .collect();

    let Some(first) = nodes.first() else {
        return GraphPath {
            nodes: Vec::new(),
            relationships: Vec::new(),
        };
    };

    let mut ordered = vec![first.clone()];
    let mut relationships = Vec::new();
    let mut current = first.id;

    for pair in indices.chunks_exact(2) {
        let (rel_index, node_index) = (pair[0], pair[1]);
        let rel = usize::try_from(rel_index.unsigned_abs())
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| rels.get(i));
        let next = usize::try_from(node_index).ok().and_then(|i| nodes.get(i));

        let (Some(rel), Some(next)) = (rel, next) else {
            break;
        };

        let (start, end) = if rel_index > 0 {
            (current, next.id)
        } else {
            (next.id, current)
        };

        relationships.push(GraphRelationship {
            id: rel.id.value,
            rel_type: rel.typ.value.clone(),
            start,
            end,
            properties: properties(rel.properties.clone()),
        });
        ordered.push(next.clone());
        current = next.id;
    }

    GraphPath {
        nodes: ordered,
        relationships,
    }
}

/// Map a graph value into a Bolt query parameter
pub fn to_bolt(value: &GraphValue) -> BoltType {
    match value {
        GraphValue::Null => BoltType::Null(BoltNull),
        GraphValue::Boolean(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        GraphValue::Integer(i) => BoltType::Integer(BoltInteger::new(*i)),
        GraphValue::Float(f) => BoltType::Float(BoltFloat::new(*f)),
        GraphValue::String(s) => BoltType::String(BoltString::from(s.as_str())),
        GraphValue::Temporal(s) => BoltType::String(BoltString::from(s.as_str())),
        GraphValue::Bytes(bytes) => BoltType::List(BoltList {
            value: bytes
                .iter()
                .map(|b| BoltType::Integer(BoltInteger::new(i64::from(*b))))
                .collect(),
        }),
        GraphValue::List(items) => BoltType::List(BoltList {
            value: items.iter().map(to_bolt).collect(),
        }),
        GraphValue::Map(entries) => BoltType::Map(BoltMap {
            value: entries
                .iter()
                .map(|(key, value)| (BoltString::from(key.as_str()), to_bolt(value)))
                .collect::<HashMap<_, _>>(),
        }),
        composite @ (GraphValue::Node(_)
        | GraphValue::Relationship(_)
        | GraphValue::Path(_)
        | GraphValue::Point(_)) => to_bolt(&GraphValue::from(convert(composite))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bolt_str(s: &str) -> BoltType {
        BoltType::String(BoltString::from(s))
    }

    fn bolt_int(i: i64) -> BoltType {
        BoltType::Integer(BoltInteger::new(i))
    }

    fn bolt_map(entries: Vec<(&str, BoltType)>) -> BoltMap {
        BoltMap {
            value: entries
                .into_iter()
                .map(|(k, v)| (BoltString::from(k), v))
                .collect(),
        }
    }

    fn bolt_node(id: i64, label: &str) -> BoltNode {
        BoltNode {
            id: BoltInteger::new(id),
            labels: BoltList {
                value: vec![bolt_str(label)],
            },
            properties: bolt_map(vec![("name", bolt_str("Ada"))]),
        }
    }

    #[test]
    fn test_scalars_from_bolt() {
        assert_eq!(from_bolt(BoltType::Null(BoltNull)), GraphValue::Null);
        assert_eq!(from_bolt(bolt_int(7)), GraphValue::Integer(7));
        assert_eq!(from_bolt(bolt_str("x")), GraphValue::String("x".into()));
        assert_eq!(
            from_bolt(BoltType::Boolean(BoltBoolean::new(true))),
            GraphValue::Boolean(true)
        );
    }

    #[test]
    fn test_date_is_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            from_bolt(BoltType::from(date)),
            GraphValue::Temporal("2024-03-15".into())
        );
    }

    #[test]
    fn test_local_datetime_is_iso_text() {
        let datetime = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(10, 15, 30)
            .unwrap();
        assert_eq!(
            from_bolt(BoltType::from(datetime)),
            GraphValue::Temporal("2024-03-15T10:15:30".into())
        );
    }

    #[test]
    fn test_iso_duration() {
        assert_eq!(iso_duration(std::time::Duration::from_secs(90)), "PT90S");
        assert_eq!(iso_duration(std::time::Duration::from_millis(90_500)), "PT90.5S");
    }

    #[test]
    fn test_node_from_bolt() {
        let value = from_bolt(BoltType::Node(bolt_node(1, "Person")));
        assert_eq!(
            value,
            GraphValue::Node(GraphNode::new(1, vec!["Person".into()]).with_property("name", "Ada"))
        );
    }

    #[test]
    fn test_path_is_reoriented_from_indices() {
        let path = BoltPath {
            nodes: BoltList {
                value: vec![
                    BoltType::Node(bolt_node(10, "A")),
                    BoltType::Node(bolt_node(20, "B")),
                ],
            },
            rels: BoltList {
                value: vec![BoltType::UnboundedRelation(BoltUnboundedRelation {
                    id: BoltInteger::new(5),
                    typ: BoltString::from("KNOWS"),
                    properties: bolt_map(vec![]),
                })],
            },
            // Traverse relationship 1 backwards to node 1
            indices: BoltList {
                value: vec![bolt_int(-1), bolt_int(1)],
            },
        };

        let GraphValue::Path(path) = from_bolt(BoltType::Path(path)) else {
            panic!("expected a path");
        };

        assert_eq!(path.nodes.len(), 2);
        assert_eq!(path.relationships.len(), 1);
        assert_eq!(path.relationships[0].start, 20);
        assert_eq!(path.relationships[0].end, 10);
    }

    #[test]
    fn test_params_to_bolt() {
        let params = GraphValue::from(serde_json::json!({
            "name": "Ada",
            "age": 36,
            "tags": ["x"],
        }));

        let BoltType::Map(map) = to_bolt(&params) else {
            panic!("expected a map");
        };

        assert_eq!(map.value.len(), 3);
        assert_eq!(map.value.get(&BoltString::from("age")), Some(&bolt_int(36)));
    }

    #[test]
    fn test_nodes_as_params_become_maps() {
        let node = GraphValue::Node(GraphNode::new(1, vec!["P".into()]));
        assert!(matches!(to_bolt(&node), BoltType::Map(_)));
    }
}
