// Copyright (c) 2025 - Cowboy AI, Inc.
//! Graph values and their JSON projection
//!
//! [`GraphValue`] is the tagged value space produced by the database binding.
//! [`convert`] maps it onto plain JSON:
//!
//! ```text
//! Node         → { identity, labels, properties }
//! Relationship → { identity, type, start, end, properties }
//! Path         → { start, end, segments: [{ start, relationship, end }], length }
//! List / Map   → element-wise / key-wise
//! ```
//!
//! Integers are 64-bit and serialize exactly. JSON consumers that decode
//! numbers into IEEE doubles (browsers) lose precision beyond ±2^53; that loss
//! is accepted as a property of the target format.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Property map of a node or relationship
pub type Properties = BTreeMap<String, GraphValue>;

/// A database-native value
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<GraphValue>),
    Map(BTreeMap<String, GraphValue>),
    Node(GraphNode),
    Relationship(GraphRelationship),
    Path(GraphPath),
    /// Dates, times and durations, already rendered as text
    Temporal(String),
    Point(GraphPoint),
}

/// A graph node
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: Properties,
}

/// A directed graph relationship
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRelationship {
    pub id: i64,
    pub rel_type: String,
    pub start: i64,
    pub end: i64,
    pub properties: Properties,
}

/// A path: `relationships[i]` joins `nodes[i]` and `nodes[i + 1]` in traversal order
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPath {
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<GraphRelationship>,
}

/// A spatial point; `z` is present for 3D points
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPoint {
    pub srid: i64,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl GraphNode {
    pub fn new(id: i64, labels: Vec<String>) -> Self {
        Self {
            id,
            labels,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<GraphValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl GraphRelationship {
    pub fn new(id: i64, rel_type: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            id,
            rel_type: rel_type.into(),
            start,
            end,
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<GraphValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Convert a graph value into a JSON-safe tree
pub fn convert(value: &GraphValue) -> Value {
    match value {
        GraphValue::Null => Value::Null,
        GraphValue::Boolean(b) => Value::Bool(*b),
        GraphValue::Integer(i) => Value::Number(Number::from(*i)),
        GraphValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        GraphValue::String(s) => Value::String(s.clone()),
        GraphValue::Bytes(bytes) => Value::Array(
            bytes
                .iter()
                .map(|b| Value::Number(Number::from(*b)))
                .collect(),
        ),
        GraphValue::List(items) => Value::Array(items.iter().map(convert).collect()),
        GraphValue::Map(entries) => Value::Object(convert_properties(entries)),
        GraphValue::Node(node) => convert_node(node),
        GraphValue::Relationship(rel) => convert_relationship(rel),
        GraphValue::Path(path) => convert_path(path),
        GraphValue::Temporal(text) => Value::String(text.clone()),
        GraphValue::Point(point) => convert_point(point),
    }
}

fn convert_properties(properties: &Properties) -> Map<String, Value> {
    properties
        .iter()
        .map(|(key, value)| (key.clone(), convert(value)))
        .collect()
}

fn convert_node(node: &GraphNode) -> Value {
    let mut object = Map::new();
    object.insert("identity".into(), Value::from(node.id));
    object.insert(
        "labels".into(),
        Value::Array(node.labels.iter().cloned().map(Value::String).collect()),
    );
    object.insert(
        "properties".into(),
        Value::Object(convert_properties(&node.properties)),
    );
    Value::Object(object)
}

fn convert_relationship(rel: &GraphRelationship) -> Value {
    let mut object = Map::new();
    object.insert("identity".into(), Value::from(rel.id));
    object.insert("type".into(), Value::String(rel.rel_type.clone()));
    object.insert("start".into(), Value::from(rel.start));
    object.insert("end".into(), Value::from(rel.end));
    object.insert(
        "properties".into(),
        Value::Object(convert_properties(&rel.properties)),
    );
    Value::Object(object)
}

fn convert_path(path: &GraphPath) -> Value {
    let segments: Vec<Value> = path
        .relationships
        .iter()
        .zip(path.nodes.windows(2))
        .map(|(rel, pair)| {
            let mut segment = Map::new();
            segment.insert("start".into(), convert_node(&pair[0]));
            segment.insert("relationship".into(), convert_relationship(rel));
            segment.insert("end".into(), convert_node(&pair[1]));
            Value::Object(segment)
        })
        .collect();

    let mut object = Map::new();
    object.insert(
        "start".into(),
        path.nodes.first().map(convert_node).unwrap_or(Value::Null),
    );
    object.insert(
        "end".into(),
        path.nodes.last().map(convert_node).unwrap_or(Value::Null),
    );
    object.insert("length".into(), Value::from(segments.len()));
    object.insert("segments".into(), Value::Array(segments));
    Value::Object(object)
}

fn convert_point(point: &GraphPoint) -> Value {
    let mut object = Map::new();
    object.insert("srid".into(), Value::from(point.srid));
    object.insert("x".into(), convert(&GraphValue::Float(point.x)));
    object.insert("y".into(), convert(&GraphValue::Float(point.y)));
    if let Some(z) = point.z {
        object.insert("z".into(), convert(&GraphValue::Float(z)));
    }
    Value::Object(object)
}

impl From<Value> for GraphValue {
    /// Lift plain JSON (e.g. request parameters) into the graph value space.
    ///
    /// Objects always become maps; node and relationship shapes are never inferred.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => GraphValue::Null,
            Value::Bool(b) => GraphValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => GraphValue::Integer(i),
                None => n.as_f64().map(GraphValue::Float).unwrap_or(GraphValue::Null),
            },
            Value::String(s) => GraphValue::String(s),
            Value::Array(items) => GraphValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(entries) => GraphValue::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for GraphValue {
    fn from(value: &str) -> Self {
        GraphValue::String(value.to_string())
    }
}

impl From<String> for GraphValue {
    fn from(value: String) -> Self {
        GraphValue::String(value)
    }
}

impl From<i64> for GraphValue {
    fn from(value: i64) -> Self {
        GraphValue::Integer(value)
    }
}

impl From<f64> for GraphValue {
    fn from(value: f64) -> Self {
        GraphValue::Float(value)
    }
}

impl From<bool> for GraphValue {
    fn from(value: bool) -> Self {
        GraphValue::Boolean(value)
    }
}

impl<T: Into<GraphValue>> From<Vec<T>> for GraphValue {
    fn from(values: Vec<T>) -> Self {
        GraphValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<GraphNode> for GraphValue {
    fn from(node: GraphNode) -> Self {
        GraphValue::Node(node)
    }
}

impl From<GraphRelationship> for GraphValue {
    fn from(rel: GraphRelationship) -> Self {
        GraphValue::Relationship(rel)
    }
}
