// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Value Conversion
//!
//! Conversion is pure and total, and converting an already JSON-safe value
//! changes nothing.

use cim_neo4j_bridge::{convert, GraphNode, GraphRelationship, GraphValue};
use proptest::prelude::*;
use serde_json::Value;

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e12f64..1.0e12f64).prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

fn scalar() -> impl Strategy<Value = GraphValue> {
    prop_oneof![
        Just(GraphValue::Null),
        any::<bool>().prop_map(GraphValue::Boolean),
        any::<i64>().prop_map(GraphValue::Integer),
        (-1.0e12f64..1.0e12f64).prop_map(GraphValue::Float),
        "[a-z]{0,10}".prop_map(GraphValue::String),
    ]
}

fn graph_value() -> impl Strategy<Value = GraphValue> {
    let node = (any::<i64>(), prop::collection::vec("[A-Z][a-z]{1,6}", 0..3), scalar())
        .prop_map(|(id, labels, value)| {
            GraphValue::Node(GraphNode::new(id, labels).with_property("value", value))
        });
    let relationship = (any::<i64>(), "[A-Z_]{1,8}", any::<i64>(), any::<i64>(), scalar())
        .prop_map(|(id, rel_type, start, end, value)| {
            GraphValue::Relationship(
                GraphRelationship::new(id, rel_type, start, end).with_property("value", value),
            )
        });

    prop_oneof![scalar(), node, relationship].prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(GraphValue::List),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4).prop_map(GraphValue::Map),
        ]
    })
}

proptest! {
    /// JSON lifted into the graph value space converts back to itself
    #[test]
    fn prop_json_safe_values_are_fixed_points(value in json_value()) {
        prop_assert_eq!(convert(&GraphValue::from(value.clone())), value);
    }

    /// convert(convert(x)) == convert(x)
    #[test]
    fn prop_convert_is_idempotent(value in graph_value()) {
        let once = convert(&value);
        let twice = convert(&GraphValue::from(once.clone()));
        prop_assert_eq!(twice, once);
    }

    /// Lists keep their length and element order
    #[test]
    fn prop_lists_keep_order(items in prop::collection::vec(graph_value(), 0..8)) {
        let converted = convert(&GraphValue::List(items.clone()));
        let elements = converted.as_array().unwrap();

        prop_assert_eq!(elements.len(), items.len());
        for (element, item) in elements.iter().zip(&items) {
            prop_assert_eq!(element, &convert(item));
        }
    }
}
