// Copyright (c) 2025 - Cowboy AI, Inc.

//! Database adapter implementations
//!
//! Concrete [`GraphConnector`](crate::connection::GraphConnector) implementations
//! for the databases the bridge can front.

pub mod neo4j;

pub use neo4j::{Neo4jClient, Neo4jConnector};
