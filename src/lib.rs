//! Neo4j web bridge for the Composable Information Machine
//!
//! An HTTP front for a Neo4j database: requests are rate-limited, checked for
//! an API key and an allowed origin, validated, forwarded to a single shared
//! database handle, and answered with plain JSON.

pub mod adapters;
pub mod config;
pub mod connection;
pub mod errors;
pub mod governance;
pub mod server;
pub mod value;

// Re-export commonly used types
pub use config::{BridgeConfig, ConnectionConfig, RateLimitConfig, TransportPolicy};
pub use connection::{
    ConnectionManager, GraphClient, GraphConnector, QueryResult, QuerySummary, QueryType, Record,
    Statement,
};
pub use errors::{BridgeError, BridgeResult};
pub use server::{build_router, AppState, BridgeServer};
pub use value::{convert, GraphNode, GraphPath, GraphPoint, GraphRelationship, GraphValue};
