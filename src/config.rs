// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bridge and Neo4j connection configuration
//!
//! Everything is read from the process environment; nothing is persisted.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{BridgeError, BridgeResult};

/// Database used when a request does not name one
pub const DEFAULT_DATABASE: &str = "neo4j";

/// URI scheme prefixes rewritten to plain `bolt://` under [`TransportPolicy::Downgrade`]
const SECURE_SCHEMES: [&str; 3] = ["neo4j+s://", "bolt+s://", "https://"];

/// Neo4j connection parameters supplied per connect call
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Neo4j URI (e.g., "bolt://localhost:7687")
    pub uri: String,

    /// Username for authentication
    pub username: String,

    /// Password for authentication
    pub password: String,

    /// Database name, `neo4j` when not given
    pub database: String,
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

impl ConnectionConfig {
    /// Create a configuration against the default database
    pub fn new(
        uri: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            username: username.into(),
            password: password.into(),
            database: default_database(),
        }
    }

    /// Set the database name
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Read auto-connect parameters from `NEO4J_*` variables.
    ///
    /// Returns `None` unless URI, user and password are all present.
    pub fn from_env() -> Option<Self> {
        let uri = env_non_empty("NEO4J_URI")?;
        let username = env_non_empty("NEO4J_USER").or_else(|| env_non_empty("NEO4J_USERNAME"))?;
        let password = env_non_empty("NEO4J_PASSWORD")?;
        let database = env_non_empty("NEO4J_DATABASE").unwrap_or_else(default_database);

        Some(Self::new(uri, username, password).with_database(database))
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// What to do with TLS-bearing URI schemes before handing them to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportPolicy {
    /// Rewrite `neo4j+s://`, `bolt+s://` and `https://` to `bolt://`.
    ///
    /// Assumes the network path to the database is already trusted or tunnelled.
    #[default]
    Downgrade,

    /// Pass the URI to the driver untouched
    Preserve,
}

impl TransportPolicy {
    /// Apply the policy to a connection URI
    pub fn normalize(&self, uri: &str) -> String {
        match self {
            TransportPolicy::Preserve => uri.to_string(),
            TransportPolicy::Downgrade => SECURE_SCHEMES
                .iter()
                .find_map(|scheme| uri.strip_prefix(scheme))
                .map(|rest| format!("bolt://{}", rest))
                .unwrap_or_else(|| uri.to_string()),
        }
    }
}

impl FromStr for TransportPolicy {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "downgrade" => Ok(TransportPolicy::Downgrade),
            "preserve" => Ok(TransportPolicy::Preserve),
            other => Err(BridgeError::Configuration(format!(
                "unknown transport policy '{}' (expected 'downgrade' or 'preserve')",
                other
            ))),
        }
    }
}

impl fmt::Display for TransportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportPolicy::Downgrade => write!(f, "downgrade"),
            TransportPolicy::Preserve => write!(f, "preserve"),
        }
    }
}

/// Fixed-window rate limit settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Window length
    pub window: Duration,
    /// Requests allowed per client per window
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(60_000),
            max_requests: 100,
        }
    }
}

/// Top-level bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Shared API key; `None` runs the bridge in open mode
    pub api_key: Option<String>,
    /// CORS allow-list, `*` allows every origin
    pub cors_origins: Vec<String>,
    /// Rate limiting
    pub rate_limit: RateLimitConfig,
    /// Directory served for the browser client
    pub static_dir: String,
    /// Per-query timeout
    pub query_timeout: Duration,
    /// TLS scheme handling for connect URIs
    pub transport: TransportPolicy,
    /// Enable the built-in administrative procedure denylist
    pub deny_admin: bool,
    /// Extra forbidden statement patterns
    pub denylist: Vec<String>,
    /// Parameters for the one-shot startup connection
    pub auto_connect: Option<ConnectionConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_key: None,
            cors_origins: vec!["*".to_string()],
            rate_limit: RateLimitConfig::default(),
            static_dir: "public".to_string(),
            query_timeout: Duration::from_secs(120),
            transport: TransportPolicy::default(),
            deny_admin: false,
            denylist: Vec::new(),
            auto_connect: None,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> BridgeResult<Self> {
        let defaults = Self::default();

        let rate_limit = RateLimitConfig {
            window: Duration::from_millis(
                env_parse("RATE_LIMIT_WINDOW_MS")?
                    .unwrap_or(defaults.rate_limit.window.as_millis() as u64),
            ),
            max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS")?
                .unwrap_or(defaults.rate_limit.max_requests),
        };

        let transport = match env_non_empty("NEO4J_TRANSPORT") {
            Some(value) => value.parse()?,
            None => defaults.transport,
        };

        Ok(Self {
            host: env_non_empty("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            api_key: env_non_empty("API_KEY"),
            cors_origins: env_non_empty("CORS_ORIGINS")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.cors_origins),
            rate_limit,
            static_dir: env_non_empty("STATIC_DIR").unwrap_or(defaults.static_dir),
            query_timeout: env_parse("QUERY_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.query_timeout),
            transport,
            deny_admin: env_parse("CYPHER_DENY_ADMIN")?.unwrap_or(defaults.deny_admin),
            denylist: env_non_empty("CYPHER_DENYLIST")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            auto_connect: ConnectionConfig::from_env(),
        })
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> BridgeResult<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env_non_empty(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                BridgeError::Configuration(format!("{} has invalid value '{}': {}", key, raw, e))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("neo4j+s://db.example.com:7687", "bolt://db.example.com:7687" ; "neo4j tls")]
    #[test_case("bolt+s://db.example.com", "bolt://db.example.com" ; "bolt tls")]
    #[test_case("https://db.example.com", "bolt://db.example.com" ; "https")]
    #[test_case("bolt://localhost:7687", "bolt://localhost:7687" ; "plain bolt")]
    #[test_case("neo4j://localhost:7687", "neo4j://localhost:7687" ; "plain neo4j")]
    fn test_downgrade_rewrites_secure_schemes(input: &str, expected: &str) {
        assert_eq!(TransportPolicy::Downgrade.normalize(input), expected);
    }

    #[test]
    fn test_preserve_leaves_uri_untouched() {
        let uri = "neo4j+s://db.example.com:7687";
        assert_eq!(TransportPolicy::Preserve.normalize(uri), uri);
    }

    #[test]
    fn test_transport_policy_parse() {
        assert_eq!("Preserve".parse::<TransportPolicy>().unwrap(), TransportPolicy::Preserve);
        assert_eq!(" downgrade ".parse::<TransportPolicy>().unwrap(), TransportPolicy::Downgrade);
        assert!("tls".parse::<TransportPolicy>().is_err());
    }

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" https://a.com, https://b.com ,,"),
            vec!["https://a.com".to_string(), "https://b.com".to_string()]
        );
    }

    #[test]
    fn test_connection_config_defaults_database() {
        let config: ConnectionConfig = serde_json::from_value(serde_json::json!({
            "uri": "bolt://localhost:7687",
            "username": "neo4j",
            "password": "secret",
        }))
        .unwrap();
        assert_eq!(config.database, DEFAULT_DATABASE);
    }

    #[test]
    fn test_connection_config_debug_redacts_password() {
        let config = ConnectionConfig::new("bolt://localhost", "neo4j", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_bridge_config_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
        assert!(config.api_key.is_none());
    }
}
