// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cypher input validation
//!
//! Checks run before a query reaches the database: the `cypher` field must be
//! a non-empty string of at most [`MAX_CYPHER_LENGTH`] characters, and may
//! optionally be screened against a denylist of statement patterns.

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use thiserror::Error;

/// Maximum query length in characters (inclusive)
pub const MAX_CYPHER_LENGTH: usize = 10_000;

/// Administrative procedures blocked when the built-in denylist is enabled
pub const ADMIN_PATTERNS: [&str; 3] = [
    r"CALL\s+dbms\.security",
    r"CALL\s+db\.createUser",
    r"CALL\s+db\.dropUser",
];

/// Why a query was rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CypherError {
    #[error("Cypher query must be a non-empty string")]
    NotAString,

    #[error("Cypher query too long (max 10000 characters)")]
    TooLong(usize),

    #[error("This operation is not allowed")]
    Forbidden(String),

    #[error("Invalid denylist pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Query validator with an optional statement denylist
#[derive(Debug, Clone, Default)]
pub struct CypherValidator {
    denylist: Vec<Regex>,
}

impl CypherValidator {
    /// Validator with no denylist
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator rejecting statements matching any of `patterns`, case-insensitively
    pub fn with_denylist<I, S>(patterns: I) -> Result<Self, CypherError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let denylist = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| CypherError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { denylist })
    }

    /// Build from configuration flags
    pub fn from_settings(deny_admin: bool, extra: &[String]) -> Result<Self, CypherError> {
        let builtin: &[&str] = if deny_admin { &ADMIN_PATTERNS[..] } else { &[] };
        Self::with_denylist(
            builtin
                .iter()
                .map(|p| p.to_string())
                .chain(extra.iter().cloned()),
        )
    }

    pub fn denylist_len(&self) -> usize {
        self.denylist.len()
    }

    /// Validate the raw `cypher` field of a request body
    pub fn validate<'a>(&self, input: Option<&'a Value>) -> Result<&'a str, CypherError> {
        let text = match input {
            Some(Value::String(text)) if !text.is_empty() => text.as_str(),
            _ => return Err(CypherError::NotAString),
        };

        let length = text.chars().count();
        if length > MAX_CYPHER_LENGTH {
            return Err(CypherError::TooLong(length));
        }

        if let Some(pattern) = self.denylist.iter().find(|p| p.is_match(text)) {
            return Err(CypherError::Forbidden(pattern.as_str().to_string()));
        }

        Ok(text)
    }
}
