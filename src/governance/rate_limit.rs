// Copyright (c) 2025 - Cowboy AI, Inc.
//! Per-client fixed-window rate limiting
//!
//! Each client identifier (normally the peer IP address) owns a
//! [`RateRecord`]. The record is reset lazily on the first request after its
//! window has ended, and a background sweep drops records nobody has touched
//! since their window ended so the map only holds active clients.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::RateLimitConfig;

/// How often the background sweep runs
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Request counter for one client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateRecord {
    /// Requests seen in the current window, including denied ones
    pub count: u32,
    /// End of the current window
    pub reset_time: Instant,
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request may proceed
    Allow,
    /// Quota exhausted; retry after this many seconds
    Deny {
        /// Whole seconds until the window resets, at least 1
        retry_after: u64,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allow)
    }
}

/// Fixed-window rate limiter keyed by client identifier
#[derive(Debug)]
pub struct RateLimiter {
    records: DashMap<String, RateRecord>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            records: DashMap::new(),
            window: config.window,
            max_requests: config.max_requests,
        }
    }

    /// Check and count a request from `client_id` at the current instant
    pub fn check(&self, client_id: &str) -> RateDecision {
        self.check_at(client_id, Instant::now())
    }

    /// Check and count a request from `client_id` at `now`
    pub fn check_at(&self, client_id: &str, now: Instant) -> RateDecision {
        let fresh = RateRecord {
            count: 1,
            reset_time: now + self.window,
        };

        let mut record = match self.records.entry(client_id.to_string()) {
            Entry::Occupied(slot) => slot.into_ref(),
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                return RateDecision::Allow;
            }
        };

        if now > record.reset_time {
            *record = fresh;
            return RateDecision::Allow;
        }

        record.count = record.count.saturating_add(1);

        if record.count > self.max_requests {
            let remaining = record.reset_time.saturating_duration_since(now);
            let retry_after = (remaining.as_millis() as u64).div_ceil(1000).max(1);
            return RateDecision::Deny { retry_after };
        }

        RateDecision::Allow
    }

    /// Drop every record whose window ended before `now`
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| now <= record.reset_time);
        before.saturating_sub(self.records.len())
    }

    /// Spawn the periodic sweep; abort the returned handle to stop it
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            loop {
                ticker.tick().await;
                let removed = self.sweep_at(Instant::now());
                if removed > 0 {
                    debug!(removed, remaining = self.records.len(), "Swept expired rate limit records");
                }
            }
        })
    }

    /// Current record for a client
    pub fn record(&self, client_id: &str) -> Option<RateRecord> {
        self.records.get(client_id).map(|record| *record)
    }

    /// Number of tracked clients
    pub fn tracked_clients(&self) -> usize {
        self.records.len()
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
