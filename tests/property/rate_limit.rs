// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Fixed-Window Rate Limiter

use cim_neo4j_bridge::governance::{RateDecision, RateLimiter};
use cim_neo4j_bridge::RateLimitConfig;
use proptest::prelude::*;
use std::time::{Duration, Instant};

fn limiter(max_requests: u32, window_ms: u64) -> RateLimiter {
    RateLimiter::new(RateLimitConfig {
        window: Duration::from_millis(window_ms),
        max_requests,
    })
}

proptest! {
    /// Within one window at most `max_requests` requests are allowed
    #[test]
    fn prop_allowed_never_exceeds_ceiling(
        max_requests in 1u32..50,
        attempts in 0usize..150,
        window_ms in 1_000u64..120_000,
    ) {
        let limiter = limiter(max_requests, window_ms);
        let start = Instant::now();

        let allowed = (0..attempts)
            .map(|i| limiter.check_at("client", start + Duration::from_micros(i as u64)))
            .filter(RateDecision::is_allowed)
            .count();

        prop_assert_eq!(allowed, attempts.min(max_requests as usize));
    }

    /// A denial always carries a positive wait no longer than the window
    #[test]
    fn prop_retry_after_is_bounded(
        max_requests in 1u32..20,
        window_ms in 1_000u64..120_000,
        elapsed_fraction in 0.0f64..1.0,
    ) {
        let limiter = limiter(max_requests, window_ms);
        let start = Instant::now();
        for _ in 0..max_requests {
            limiter.check_at("client", start);
        }

        let elapsed = Duration::from_millis((window_ms as f64 * elapsed_fraction) as u64);
        match limiter.check_at("client", start + elapsed) {
            RateDecision::Deny { retry_after } => {
                prop_assert!(retry_after >= 1);
                prop_assert!(retry_after <= window_ms.div_ceil(1000));
            }
            RateDecision::Allow => prop_assert!(false, "request over the ceiling was allowed"),
        }
    }

    /// Once the window has passed the next request restarts the count at one
    #[test]
    fn prop_window_expiry_resets(
        max_requests in 1u32..20,
        extra in 0u32..20,
        window_ms in 1_000u64..120_000,
    ) {
        let limiter = limiter(max_requests, window_ms);
        let start = Instant::now();
        for _ in 0..(max_requests + extra) {
            limiter.check_at("client", start);
        }

        let later = start + Duration::from_millis(window_ms + 1);
        prop_assert!(limiter.check_at("client", later).is_allowed());

        let record = limiter.record("client").unwrap();
        prop_assert_eq!(record.count, 1);
        prop_assert_eq!(record.reset_time, later + Duration::from_millis(window_ms));
    }

    /// One client's traffic never affects another's quota
    #[test]
    fn prop_clients_are_isolated(
        max_requests in 1u32..20,
        noisy in 0usize..100,
    ) {
        let limiter = limiter(max_requests, 60_000);
        let start = Instant::now();
        for _ in 0..noisy {
            limiter.check_at("10.0.0.1", start);
        }

        prop_assert!(limiter.check_at("10.0.0.2", start).is_allowed());
    }
}
