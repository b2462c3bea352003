// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Properties of the rate limiter window arithmetic and of value conversion
//! that must hold for all inputs.

mod conversion;
mod rate_limit;
