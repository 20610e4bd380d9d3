// ABOUTME: Digest pipeline modules: orchestration, caching policy, and date arithmetic
// ABOUTME: All calendar handling is UTC; a digest day is [00:00:00Z, 23:59:59Z]
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Digest Pipeline
//!
//! The orchestrator ([`service::DigestService`]) drives the flow: cache
//! lookup, fetch, summarize, participant aggregation, store. The cache layer
//! ([`cache::DigestCache`]) owns the freshness policy that distinguishes a
//! still-accumulating day from a closed one.
//!
//! All day boundaries are UTC. The "today" TTL tier compares against the
//! current UTC calendar day.

/// Channel/date-keyed digest and message-batch caching
pub mod cache;
/// The digest orchestrator
pub mod service;

pub use cache::DigestCache;
pub use service::{extract_participants, DigestService};

use chrono::{NaiveDate, NaiveTime, Utc};

/// Seconds in a day minus one, for inclusive day-end bounds
const DAY_END_OFFSET_SECS: i64 = 86_399;

/// Current UTC calendar day
#[must_use]
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Render a date as the `YYYY-MM-DD` cache-key form
#[must_use]
pub fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Inclusive `[start, end]` epoch-second bounds of a UTC calendar day
#[must_use]
pub fn day_bounds(date: NaiveDate) -> (i64, i64) {
    let start = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    (start, start + DAY_END_OFFSET_SECS)
}
