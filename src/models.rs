// ABOUTME: Common data models for messages, digests, and participant statistics
// ABOUTME: Serialized shapes are wire-compatible with the persisted digest JSON format
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Core data model for the digest pipeline.
//!
//! [`ChannelDigest`] is the outward-facing persisted shape; its serialized
//! field names (`channelName`, `messageCount`, `generatedAt`, ...) must stay
//! stable because cached entries and the HTTP surface both use it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single channel message after filtering and author enrichment.
///
/// `ts` is the platform-assigned timestamp: a monotonic decimal string,
/// unique within a channel, sortable as a real number. It doubles as the
/// dedup key for stored batches. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Platform timestamp, e.g. `"1714060800.000100"`
    pub ts: String,
    /// Author: a user id until enrichment replaces it with a display name
    pub user: String,
    /// Message text, sanitized of platform markup
    pub text: String,
    /// Parent thread timestamp for replies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl Message {
    /// Timestamp parsed for chronological comparison.
    /// Unparsable timestamps sort first rather than failing the batch.
    #[must_use]
    pub fn ts_seconds(&self) -> f64 {
        self.ts.parse::<f64>().unwrap_or(0.0)
    }
}

/// Per-author message count derived from one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Author display name (or raw id when name resolution failed)
    pub user: String,
    /// Number of messages by this author in the batch, always >= 1
    pub message_count: usize,
}

/// A finished daily digest for one channel.
///
/// Treated as a value: constructed once per (channel, date) generation and
/// never mutated. Regeneration after cache expiry produces a new value that
/// overwrites the cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDigest {
    /// Channel name as configured (without the leading `#`)
    pub channel_name: String,
    /// Calendar day covered, `YYYY-MM-DD` in UTC
    pub date: String,
    /// Number of messages summarized
    pub message_count: usize,
    /// Prose summary produced by the language model
    pub summary: String,
    /// Instant the digest was generated (ISO-8601)
    pub generated_at: DateTime<Utc>,
    /// Authors ranked by message count, ties by first appearance
    pub participants: Vec<Participant>,
}
