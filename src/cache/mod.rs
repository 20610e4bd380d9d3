// ABOUTME: Cache abstraction layer with pluggable backends for digest storage
// ABOUTME: One capability contract satisfied by in-process and Redis implementations
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Cache Abstraction Layer
//!
//! Key/value storage with per-key expiration behind one capability contract.
//! Two interchangeable backends: a process-local table with a periodic sweep
//! ([`memory::MemoryCache`]) and a networked Redis store
//! ([`redis::RedisCache`]). Swapping backends must not change pipeline
//! behavior; the seam lets the system run with zero external dependencies in
//! tests and development.
//!
//! The cache is a performance layer, not a source of truth, so every data
//! operation is fail-soft: not-connected, serialization, and transport
//! failures are logged and degrade to a negative result (`false` / `None`).
//! Values round-trip through serialized bytes on both `set` and `get`, so a
//! caller can never mutate cached state through a live reference.

/// Cache factory for backend selection
pub mod factory;
/// In-memory cache implementation
pub mod memory;
/// Redis cache implementation
pub mod redis;

use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Cache provider trait for pluggable backend implementations
///
/// Data operations never fail: when the backend is unavailable they return
/// a negative result and the pipeline proceeds as if the cache were empty.
#[async_trait::async_trait]
pub trait CacheProvider: Send + Sync {
    /// Establish the backend connection and start maintenance tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn connect(&self) -> AppResult<()>;

    /// Tear down the connection. Data operations afterwards are no-ops.
    async fn disconnect(&self);

    /// Store a value with an optional TTL. Returns `false` on any failure.
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool;

    /// Retrieve a value. Returns `None` when absent, expired, or on failure.
    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> Option<T>;

    /// Remove a single entry. Returns `false` on failure.
    async fn del(&self, key: &CacheKey) -> bool;

    /// Check whether a live (non-expired) entry exists for the key
    async fn exists(&self, key: &CacheKey) -> bool;

    /// Remaining TTL for a key, `None` when absent or without expiry
    async fn ttl(&self, key: &CacheKey) -> Option<Duration>;

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unhealthy.
    async fn health_check(&self) -> AppResult<()>;
}

/// Structured cache key for the two key families used by the pipeline.
///
/// The rendered form is the storage key: `channel:<id>:<date>` for raw
/// message batches and `digest:<id>:<date>` for finished digests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Raw enriched message batch for one channel and calendar day
    ChannelMessages {
        /// Platform channel id
        channel_id: String,
        /// Calendar day, `YYYY-MM-DD` UTC
        date: String,
    },
    /// Finished digest for one channel and calendar day
    Digest {
        /// Platform channel id
        channel_id: String,
        /// Calendar day, `YYYY-MM-DD` UTC
        date: String,
    },
}

impl CacheKey {
    /// Key for a channel's message batch on a given day
    #[must_use]
    pub fn messages(channel_id: impl Into<String>, date: impl Into<String>) -> Self {
        Self::ChannelMessages {
            channel_id: channel_id.into(),
            date: date.into(),
        }
    }

    /// Key for a channel's finished digest on a given day
    #[must_use]
    pub fn digest(channel_id: impl Into<String>, date: impl Into<String>) -> Self {
        Self::Digest {
            channel_id: channel_id.into(),
            date: date.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelMessages { channel_id, date } => {
                write!(f, "channel:{channel_id}:{date}")
            }
            Self::Digest { channel_id, date } => write!(f, "digest:{channel_id}:{date}"),
        }
    }
}
