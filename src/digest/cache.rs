// ABOUTME: Channel/date-keyed storage of message batches and finished digests
// ABOUTME: Owns the freshness policy: 1h for a live day, 24h for a closed day, 7d for digests
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::{date_string, utc_today};
use crate::cache::{factory::Cache, CacheKey};
use crate::constants::cache::{
    TTL_DIGEST_SECS, TTL_MESSAGES_CLOSED_DAY_SECS, TTL_MESSAGES_TODAY_SECS,
};
use crate::models::{ChannelDigest, Message};
use chrono::NaiveDate;
use std::time::Duration;
use tracing::debug;

/// Digest-specific view over the generic cache store.
///
/// The TTL tiers are load-bearing: a batch for the current UTC day expires
/// after one hour because the day is still accumulating messages, while a
/// closed day's batch is immutable and keeps for 24 hours. Finished digests
/// always keep for seven days.
#[derive(Clone)]
pub struct DigestCache {
    cache: Cache,
}

impl DigestCache {
    /// Wrap a connected cache backend
    #[must_use]
    pub const fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Access the underlying store (health checks, tests)
    #[must_use]
    pub const fn store(&self) -> &Cache {
        &self.cache
    }

    /// Cached message batch for a channel and day, if present
    pub async fn messages(&self, channel_id: &str, date: NaiveDate) -> Option<Vec<Message>> {
        self.cache
            .get(&CacheKey::messages(channel_id, date_string(date)))
            .await
    }

    /// Store a message batch with the TTL tier for its date.
    /// Empty batches must not be stored; callers skip them so a transient
    /// platform hiccup cannot pin an empty result for the TTL window.
    pub async fn store_messages(
        &self,
        channel_id: &str,
        date: NaiveDate,
        messages: &[Message],
    ) -> bool {
        let is_today = date == utc_today();
        let ttl_secs = if is_today {
            TTL_MESSAGES_TODAY_SECS
        } else {
            TTL_MESSAGES_CLOSED_DAY_SECS
        };

        debug!(
            channel_id,
            date = %date_string(date),
            ttl_secs,
            "Caching message batch ({})",
            if is_today { "live day" } else { "closed day" }
        );

        self.cache
            .set(
                &CacheKey::messages(channel_id, date_string(date)),
                &messages,
                Some(Duration::from_secs(ttl_secs)),
            )
            .await
    }

    /// Cached digest for a channel and day, if present
    pub async fn digest(&self, channel_id: &str, date: NaiveDate) -> Option<ChannelDigest> {
        self.cache
            .get(&CacheKey::digest(channel_id, date_string(date)))
            .await
    }

    /// Store a finished digest with the fixed digest TTL
    pub async fn store_digest(
        &self,
        channel_id: &str,
        date: NaiveDate,
        digest: &ChannelDigest,
    ) -> bool {
        self.cache
            .set(
                &CacheKey::digest(channel_id, date_string(date)),
                digest,
                Some(Duration::from_secs(TTL_DIGEST_SECS)),
            )
            .await
    }
}
