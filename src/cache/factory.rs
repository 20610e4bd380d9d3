// ABOUTME: Cache factory for configuration-based backend selection
// ABOUTME: Unified facade so callers never branch on the backend type
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::{memory::MemoryCache, redis::RedisCache, CacheKey, CacheProvider};
use crate::config::{CacheBackend, CacheSettings};
use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unified cache interface over the configured backend.
///
/// Built once at startup by [`Cache::from_settings`]; the rest of the system
/// only sees this type, so swapping backends never touches pipeline code.
#[derive(Clone)]
pub enum Cache {
    /// Process-local table with periodic sweep
    Memory(MemoryCache),
    /// Networked Redis store
    Redis(RedisCache),
}

impl Cache {
    /// Build the backend selected by configuration. Pure selection: no I/O
    /// happens until [`Cache::connect`].
    #[must_use]
    pub fn from_settings(settings: &CacheSettings) -> Self {
        match settings.backend {
            CacheBackend::Memory => {
                tracing::info!(
                    "Using in-memory cache backend (max entries: {})",
                    settings.max_entries
                );
                Self::Memory(MemoryCache::new(settings))
            }
            CacheBackend::Redis => {
                tracing::info!("Using Redis cache backend at {}", settings.redis_url);
                Self::Redis(RedisCache::new(settings.redis_url.clone()))
            }
        }
    }

    /// Backend name for health reporting
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }

    /// Establish the backend connection
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    pub async fn connect(&self) -> AppResult<()> {
        match self {
            Self::Memory(cache) => cache.connect().await,
            Self::Redis(cache) => cache.connect().await,
        }
    }

    /// Tear down the backend connection
    pub async fn disconnect(&self) {
        match self {
            Self::Memory(cache) => cache.disconnect().await,
            Self::Redis(cache) => cache.disconnect().await,
        }
    }

    /// Store a value with an optional TTL. Fail-soft: `false` on any failure.
    pub async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        match self {
            Self::Memory(cache) => cache.set(key, value, ttl).await,
            Self::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    /// Retrieve a value. `None` when absent, expired, or on failure.
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> Option<T> {
        match self {
            Self::Memory(cache) => cache.get(key).await,
            Self::Redis(cache) => cache.get(key).await,
        }
    }

    /// Remove a single entry
    pub async fn del(&self, key: &CacheKey) -> bool {
        match self {
            Self::Memory(cache) => cache.del(key).await,
            Self::Redis(cache) => cache.del(key).await,
        }
    }

    /// Check whether a live entry exists
    pub async fn exists(&self, key: &CacheKey) -> bool {
        match self {
            Self::Memory(cache) => cache.exists(key).await,
            Self::Redis(cache) => cache.exists(key).await,
        }
    }

    /// Remaining TTL for a key
    pub async fn ttl(&self, key: &CacheKey) -> Option<Duration> {
        match self {
            Self::Memory(cache) => cache.ttl(key).await,
            Self::Redis(cache) => cache.ttl(key).await,
        }
    }

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unhealthy.
    pub async fn health_check(&self) -> AppResult<()> {
        match self {
            Self::Memory(cache) => cache.health_check().await,
            Self::Redis(cache) => cache.health_check().await,
        }
    }
}
