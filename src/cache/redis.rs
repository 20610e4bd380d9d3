// ABOUTME: Redis cache implementation with connection pooling and TTL support
// ABOUTME: Delegates expiry to the Redis server; data operations are fail-soft
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::{CacheKey, CacheProvider};
use crate::constants::cache::CACHE_KEY_PREFIX;
use crate::errors::{AppError, AppResult};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Connection timeout for the initial Redis handshake
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Per-command response timeout
const RESPONSE_TIMEOUT_SECS: u64 = 5;

/// Retries attempted when establishing the initial connection
const INITIAL_CONNECTION_RETRIES: u32 = 3;

/// Starting delay for the connect retry backoff
const INITIAL_RETRY_DELAY_MS: u64 = 500;

/// Upper bound on the connect retry backoff
const MAX_RETRY_DELAY_MS: u64 = 5_000;

/// Redis-backed cache.
///
/// Uses a `ConnectionManager` for automatic reconnection. All keys carry the
/// `slackfly:` namespace prefix so the store can be shared. TTLs are applied
/// server-side with `SETEX`. Until [`CacheProvider::connect`] succeeds, all
/// data operations return negative results.
#[derive(Clone)]
pub struct RedisCache {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

impl RedisCache {
    /// Create a disconnected cache for the given Redis URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            manager: Arc::new(RwLock::new(None)),
        }
    }

    /// Clone the live connection, if connected
    async fn connection(&self) -> Option<ConnectionManager> {
        self.manager.read().await.clone()
    }

    /// Connect with exponential backoff retry on failure
    async fn connect_with_retry(client: &redis::Client) -> AppResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
            .set_response_timeout(Duration::from_secs(RESPONSE_TIMEOUT_SECS));

        let mut last_error = None;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;

        for attempt in 0..=INITIAL_CONNECTION_RETRIES {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {} retries", attempt);
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    if attempt < INITIAL_CONNECTION_RETRIES {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {}ms: {}",
                            attempt + 1,
                            INITIAL_CONNECTION_RETRIES + 1,
                            delay_ms,
                            e
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(MAX_RETRY_DELAY_MS);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::internal(format!(
            "Failed to connect to Redis after {} attempts: {}",
            INITIAL_CONNECTION_RETRIES + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }

    /// Build the full Redis key with namespace prefix
    fn build_key(key: &CacheKey) -> String {
        format!("{CACHE_KEY_PREFIX}{key}")
    }
}

#[async_trait::async_trait]
impl CacheProvider for RedisCache {
    async fn connect(&self) -> AppResult<()> {
        info!("Connecting to Redis at {}", self.url);

        let client = redis::Client::open(self.url.as_str())
            .map_err(|e| AppError::internal(format!("Failed to create Redis client: {e}")))?;

        let manager = Self::connect_with_retry(&client).await?;
        *self.manager.write().await = Some(manager);

        info!("Successfully connected to Redis");
        Ok(())
    }

    async fn disconnect(&self) {
        self.manager.write().await.take();
        info!("Redis disconnected");
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let serialized = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(key = %key, error = %e, "Redis SET serialization failed");
                return false;
            }
        };

        let redis_key = Self::build_key(key);
        let result = match ttl {
            // SETEX stores value and expiry in one atomic operation
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(&redis_key, serialized, ttl.as_secs())
                    .await
            }
            None => conn.set::<_, _, ()>(&redis_key, serialized).await,
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                error!(key = %key, error = %e, "Redis SET operation failed");
                false
            }
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> Option<T> {
        let Some(mut conn) = self.connection().await else {
            return None;
        };

        let redis_key = Self::build_key(key);
        let data: Option<Vec<u8>> = match conn.get(&redis_key).await {
            Ok(data) => data,
            Err(e) => {
                error!(key = %key, error = %e, "Redis GET operation failed");
                return None;
            }
        };

        let bytes = data?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(key = %key, error = %e, "Redis GET deserialization failed");
                None
            }
        }
    }

    async fn del(&self, key: &CacheKey) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let redis_key = Self::build_key(key);
        match conn.del::<_, ()>(&redis_key).await {
            Ok(()) => true,
            Err(e) => {
                error!(key = %key, error = %e, "Redis DEL operation failed");
                false
            }
        }
    }

    async fn exists(&self, key: &CacheKey) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let redis_key = Self::build_key(key);
        match conn.exists::<_, bool>(&redis_key).await {
            Ok(exists) => exists,
            Err(e) => {
                error!(key = %key, error = %e, "Redis EXISTS operation failed");
                false
            }
        }
    }

    async fn ttl(&self, key: &CacheKey) -> Option<Duration> {
        let Some(mut conn) = self.connection().await else {
            return None;
        };

        let redis_key = Self::build_key(key);
        let ttl_secs: i64 = match conn.ttl(&redis_key).await {
            Ok(secs) => secs,
            Err(e) => {
                error!(key = %key, error = %e, "Redis TTL operation failed");
                return None;
            }
        };

        // Redis returns -2 when the key is absent, -1 when it has no expiry
        match ttl_secs {
            secs if secs > 0 => Some(Duration::from_secs(secs as u64)),
            _ => None,
        }
    }

    async fn health_check(&self) -> AppResult<()> {
        let Some(mut conn) = self.connection().await else {
            return Err(AppError::internal("Redis cache is not connected"));
        };

        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                error!("Redis PING failed: {}", e);
                AppError::internal(format!("Cache error: {e}"))
            })?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::internal(format!(
                "Cache error: unexpected PING response '{response}'"
            )))
        }
    }
}
