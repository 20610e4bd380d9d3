// ABOUTME: In-memory cache implementation with TTL support and background sweep
// ABOUTME: Bounded by LRU eviction; values are stored as serialized bytes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use super::{CacheKey, CacheProvider};
use crate::config::CacheSettings;
use crate::errors::AppResult;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, RwLock};

/// In-memory cache entry with optional expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            data,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .and_then(|at| at.checked_duration_since(Instant::now()))
    }
}

/// Process-local cache backed by an LRU table.
///
/// Values are serialized on `set` and deserialized on `get`, so callers
/// always receive an independent copy. A background task sweeps expired
/// entries every sweep interval; expiry is also checked lazily on access,
/// so the sweep only reclaims memory and never affects correctness. No
/// await occurs between an expiry check and the eviction it triggers, which
/// keeps the sweep safe to race with concurrent reads and writes.
#[derive(Clone)]
pub struct MemoryCache {
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
    connected: Arc<AtomicBool>,
    sweep_interval: Duration,
    enable_sweep: bool,
    shutdown_tx: Arc<Mutex<Option<mpsc::Sender<()>>>>,
}

impl MemoryCache {
    /// Fallback capacity when configuration specifies zero entries
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a disconnected cache from settings
    #[must_use]
    pub fn new(settings: &CacheSettings) -> Self {
        let capacity = NonZeroUsize::new(settings.max_entries).unwrap_or(Self::DEFAULT_CAPACITY);

        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
            connected: Arc::new(AtomicBool::new(false)),
            sweep_interval: Duration::from_secs(settings.sweep_interval_secs),
            enable_sweep: settings.enable_background_sweep,
            shutdown_tx: Arc::new(Mutex::new(None)),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Remove all expired entries from the table
    async fn sweep_expired(store: &Arc<RwLock<LruCache<String, CacheEntry>>>) {
        let mut store_guard = store.write().await;

        let expired_keys: Vec<String> = store_guard
            .iter()
            .filter_map(|(k, v)| v.is_expired().then(|| k.clone()))
            .collect();

        for key in &expired_keys {
            store_guard.pop(key);
        }

        let removed = expired_keys.len();
        drop(store_guard);
        if removed > 0 {
            tracing::debug!("Swept {} expired cache entries", removed);
        }
    }
}

#[async_trait::async_trait]
impl CacheProvider for MemoryCache {
    async fn connect(&self) -> AppResult<()> {
        self.connected.store(true, Ordering::SeqCst);

        if self.enable_sweep {
            let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
            let store = self.store.clone();
            let sweep_interval = self.sweep_interval;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(sweep_interval);
                // The first tick fires immediately; skip it.
                interval.tick().await;
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            Self::sweep_expired(&store).await;
                        }
                        _ = shutdown_rx.recv() => {
                            tracing::debug!("Cache sweep task received shutdown signal");
                            break;
                        }
                    }
                }
            });

            *self.shutdown_tx.lock().await = Some(shutdown_tx);
        }

        tracing::info!("Memory cache connected");
        Ok(())
    }

    async fn disconnect(&self) {
        // Dropping the sender ends the sweep task on its next recv
        self.shutdown_tx.lock().await.take();
        self.store.write().await.clear();
        self.connected.store(false, Ordering::SeqCst);
        tracing::info!("Memory cache disconnected");
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        if !self.is_connected() {
            return false;
        }

        let serialized = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Memory cache SET serialization failed");
                return false;
            }
        };

        self.store
            .write()
            .await
            .push(key.to_string(), CacheEntry::new(serialized, ttl));
        true
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, key: &CacheKey) -> Option<T> {
        if !self.is_connected() {
            return None;
        }

        let key_str = key.to_string();
        let mut store = self.store.write().await;

        // LruCache::get is mutable (updates access order)
        if let Some(entry) = store.get(&key_str) {
            if entry.is_expired() {
                store.pop(&key_str);
                return None;
            }

            return match serde_json::from_slice(&entry.data) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Memory cache GET deserialization failed");
                    None
                }
            };
        }

        None
    }

    async fn del(&self, key: &CacheKey) -> bool {
        if !self.is_connected() {
            return false;
        }

        self.store.write().await.pop(&key.to_string());
        true
    }

    async fn exists(&self, key: &CacheKey) -> bool {
        if !self.is_connected() {
            return false;
        }

        let key_str = key.to_string();
        let mut store = self.store.write().await;
        if let Some(entry) = store.get(&key_str) {
            if entry.is_expired() {
                store.pop(&key_str);
                return false;
            }
            return true;
        }
        false
    }

    async fn ttl(&self, key: &CacheKey) -> Option<Duration> {
        if !self.is_connected() {
            return None;
        }

        let store = self.store.read().await;
        // peek avoids disturbing LRU order
        let entry = store.peek(&key.to_string())?;
        if entry.is_expired() {
            return None;
        }
        entry.remaining_ttl()
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}
