// ABOUTME: Unit tests for the in-memory cache backend behind the Cache facade
// ABOUTME: Covers TTL expiry, fail-soft disconnected behavior, and copy-on-read semantics
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde::{Deserialize, Serialize};
use slackfly::cache::{factory::Cache, CacheKey};
use slackfly::config::{CacheBackend, CacheSettings};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct TestData {
    value: String,
    tags: Vec<String>,
}

fn test_data(value: &str) -> TestData {
    TestData {
        value: value.to_owned(),
        tags: vec!["a".to_owned(), "b".to_owned()],
    }
}

fn memory_settings() -> CacheSettings {
    CacheSettings {
        backend: CacheBackend::Memory,
        // Disable the sweep task; expiry is still enforced lazily on access
        enable_background_sweep: false,
        ..Default::default()
    }
}

async fn connected_cache() -> Cache {
    let cache = Cache::from_settings(&memory_settings());
    cache.connect().await.expect("memory cache connect");
    cache
}

#[tokio::test]
async fn test_set_and_get_round_trip() {
    let cache = connected_cache().await;
    let key = CacheKey::messages("C1", "2025-04-25");
    let data = test_data("round-trip");

    assert!(cache.set(&key, &data, Some(Duration::from_secs(10))).await);

    let retrieved: Option<TestData> = cache.get(&key).await;
    assert_eq!(retrieved, Some(data));
}

#[tokio::test]
async fn test_get_returns_independent_copies() {
    let cache = connected_cache().await;
    let key = CacheKey::digest("C1", "2025-04-25");
    let data = test_data("original");

    cache.set(&key, &data, Some(Duration::from_secs(10))).await;

    // Mutating one retrieved copy must not affect later reads
    let mut first: TestData = cache.get(&key).await.expect("first read");
    first.value.push_str("-mutated");
    first.tags.clear();

    let second: TestData = cache.get(&key).await.expect("second read");
    assert_eq!(second, data);
}

#[tokio::test]
async fn test_expired_entry_is_absent() {
    let cache = connected_cache().await;
    let key = CacheKey::messages("C1", "2025-04-25");

    cache
        .set(&key, &test_data("expires"), Some(Duration::from_millis(50)))
        .await;
    assert!(cache.exists(&key).await);

    tokio::time::sleep(Duration::from_millis(80)).await;

    let retrieved: Option<TestData> = cache.get(&key).await;
    assert_eq!(retrieved, None);
    assert!(!cache.exists(&key).await);
}

#[tokio::test]
async fn test_ttl_reports_remaining_time() {
    let cache = connected_cache().await;
    let key = CacheKey::messages("C1", "2025-04-25");

    cache
        .set(&key, &test_data("ttl"), Some(Duration::from_secs(3600)))
        .await;

    let ttl = cache.ttl(&key).await.expect("entry should have a ttl");
    assert!(ttl.as_secs() <= 3600);
    assert!(ttl.as_secs() >= 3590);
}

#[tokio::test]
async fn test_del_removes_entry() {
    let cache = connected_cache().await;
    let key = CacheKey::digest("C1", "2025-04-25");

    cache
        .set(&key, &test_data("delete-me"), Some(Duration::from_secs(60)))
        .await;
    assert!(cache.exists(&key).await);

    assert!(cache.del(&key).await);
    assert!(!cache.exists(&key).await);
}

#[tokio::test]
async fn test_disconnected_operations_are_noops() {
    let cache = Cache::from_settings(&memory_settings());
    let key = CacheKey::messages("C1", "2025-04-25");

    // Never connected: every operation degrades to a negative result
    assert!(!cache.set(&key, &test_data("x"), Some(Duration::from_secs(10))).await);
    let got: Option<TestData> = cache.get(&key).await;
    assert_eq!(got, None);
    assert!(!cache.del(&key).await);
    assert!(!cache.exists(&key).await);
    assert_eq!(cache.ttl(&key).await, None);
}

#[tokio::test]
async fn test_disconnect_clears_state() {
    let cache = connected_cache().await;
    let key = CacheKey::messages("C1", "2025-04-25");

    cache
        .set(&key, &test_data("gone"), Some(Duration::from_secs(60)))
        .await;
    cache.disconnect().await;

    assert!(!cache.exists(&key).await);
    assert!(!cache.set(&key, &test_data("still gone"), None).await);
}

#[tokio::test]
async fn test_entry_without_ttl_does_not_expire() {
    let cache = connected_cache().await;
    let key = CacheKey::digest("C1", "2025-04-25");

    cache.set(&key, &test_data("persistent"), None).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(cache.exists(&key).await);
    assert_eq!(cache.ttl(&key).await, None);
}

#[tokio::test]
async fn test_key_families_do_not_collide() {
    let cache = connected_cache().await;
    let messages_key = CacheKey::messages("C1", "2025-04-25");
    let digest_key = CacheKey::digest("C1", "2025-04-25");

    cache
        .set(&messages_key, &test_data("batch"), Some(Duration::from_secs(60)))
        .await;

    assert!(cache.exists(&messages_key).await);
    assert!(!cache.exists(&digest_key).await);
}

#[tokio::test]
async fn test_background_sweep_removes_expired_entries() {
    let settings = CacheSettings {
        backend: CacheBackend::Memory,
        sweep_interval_secs: 1,
        enable_background_sweep: true,
        ..Default::default()
    };
    let cache = Cache::from_settings(&settings);
    cache.connect().await.expect("memory cache connect");

    let keys: Vec<CacheKey> = (0..5)
        .map(|i| CacheKey::messages("C1", format!("2025-04-{:02}", i + 1)))
        .collect();
    for key in &keys {
        cache
            .set(key, &test_data("sweep"), Some(Duration::from_millis(100)))
            .await;
    }

    // Wait past expiry plus at least one sweep cycle
    tokio::time::sleep(Duration::from_millis(2500)).await;

    for key in &keys {
        assert!(!cache.exists(key).await);
    }

    cache.disconnect().await;
}

#[tokio::test]
async fn test_memory_backend_health_check() {
    let cache = connected_cache().await;
    assert_eq!(cache.backend_name(), "memory");
    assert!(cache.health_check().await.is_ok());
}
