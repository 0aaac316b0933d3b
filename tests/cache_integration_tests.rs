//! Integration tests for the TTL cache facade
//!
//! Exercises the facade end to end against the in-memory driver, plus the
//! store-failure policy toggle against a driver that always fails.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::sleep;

use doc_ttl_cache::{
    CacheConfig, CacheError, DeleteResult, Document, DocumentCollection, Filter, MemoryStore,
    StoreDriver, StoreError, StoreResult, TtlCache,
};

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_ttl_cache=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

// == Failing Driver ==
/// A collection handle whose every operation fails, simulating a store outage.
#[derive(Clone)]
struct FailingCollection;

#[async_trait]
impl DocumentCollection for FailingCollection {
    async fn upsert(&self, _filter: Filter, _replacement: Document) -> StoreResult<Option<Document>> {
        Err(StoreError::new("injected outage"))
    }

    async fn find_one(&self, _filter: Filter) -> StoreResult<Option<Document>> {
        Err(StoreError::new("injected outage"))
    }

    async fn delete_one(&self, _filter: Filter) -> StoreResult<DeleteResult> {
        Err(StoreError::new("injected outage"))
    }

    async fn delete_many(&self, _filter: Filter) -> StoreResult<DeleteResult> {
        Err(StoreError::new("injected outage"))
    }
}

struct FailingDriver;

impl StoreDriver for FailingDriver {
    type Collection = FailingCollection;

    fn collection(&self, _name: &str) -> FailingCollection {
        FailingCollection
    }
}

// == End-To-End Behavior ==

#[tokio::test]
async fn full_lifecycle_set_get_del_flush() {
    init_tracing();
    let store = MemoryStore::new();
    let config = CacheConfig {
        collection_name: "sessions".to_string(),
        ..CacheConfig::default()
    };
    let cache = TtlCache::open(&store, config).await.unwrap();

    cache.set("a", json!({"n": 1})).await.unwrap();
    cache.set("b", "two").await.unwrap();
    assert_eq!(cache.get("a").await.unwrap(), Some(json!({"n": 1})));

    cache.del("a").await.unwrap();
    assert_eq!(cache.get("a").await.unwrap(), None);
    assert_eq!(cache.get("b").await.unwrap(), Some(json!("two")));

    cache.flush().await.unwrap();
    assert_eq!(cache.get("b").await.unwrap(), None);
    assert_eq!(store.collection("sessions").len().await, 0);
}

#[tokio::test]
async fn sweep_empties_store_without_any_reads() {
    init_tracing();
    let store = MemoryStore::new();
    let config = CacheConfig {
        ttl: 0.3,
        check_period: 0.3,
        ..CacheConfig::default()
    };
    let collection = store.collection(&config.collection_name);
    let cache = TtlCache::open(&store, config).await.unwrap();

    for index in 0..5 {
        cache.set(&format!("key{index}"), index).await.unwrap();
    }
    assert_eq!(collection.len().await, 5);

    // Past ttl + check_period, the sweep alone must have drained the store
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(collection.len().await, 0);
    assert!(!cache.sweep_active().await);
}

#[tokio::test]
async fn expired_entry_is_absent_and_removed_on_read() {
    init_tracing();
    let store = MemoryStore::new();
    let config = CacheConfig {
        ttl: 0.3,
        check_period: 60.0,
        ..CacheConfig::default()
    };
    let collection = store.collection(&config.collection_name);
    let cache = TtlCache::open(&store, config).await.unwrap();

    cache.set("k", "v").await.unwrap();
    sleep(Duration::from_millis(450)).await;

    // The sweep period is far away, so only the lazy path can clean up
    assert_eq!(cache.get("k").await.unwrap(), None);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(collection.len().await, 0);

    cache.flush().await.unwrap();
}

#[tokio::test]
async fn flush_on_create_starts_from_an_empty_collection() {
    init_tracing();
    let store = MemoryStore::new();
    let first = TtlCache::open(&store, CacheConfig::default()).await.unwrap();
    first.set("stale", 1).await.unwrap();
    first.flush().await.unwrap();
    first.set("stale-again", 2).await.unwrap();

    let config = CacheConfig {
        flush_on_create: true,
        ..CacheConfig::default()
    };
    let fresh = TtlCache::open(&store, config).await.unwrap();

    assert_eq!(fresh.get("stale-again").await.unwrap(), None);
    assert_eq!(store.collection("cache").len().await, 0);
}

// == Store Failure Policy ==

#[tokio::test]
async fn store_failures_propagate_by_default() {
    init_tracing();
    let cache = TtlCache::open(&FailingDriver, CacheConfig::default())
        .await
        .unwrap();

    assert!(matches!(cache.set("k", 1).await, Err(CacheError::Store(_))));
    assert!(matches!(cache.get("k").await, Err(CacheError::Store(_))));
    assert!(matches!(cache.del("k").await, Err(CacheError::Store(_))));
    assert!(matches!(cache.flush().await, Err(CacheError::Store(_))));
}

#[tokio::test]
async fn store_failures_are_swallowed_when_ignored() {
    init_tracing();
    let config = CacheConfig {
        ignore_store_error: true,
        ..CacheConfig::default()
    };
    let cache = TtlCache::open(&FailingDriver, config).await.unwrap();

    // Every operation degrades to "no result" instead of failing
    assert_eq!(cache.set("k", 1).await.unwrap(), None);
    assert_eq!(cache.get("k").await.unwrap(), None);
    assert_eq!(cache.del("k").await.unwrap(), None);
    assert_eq!(cache.flush().await.unwrap(), None);

    // A swallowed set still arms the sweep for when the store comes back
    cache.set("k", 2).await.unwrap();
    assert!(cache.sweep_active().await);
    cache.flush().await.unwrap();
    assert!(!cache.sweep_active().await);
}

#[tokio::test]
async fn flush_on_create_surfaces_store_failure() {
    init_tracing();
    let config = CacheConfig {
        flush_on_create: true,
        ..CacheConfig::default()
    };

    let result = TtlCache::open(&FailingDriver, config).await;
    assert!(matches!(result, Err(CacheError::Store(_))));
}
