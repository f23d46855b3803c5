//! In-memory LRU backend
//!
//! Shares one [`CacheStore`] behind a single async mutex and owns the optional
//! TTL sweep task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::backend::CacheBackend;
use crate::cache::{CacheEntry, CacheStats, CacheStore};
use crate::config::LruOptions;
use crate::error::Result;
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == LRU Backend ==
/// Capacity-bounded in-process backend.
///
/// The key map and the access order live in the same `CacheStore`, so the one
/// mutex guards both. Every operation completes under a single lock acquisition.
pub struct LruBackend {
    store: Arc<Mutex<CacheStore>>,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl LruBackend {
    /// Creates the backend and, if a sweep interval is configured, starts the sweep.
    pub fn new(options: &LruOptions) -> Result<Self> {
        let store = Arc::new(Mutex::new(CacheStore::from_options(options)?));

        let sweeper = options
            .sweep_interval()
            .map(|ms| spawn_sweep_task(store.clone(), Duration::from_millis(ms)));

        info!(
            max_entries = options.max_entries,
            default_ttl = ?options.default_ttl,
            sweep_interval_ms = ?options.sweep_interval(),
            "LRU cache backend created"
        );

        Ok(Self {
            store,
            sweeper: Mutex::new(sweeper),
        })
    }

    /// Entry metadata for `key`, without promotion or stats effects.
    pub async fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.store.lock().await.peek(key).cloned()
    }

    /// Runs one expiry sweep immediately. Returns the number of purged entries.
    pub async fn purge_expired(&self) -> usize {
        self.store.lock().await.purge_expired()
    }

    /// True while a background sweep task is running.
    pub async fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[async_trait]
impl CacheBackend for LruBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.store.lock().await.get(key))
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: Option<i64>) -> Result<()> {
        let evicted = self.store.lock().await.set(key, value, ttl_seconds)?;
        if let Some(evicted_key) = evicted {
            debug!(key = %evicted_key, "evicted least recently used entry");
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.store.lock().await.delete(key))
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.store.lock().await.has(key))
    }

    async fn clear(&self) -> Result<()> {
        self.store.lock().await.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        Ok(self.store.lock().await.stats())
    }

    /// Round trip under one lock, without evicting or counting.
    async fn probe(&self, key: &str, value: Value, ttl_seconds: Option<i64>) -> Result<bool> {
        self.store
            .lock()
            .await
            .probe_roundtrip(key, value, ttl_seconds)
    }

    async fn close(&self) -> Result<()> {
        // Take the handle first so the sweeper lock is not held across the join
        let sweeper = self.sweeper.lock().await.take();
        if let Some(handle) = sweeper {
            handle.stop().await;
            info!("LRU cache sweep stopped");
        }
        self.store.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use serde_json::json;

    fn backend(max_entries: usize) -> LruBackend {
        LruBackend::new(&LruOptions {
            max_entries,
            ..LruOptions::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_backend_roundtrip() {
        let cache = backend(10);

        cache.set("k", json!({"n": 1}), None).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(json!({"n": 1})));
        assert!(cache.has("k").await.unwrap());
        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_backend_rejects_negative_ttl() {
        let cache = backend(10);

        let result = cache.set("k", json!(1), Some(-1)).await;

        assert!(matches!(result, Err(CacheError::InvalidTtl(-1))));
        assert!(!cache.has("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_backend_promotion_on_read() {
        let cache = backend(2);

        cache.set("A", json!(1), None).await.unwrap();
        cache.set("B", json!(2), None).await.unwrap();
        cache.get("A").await.unwrap();
        cache.set("C", json!(3), None).await.unwrap();

        assert!(cache.has("A").await.unwrap());
        assert!(!cache.has("B").await.unwrap());
        assert_eq!(cache.stats().await.unwrap().evictions, 1);
    }

    #[tokio::test]
    async fn test_backend_peek_reports_access_count() {
        let cache = backend(10);

        cache.set("k", json!(1), None).await.unwrap();
        cache.get("k").await.unwrap();
        cache.get("k").await.unwrap();

        let entry = cache.peek("k").await.unwrap();
        assert_eq!(entry.access_count, 2);
        assert!(entry.accessed_at >= entry.created_at);
    }

    #[tokio::test]
    async fn test_backend_probe_on_full_store() {
        let cache = backend(2);

        cache.set("a", json!(1), None).await.unwrap();
        cache.set("b", json!(2), None).await.unwrap();

        assert!(cache.probe("sentinel", json!("x"), Some(10)).await.unwrap());

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats, CacheStats::new(0, 0, 0, Some(2)));
        assert!(cache.has("a").await.unwrap());
        assert!(cache.has("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_backend_without_sweep_interval() {
        let cache = backend(10);
        assert!(!cache.is_sweeping().await);
    }

    #[tokio::test]
    async fn test_backend_sweep_purges_untouched_entries() {
        let cache = LruBackend::new(&LruOptions {
            sweep_interval_ms: Some(100),
            ..LruOptions::default()
        })
        .unwrap();
        assert!(cache.is_sweeping().await);

        cache.set("short", json!(1), Some(1)).await.unwrap();
        cache.set("long", json!(2), None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1400)).await;

        assert!(cache.peek("short").await.is_none());
        assert!(cache.peek("long").await.is_some());

        cache.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_close_stops_sweep_and_empties() {
        let cache = LruBackend::new(&LruOptions {
            sweep_interval_ms: Some(50),
            ..LruOptions::default()
        })
        .unwrap();
        cache.set("k", json!(1), None).await.unwrap();

        cache.close().await.unwrap();

        assert!(!cache.is_sweeping().await);
        assert_eq!(cache.stats().await.unwrap().size, Some(0));
        // The sweep task has released its handle on the store
        assert_eq!(Arc::strong_count(&cache.store), 1);

        // Idempotent, and the backend is reusable afterwards
        cache.close().await.unwrap();
        cache.set("again", json!(2), None).await.unwrap();
        assert!(cache.has("again").await.unwrap());
    }

    #[tokio::test]
    async fn test_backend_concurrent_writers_respect_capacity() {
        let cache = Arc::new(backend(16));

        let mut tasks = Vec::new();
        for worker in 0..8 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    let key = format!("w{}-{}", worker, i);
                    cache.set(&key, json!(i), None).await.unwrap();
                    cache.get(&key).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.size, Some(16));
        assert_eq!(stats.evictions, 8 * 50 - 16);
        assert_eq!(stats.hits + stats.misses, 8 * 50);
    }
}
