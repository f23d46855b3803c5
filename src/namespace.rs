//! Namespace Module
//!
//! Per-consumer key isolation over one shared backend.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::CacheBackend;
use crate::cache::CacheStats;
use crate::error::{CacheError, Result};

// == Scoped Cache ==
/// A consumer's private view of a shared backend.
///
/// Every key is rewritten to `<namespace>:<key>` before it reaches the backend.
/// The handle stores nothing itself, so it can be shared freely; all mutation
/// goes through the backend's own locking.
pub struct ScopedCache {
    namespace: String,
    backend: Arc<dyn CacheBackend>,
}

impl ScopedCache {
    pub fn new(backend: Arc<dyn CacheBackend>, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            backend,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The key as stored in the shared backend.
    pub fn scoped_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

impl fmt::Debug for ScopedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCache")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheBackend for ScopedCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.backend.get(&self.scoped_key(key)).await
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: Option<i64>) -> Result<()> {
        self.backend
            .set(&self.scoped_key(key), value, ttl_seconds)
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.backend.delete(&self.scoped_key(key)).await
    }

    async fn has(&self, key: &str) -> Result<bool> {
        self.backend.has(&self.scoped_key(key)).await
    }

    /// Always fails: the shared backend keeps no per-namespace index, so clearing
    /// one namespace would mean scanning every key. Delete keys individually.
    async fn clear(&self) -> Result<()> {
        Err(CacheError::Unsupported(format!(
            "clear() is not supported on scoped cache '{}': the shared backend cannot \
             enumerate keys under the '{}:' prefix efficiently; delete keys individually",
            self.namespace, self.namespace
        )))
    }

    /// Global statistics of the shared backend; hits and misses are not attributed
    /// per namespace.
    async fn stats(&self) -> Result<CacheStats> {
        self.backend.stats().await
    }

    async fn probe(&self, key: &str, value: Value, ttl_seconds: Option<i64>) -> Result<bool> {
        self.backend
            .probe(&self.scoped_key(key), value, ttl_seconds)
            .await
    }

    async fn close(&self) -> Result<()> {
        // The backend belongs to the service, not to the handle
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LruBackend;
    use crate::config::LruOptions;
    use serde_json::json;

    fn shared() -> Arc<dyn CacheBackend> {
        Arc::new(LruBackend::new(&LruOptions::default()).unwrap())
    }

    #[test]
    fn test_scoped_key() {
        let scoped = ScopedCache::new(shared(), "plugin1");
        assert_eq!(scoped.namespace(), "plugin1");
        assert_eq!(scoped.scoped_key("user:42"), "plugin1:user:42");
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let backend = shared();
        let a = ScopedCache::new(backend.clone(), "a");
        let b = ScopedCache::new(backend.clone(), "b");

        a.set("key", json!("valueA"), None).await.unwrap();
        b.set("key", json!("valueB"), None).await.unwrap();

        assert_eq!(a.get("key").await.unwrap(), Some(json!("valueA")));
        assert_eq!(b.get("key").await.unwrap(), Some(json!("valueB")));
        assert_eq!(backend.stats().await.unwrap().size, Some(2));
        assert_eq!(backend.get("a:key").await.unwrap(), Some(json!("valueA")));
    }

    #[tokio::test]
    async fn test_delete_and_has_are_scoped() {
        let backend = shared();
        let a = ScopedCache::new(backend.clone(), "a");
        let b = ScopedCache::new(backend.clone(), "b");

        a.set("key", json!(1), None).await.unwrap();

        assert!(!b.has("key").await.unwrap());
        assert!(!b.delete("key").await.unwrap());
        assert!(a.has("key").await.unwrap());
        assert!(a.delete("key").await.unwrap());
        assert!(!backend.has("a:key").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_is_unsupported() {
        let backend = shared();
        let scoped = ScopedCache::new(backend.clone(), "plugin1");
        scoped.set("key", json!(1), None).await.unwrap();

        let err = scoped.clear().await.unwrap_err();

        assert!(matches!(err, CacheError::Unsupported(_)));
        assert!(err.to_string().contains("delete keys individually"));
        // Nothing was removed
        assert!(scoped.has("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_are_global() {
        let backend = shared();
        let a = ScopedCache::new(backend.clone(), "a");
        let b = ScopedCache::new(backend.clone(), "b");

        a.set("key", json!(1), None).await.unwrap();
        a.get("key").await.unwrap();
        b.get("key").await.unwrap();

        let from_a = a.stats().await.unwrap();
        assert_eq!(from_a, b.stats().await.unwrap());
        assert_eq!(from_a.hits, 1);
        assert_eq!(from_a.misses, 1);
    }

    #[tokio::test]
    async fn test_close_leaves_backend_intact() {
        let backend = shared();
        let scoped = ScopedCache::new(backend.clone(), "a");
        scoped.set("key", json!(1), None).await.unwrap();

        scoped.close().await.unwrap();

        assert!(backend.has("a:key").await.unwrap());
    }
}
