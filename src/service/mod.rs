//! Cache Service Module
//!
//! The externally visible cache facade: owns the backend, hands out namespace
//! handles, reports statistics and health, and drives the lifecycle.

mod health;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::backend::{build_backend, CacheBackend};
use crate::cache::CacheStats;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::namespace::ScopedCache;

pub use health::{HealthReport, HealthStatus, HEALTH_CHECK_PREFIX, HEALTH_CHECK_TTL_SECS};

/// Name under which collaborators address the cache service.
pub const SERVICE_NAME: &str = "cache";

// == Lifecycle State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initialized,
    Running,
    Stopped,
    Destroyed,
}

// == Cache Service ==
/// Single entry point to the cache.
///
/// The unscoped `get`/`set`/... methods operate on raw backend keys and are meant
/// for the host itself; consumers should go through [`CacheService::scoped_cache`].
pub struct CacheService {
    config: CacheConfig,
    backend: Arc<dyn CacheBackend>,
    scoped: Mutex<HashMap<String, Arc<ScopedCache>>>,
    state: Mutex<LifecycleState>,
    probe_seq: AtomicU64,
}

impl CacheService {
    // == Constructor ==
    /// Builds the configured backend. Bad configuration fails here, not on first use.
    pub fn new(config: CacheConfig) -> Result<Self> {
        let backend = build_backend(&config)?;
        info!(backend = %config.backend, enable_stats = config.enable_stats, "Cache service created");

        Ok(Self {
            config,
            backend,
            scoped: Mutex::new(HashMap::new()),
            state: Mutex::new(LifecycleState::Created),
            probe_seq: AtomicU64::new(0),
        })
    }

    /// Wraps an already-built backend.
    pub fn with_backend(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            scoped: Mutex::new(HashMap::new()),
            state: Mutex::new(LifecycleState::Created),
            probe_seq: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    /// The shared backend, for collaborators that need the raw contract.
    pub fn backend(&self) -> Arc<dyn CacheBackend> {
        self.backend.clone()
    }

    // == Lifecycle ==
    /// Connects the backend if it needs a connection. Idempotent.
    pub async fn init(&self) -> Result<()> {
        if matches!(
            self.state(),
            LifecycleState::Initialized | LifecycleState::Running
        ) {
            return Ok(());
        }

        self.backend.connect().await?;
        *lock(&self.state) = LifecycleState::Initialized;
        info!(service = SERVICE_NAME, backend = %self.config.backend, "Cache service initialized");
        Ok(())
    }

    /// Marks the service running, initializing it first if needed.
    pub async fn start(&self) -> Result<()> {
        match self.state() {
            LifecycleState::Running => return Ok(()),
            LifecycleState::Initialized | LifecycleState::Stopped => {}
            LifecycleState::Created | LifecycleState::Destroyed => self.init().await?,
        }
        *lock(&self.state) = LifecycleState::Running;
        info!(service = SERVICE_NAME, "Cache service started");
        Ok(())
    }

    pub async fn stop(&self) {
        let mut state = lock(&self.state);
        if *state == LifecycleState::Running {
            *state = LifecycleState::Stopped;
            info!(service = SERVICE_NAME, "Cache service stopped");
        }
    }

    /// Closes the backend (stopping any sweep) and drops every namespace handle.
    ///
    /// Safe to call without `init`, and more than once.
    pub async fn destroy(&self) -> Result<()> {
        if self.state() == LifecycleState::Destroyed {
            return Ok(());
        }

        self.backend.close().await?;
        lock(&self.scoped).clear();
        *lock(&self.state) = LifecycleState::Destroyed;
        info!(service = SERVICE_NAME, "Cache service destroyed");
        Ok(())
    }

    // == Unscoped Operations ==
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.backend.get(key).await
    }

    pub async fn set(&self, key: &str, value: Value, ttl_seconds: Option<i64>) -> Result<()> {
        self.backend.set(key, value, ttl_seconds).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.backend.delete(key).await
    }

    pub async fn has(&self, key: &str) -> Result<bool> {
        self.backend.has(key).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    // == Scoped Handles ==
    /// Returns the namespace handle for `consumer_id`.
    ///
    /// Handles are memoized: the same id always yields the same `Arc`.
    pub fn scoped_cache(&self, consumer_id: &str) -> Arc<ScopedCache> {
        lock(&self.scoped)
            .entry(consumer_id.to_string())
            .or_insert_with(|| Arc::new(ScopedCache::new(self.backend.clone(), consumer_id)))
            .clone()
    }

    // == Stats ==
    /// Backend statistics, or None when statistics are disabled.
    pub async fn stats(&self) -> Result<Option<CacheStats>> {
        if !self.config.enable_stats {
            return Ok(None);
        }
        self.backend.stats().await.map(Some)
    }

    // == Health Check ==
    /// Writes a sentinel with a short TTL, reads it back and deletes it.
    ///
    /// The round trip goes through [`CacheBackend::probe`], so the in-process
    /// store neither evicts for the sentinel nor counts it. Never fails: backend errors become an `Unhealthy` report. The sentinel is
    /// deleted whatever the outcome.
    pub async fn health_check(&self) -> HealthReport {
        let started = Instant::now();
        let seq = self.probe_seq.fetch_add(1, Ordering::Relaxed);
        let key = format!(
            "{}{}:{}",
            HEALTH_CHECK_PREFIX,
            chrono::Utc::now().timestamp_millis(),
            seq
        );
        let probe = json!({ "probe": key });

        let round_trip = self
            .backend
            .probe(&key, probe, Some(HEALTH_CHECK_TTL_SECS))
            .await;
        let cleanup = self.backend.delete(&key).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let report = match (round_trip, cleanup) {
            (Err(err), _) => HealthReport::new(
                HealthStatus::Unhealthy,
                format!("cache backend unavailable: {}", err),
                latency_ms,
            ),
            (Ok(false), _) => HealthReport::new(
                HealthStatus::Degraded,
                "cache read-back did not match the value written",
                latency_ms,
            ),
            (Ok(true), Err(err)) => HealthReport::new(
                HealthStatus::Degraded,
                format!("round trip succeeded but sentinel cleanup failed: {}", err),
                latency_ms,
            ),
            (Ok(true), Ok(_)) => {
                HealthReport::new(HealthStatus::Healthy, "cache round trip succeeded", latency_ms)
            }
        };

        if !report.is_healthy() {
            warn!(status = ?report.status, message = %report.message, "Cache health check failed");
        }
        report
    }
}

impl fmt::Debug for CacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheService")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("scoped_handles", &lock(&self.scoped).len())
            .finish_non_exhaustive()
    }
}

// A panic while holding one of these locks cannot leave the map or state half-updated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
