//! Plugin Cache - standalone cache host
//!
//! Runs the cache service on its own: useful for smoke-testing a configuration
//! (including a Redis backend) and watching statistics in the logs.

use std::env;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plugin_cache::{CacheConfig, CacheService};

/// Main entry point for the cache host.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build and start the cache service
/// 4. Log a health report
/// 5. Log statistics periodically until SIGINT/SIGTERM
/// 6. Stop and destroy the service
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plugin_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting plugin cache host");

    let config = CacheConfig::from_env().context("invalid cache configuration")?;
    info!(
        "Configuration loaded: backend={}, max_entries={}, default_ttl={:?}, sweep_interval_ms={:?}",
        config.backend, config.lru.max_entries, config.lru.default_ttl, config.lru.sweep_interval_ms
    );

    let stats_interval = Duration::from_secs(
        env::var("CACHE_STATS_LOG_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30),
    );

    let service = CacheService::new(config).context("failed to build cache backend")?;
    service
        .start()
        .await
        .context("failed to start cache service")?;

    let report = service.health_check().await;
    info!(status = ?report.status, latency_ms = report.latency_ms, "{}", report.message);

    let mut ticker = tokio::time::interval(stats_interval);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => match service.stats().await {
                Ok(Some(stats)) => info!(
                    hits = stats.hits,
                    misses = stats.misses,
                    evictions = stats.evictions,
                    size = ?stats.size,
                    hit_rate = stats.hit_rate,
                    "Cache statistics"
                ),
                Ok(None) => {}
                Err(err) => warn!("Failed to read cache statistics: {}", err),
            },
        }
    }

    service.stop().await;
    service
        .destroy()
        .await
        .context("failed to shut down cache service")?;

    info!("Cache host shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
