//! TTL Sweep Task
//!
//! Background task that periodically purges expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

// == Sweep Handle ==
/// Owner of a running sweep task.
///
/// `stop()` waits for the task to exit. Dropping the handle also ends the task,
/// since the stop channel closes.
#[derive(Debug)]
pub struct SweepHandle {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl SweepHandle {
    /// Signals the task and waits until it has fully exited.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(err) = self.handle.await {
            warn!("TTL sweep task ended abnormally: {}", err);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns a background task that purges expired entries every `period`.
///
/// Sweeps run one after another on a single task and take the same lock as
/// foreground operations, so a sweep never overlaps another sweep or a caller's
/// mutation. Ticks missed while a sweep holds the lock are skipped.
///
/// Must be called from within a Tokio runtime.
///
/// # Example
/// ```ignore
/// let store = Arc::new(Mutex::new(CacheStore::new(1000, None)?));
/// let sweeper = spawn_sweep_task(store.clone(), Duration::from_millis(500));
/// // Later, during shutdown:
/// sweeper.stop().await;
/// ```
pub fn spawn_sweep_task(store: Arc<Mutex<CacheStore>>, period: Duration) -> SweepHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        info!("Starting TTL sweep task with interval of {:?}", period);

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    let removed = store.lock().await.purge_expired();

                    if removed > 0 {
                        info!("TTL sweep: removed {} expired entries", removed);
                    } else {
                        debug!("TTL sweep: no expired entries found");
                    }
                }
            }
        }

        debug!("TTL sweep task stopped");
    });

    SweepHandle { stop_tx, handle }
}
