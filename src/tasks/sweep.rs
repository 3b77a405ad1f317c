//! Cache Sweep Task
//!
//! Background task that periodically removes expired cache records and
//! trims the store back under its configured entry cap.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::FileStore;
use crate::error::Result;

/// Runs one maintenance pass: sweep, then capacity enforcement.
///
/// Returns `(removed, evicted)`.
pub async fn run_maintenance(cache: &FileStore) -> Result<(usize, usize)> {
    let removed = cache.sweep().await?;
    let evicted = cache.enforce_capacity().await?;
    Ok((removed, evicted))
}

/// Spawns a background task that periodically sweeps the cache store.
///
/// The task sleeps for `sweep_interval_secs` between passes and never
/// holds a store-wide lock, so request traffic is not stalled by a pass.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(FileStore::open(config.store_config()).await?);
/// let sweep_handle = spawn_sweep_task(cache.clone(), 300);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(cache: Arc<FileStore>, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            match run_maintenance(&cache).await {
                Ok((0, 0)) => debug!("Cache sweep: nothing to remove"),
                Ok((removed, evicted)) => info!(
                    "Cache sweep: removed {} expired entries, evicted {} over capacity",
                    removed, evicted
                ),
                Err(err) => warn!("Cache sweep failed: {}", err),
            }
        }
    })
}
