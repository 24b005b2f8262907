//! Expiry Sweep Task
//!
//! Background task that periodically deletes expired cache entries. The cache
//! itself only expires entries lazily on read; the server opts into this.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::ServerCache;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. It takes the write lock on the cache for each sweep.
///
/// # Arguments
/// * `cache` - Arc<RwLock<ServerCache>> shared reference to the cache
/// * `sweep_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let state = AppState::from_config(&config)?;
/// let sweep_handle = spawn_sweep_task(state.cache.clone(), 60);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(
    cache: Arc<RwLock<ServerCache>>,
    sweep_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let deleted = {
                let mut cache_guard = cache.write().await;
                cache_guard.delete_all_expires()
            };

            if deleted.is_empty() {
                debug!("Expiry sweep: no expired entries found");
            } else {
                info!("Expiry sweep: deleted {} expired entries", deleted.len());
            }
        }
    })
}
