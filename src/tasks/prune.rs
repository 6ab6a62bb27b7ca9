//! Prune Task
//!
//! Background task that periodically reclaims expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Spawns a background task that calls `prune` every `interval_secs` seconds.
///
/// Lookups only drop expired entries they happen to touch; without this task
/// an expired entry that is never read again stays in memory.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(CacheStore::new()));
/// let prune_handle = spawn_prune_task(cache.clone(), 60);
/// // Later, during shutdown:
/// prune_handle.abort();
/// ```
pub fn spawn_prune_task(cache: SharedCache, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!("Starting prune task with interval of {} seconds", interval.as_secs());

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut cache_guard = cache.write().await;
                let removed = cache_guard.prune();
                (removed, cache_guard.len())
            };

            if removed > 0 {
                info!(removed, remaining, "pruned expired entries");
            } else {
                debug!(remaining, "prune found no expired entries");
            }
        }
    })
}
