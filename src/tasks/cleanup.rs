//! Expiry Cleanup Task
//!
//! Background task that periodically purges expired entries from a store.
//! Stores already drop expired entries lazily on access; the task bounds the
//! memory held by entries that are never read again.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::Expiring;

/// Spawns a background task that purges expired entries every
/// `cleanup_interval_secs` seconds.
///
/// Stores are cheap handles onto shared state, so the task takes its own
/// clone. The returned handle can be aborted during shutdown.
///
/// # Example
/// ```ignore
/// let store = SharedMemoryStore::new();
/// let cleanup_handle = spawn_cleanup_task(store.clone(), 30);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<S>(store: S, cleanup_interval_secs: u64) -> JoinHandle<()>
where
    S: Expiring + 'static,
{
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.cleanup_expired();
            if removed > 0 {
                info!("Expiry cleanup: removed {} expired entries", removed);
            } else {
                debug!("Expiry cleanup: no expired entries found");
            }
        }
    })
}
