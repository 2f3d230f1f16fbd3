//! Expiry Sweep Task
//!
//! Background task that periodically drops expired cache entries.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheKeyStrategy, SignatureProviderCache};
use crate::config::CacheConfig;

/// Spawns a background task that periodically sweeps expired providers.
///
/// Lookups already ignore expired entries, so the sweep only reclaims memory
/// and releases the owner marks of providers nobody asked for again.
///
/// The task holds a weak reference and stops on its own once the cache is
/// disposed or dropped. It can also be stopped through the returned handle.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(SignatureProviderCache::new());
/// let sweep_handle = spawn_sweep_task(&cache, Duration::from_secs(60));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<S>(
    cache: &Arc<SignatureProviderCache<S>>,
    interval: Duration,
) -> JoinHandle<()>
where
    S: CacheKeyStrategy + 'static,
{
    let cache: Weak<SignatureProviderCache<S>> = Arc::downgrade(cache);

    tokio::spawn(async move {
        info!("Starting expiry sweep task with interval of {:?}", interval);

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            let Some(cache) = cache.upgrade() else {
                debug!("Expiry sweep: cache dropped, stopping");
                break;
            };

            let removed = match cache.purge_expired() {
                Ok(removed) => removed,
                Err(_) => {
                    debug!("Expiry sweep: cache {} disposed, stopping", cache.id());
                    break;
                }
            };

            // Log sweep statistics
            if removed > 0 {
                info!("Expiry sweep: removed {} expired providers", removed);
            } else {
                debug!("Expiry sweep: no expired providers found");
            }
        }
    })
}

/// Spawns the sweep task at the configured `sweep_interval_secs`.
pub fn spawn_sweep_task_from_config<S>(
    cache: &Arc<SignatureProviderCache<S>>,
    config: &CacheConfig,
) -> JoinHandle<()>
where
    S: CacheKeyStrategy + 'static,
{
    spawn_sweep_task(cache, config.sweep_interval())
}
