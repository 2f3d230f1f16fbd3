//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Default sliding TTL in seconds (one day).
pub const DEFAULT_SLIDING_TTL_SECS: u64 = 24 * 60 * 60;

/// Default interval between background sweeps in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default number of buffered events before the event writer flushes.
pub const DEFAULT_EVENT_FLUSH_THRESHOLD: usize = 1000;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Sliding expiration window in seconds, reset on every successful access
    pub sliding_ttl_secs: u64,
    /// Background sweep task interval in seconds
    pub sweep_interval_secs: u64,
    /// Buffered events before the event writer flushes
    pub event_flush_threshold: usize,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SIGCACHE_SLIDING_TTL_SECS` - Sliding TTL in seconds (default: 86400)
    /// - `SIGCACHE_SWEEP_INTERVAL_SECS` - Sweep frequency in seconds (default: 60)
    /// - `SIGCACHE_EVENT_FLUSH_THRESHOLD` - Events per flush (default: 1000)
    ///
    /// Unparseable or zero values fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            sliding_ttl_secs: env_or("SIGCACHE_SLIDING_TTL_SECS", DEFAULT_SLIDING_TTL_SECS),
            sweep_interval_secs: env_or(
                "SIGCACHE_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            ),
            event_flush_threshold: env_or(
                "SIGCACHE_EVENT_FLUSH_THRESHOLD",
                DEFAULT_EVENT_FLUSH_THRESHOLD,
            ),
        }
    }

    /// Sliding TTL as a [`Duration`].
    pub fn sliding_ttl(&self) -> Duration {
        Duration::from_secs(self.sliding_ttl_secs)
    }

    /// Sweep interval as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sliding_ttl_secs: DEFAULT_SLIDING_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            event_flush_threshold: DEFAULT_EVENT_FLUSH_THRESHOLD,
        }
    }
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + PartialEq + Default,
{
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v: &T| *v != T::default())
        .unwrap_or(default)
}
