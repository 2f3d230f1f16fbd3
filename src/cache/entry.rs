//! Cache Entry Module
//!
//! Defines the structure for individual entries with sliding expiration.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value with the instant it was last inserted or read.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Instant of the last insert or successful lookup
    pub last_touched: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    pub fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            last_touched: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has been idle for at least `ttl`.
    ///
    /// Boundary condition: an entry is expired once the idle time is greater
    /// than or equal to the TTL, so an entry is never served after its window
    /// has fully elapsed.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_touched) >= ttl
    }

    // == Touch ==
    /// Resets the sliding window.
    pub fn touch(&mut self, now: Instant) {
        self.last_touched = now;
    }

    // == Time To Live ==
    /// Remaining time before the entry expires, zero once expired.
    pub fn ttl_remaining(&self, now: Instant, ttl: Duration) -> Duration {
        ttl.saturating_sub(now.saturating_duration_since(self.last_touched))
    }
}
