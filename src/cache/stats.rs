//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and expirations.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of failed lookups (absent or expired)
    pub misses: u64,
    /// Number of providers added
    pub additions: u64,
    /// Adds rejected because a live entry already existed
    pub duplicate_rejections: u64,
    /// Adds rejected because the key could not be identified
    pub uncacheable_rejections: u64,
    /// Number of providers removed explicitly
    pub removals: u64,
    /// Number of entries dropped after their TTL elapsed
    pub expirations: u64,
    /// Current number of signing entries
    pub signing_entries: usize,
    /// Current number of verifying entries
    pub verifying_entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn total_entries(&self) -> usize {
        self.signing_entries + self.verifying_entries
    }
}

// == Counters ==
/// Lock-free counters updated by the cache on every operation.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    additions: AtomicU64,
    duplicate_rejections: AtomicU64,
    uncacheable_rejections: AtomicU64,
    removals: AtomicU64,
    expirations: AtomicU64,
}

impl StatsCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_addition(&self) {
        self.additions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicate_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_uncacheable(&self) {
        self.uncacheable_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    pub fn snapshot(&self, signing_entries: usize, verifying_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            additions: self.additions.load(Ordering::Relaxed),
            duplicate_rejections: self.duplicate_rejections.load(Ordering::Relaxed),
            uncacheable_rejections: self.uncacheable_rejections.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            signing_entries,
            verifying_entries,
        }
    }
}
