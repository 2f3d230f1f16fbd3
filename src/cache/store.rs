//! Cache Store Module
//!
//! Concurrent key-value storage with sliding TTL expiration. The provider
//! cache keeps one store per intent.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::cache::{CacheEntry, CacheKey, Clock, SystemClock};

/// Callback receiving every value dropped because it expired.
pub type ExpiryListener<V> = Arc<dyn Fn(&CacheKey, V) + Send + Sync>;

/// Hook run on every value leaving the store, while its key is still locked.
pub type EvictionHook<V> = Arc<dyn Fn(&V) + Send + Sync>;

/// Result of [`ExpiringStore::try_insert_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A live entry holds the key
    Occupied,
    /// The admission check refused the value
    Rejected,
}

// == Expiring Store ==
/// Concurrent map whose entries expire after a sliding idle window.
///
/// Expiry is checked lazily on every access, so an entry idle for the full
/// TTL is never returned even if no sweep has run. [`purge_expired`] only
/// reclaims memory.
///
/// Admission checks and eviction hooks run under the lock of the key's
/// shard, so they observe the same order of events as the map itself.
///
/// [`purge_expired`]: ExpiringStore::purge_expired
pub struct ExpiringStore<V> {
    /// Key-value storage
    entries: DashMap<CacheKey, CacheEntry<V>>,
    /// Sliding expiration window
    ttl: Duration,
    clock: Arc<dyn Clock>,
    on_expire: Option<ExpiryListener<V>>,
    on_evict: Option<EvictionHook<V>>,
}

impl<V: Clone> ExpiringStore<V> {
    // == Constructor ==
    /// Creates a store using the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
            on_expire: None,
            on_evict: None,
        }
    }

    /// Registers a callback invoked with each expired value as it is dropped.
    ///
    /// Runs after the shard lock is released.
    pub fn with_expiry_listener(mut self, listener: ExpiryListener<V>) -> Self {
        self.on_expire = Some(listener);
        self
    }

    /// Registers a hook invoked for every value that leaves the store, by
    /// removal, expiry, replacement or drain.
    ///
    /// Runs with the shard lock held and must not touch the store.
    pub fn with_eviction_hook(mut self, hook: EvictionHook<V>) -> Self {
        self.on_evict = Some(hook);
        self
    }

    // == Insert If Absent ==
    /// Stores `value` under `key` unless a live entry already exists.
    ///
    /// Returns false without touching the store when the key is taken. An
    /// expired entry does not block the insert; it is replaced and reported
    /// to the expiry listener.
    pub fn try_insert_if_absent(&self, key: CacheKey, value: V) -> bool {
        self.try_insert_with(key, value, |_| true) == InsertOutcome::Inserted
    }

    /// Stores `value` under `key` if the slot is free and `admit` accepts it.
    ///
    /// `admit` runs under the shard lock and only when the slot is free, after
    /// any expired occupant has been evicted. It is not called when a live
    /// entry holds the key. An expired occupant is dropped even if `admit`
    /// refuses.
    pub fn try_insert_with(
        &self,
        key: CacheKey,
        value: V,
        admit: impl FnOnce(&V) -> bool,
    ) -> InsertOutcome {
        let now = self.clock.now();

        let (outcome, expired) = match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                if !admit(&value) {
                    return InsertOutcome::Rejected;
                }
                slot.insert(CacheEntry::new(value, now));
                return InsertOutcome::Inserted;
            }
            Entry::Occupied(mut slot) => {
                if !slot.get().is_expired(now, self.ttl) {
                    return InsertOutcome::Occupied;
                }
                self.evict(&slot.get().value);
                if admit(&value) {
                    let key = slot.key().clone();
                    let old = slot.insert(CacheEntry::new(value, now));
                    (InsertOutcome::Inserted, (key, old.value))
                } else {
                    let (key, old) = slot.remove_entry();
                    (InsertOutcome::Rejected, (key, old.value))
                }
            }
        };

        self.notify_expired(&expired.0, expired.1);
        outcome
    }

    // == Get And Touch ==
    /// Returns the value under `key` and resets its sliding window.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn try_get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();

        match self.entries.get_mut(key) {
            Some(mut entry) => {
                if !entry.is_expired(now, self.ttl) {
                    entry.touch(now);
                    return Some(entry.value.clone());
                }
            }
            None => return None,
        }

        // Only drop it if nobody touched or replaced it in between
        if let Some((key, expired)) = self.entries.remove_if(key, |_, entry| {
            let expired = entry.is_expired(now, self.ttl);
            if expired {
                self.evict(&entry.value);
            }
            expired
        }) {
            self.notify_expired(&key, expired.value);
        }
        None
    }

    // == Time To Live ==
    /// Idle time left before the entry under `key` expires.
    ///
    /// Does not reset the sliding window. Absent and expired entries yield
    /// `None`.
    pub fn remaining_ttl(&self, key: &CacheKey) -> Option<Duration> {
        let now = self.clock.now();
        let entry = self.entries.get(key)?;
        if entry.is_expired(now, self.ttl) {
            return None;
        }
        Some(entry.ttl_remaining(now, self.ttl))
    }

    // == Remove ==
    /// Removes the entry under `key`.
    ///
    /// Returns true only if a live entry existed and was removed. Absent and
    /// already expired entries yield false.
    pub fn try_remove(&self, key: &CacheKey) -> bool {
        self.try_remove_if(key, |_| true)
    }

    /// Removes the entry under `key` if `predicate` accepts its value.
    pub fn try_remove_if(&self, key: &CacheKey, predicate: impl FnOnce(&V) -> bool) -> bool {
        let now = self.clock.now();

        match self.entries.remove_if(key, |_, entry| {
            let accepted = predicate(&entry.value);
            if accepted {
                self.evict(&entry.value);
            }
            accepted
        }) {
            Some((key, removed)) if removed.is_expired(now, self.ttl) => {
                self.notify_expired(&key, removed.value);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut expired = Vec::new();

        self.entries.retain(|key, entry| {
            if entry.is_expired(now, ttl) {
                self.evict(&entry.value);
                expired.push((key.clone(), entry.value.clone()));
                false
            } else {
                true
            }
        });

        let count = expired.len();
        for (key, value) in expired {
            self.notify_expired(&key, value);
        }
        count
    }

    // == Drain ==
    /// Removes every entry and returns the values that were still live.
    ///
    /// Expired values are reported to the expiry listener instead.
    pub fn drain(&self) -> Vec<V> {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut live = Vec::new();
        let mut expired = Vec::new();

        self.entries.retain(|key, entry| {
            self.evict(&entry.value);
            if entry.is_expired(now, ttl) {
                expired.push((key.clone(), entry.value.clone()));
            } else {
                live.push(entry.value.clone());
            }
            false
        });

        for (key, value) in expired {
            self.notify_expired(&key, value);
        }
        live
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn evict(&self, value: &V) {
        if let Some(hook) = &self.on_evict {
            hook(value);
        }
    }

    fn notify_expired(&self, key: &CacheKey, value: V) {
        if let Some(listener) = &self.on_expire {
            listener(key, value);
        }
    }
}

impl<V> fmt::Debug for ExpiringStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
