//! Ownership Module
//!
//! Owner tokens recording which cache instance holds a provider.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(1);

// == Cache Id ==
/// Process-unique identity of a cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheId(NonZeroU64);

impl CacheId {
    /// Allocates a fresh id. Ids are never reused within a process.
    pub fn next() -> Self {
        let raw = NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 caches to wrap
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for CacheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache-{}", self.0)
    }
}

// == Owner Mark ==
/// Owner token embedded in a signature provider.
///
/// Holds the [`CacheId`] of the cache currently storing the provider, or
/// nothing. All transitions are compare-and-swap so a concurrent reader sees
/// either the old owner or the new one.
#[derive(Default)]
pub struct OwnerMark(AtomicU64);

impl OwnerMark {
    const UNOWNED: u64 = 0;

    pub fn new() -> Self {
        Self(AtomicU64::new(Self::UNOWNED))
    }

    /// Current owner, if any.
    pub fn owner(&self) -> Option<CacheId> {
        NonZeroU64::new(self.0.load(Ordering::Acquire)).map(CacheId)
    }

    pub fn is_owned_by(&self, id: CacheId) -> bool {
        self.0.load(Ordering::Acquire) == id.get()
    }

    /// Claims the mark for `id` if unowned or already owned by `id`.
    ///
    /// Returns the previous owner on success, `Err` with the foreign owner
    /// otherwise.
    pub fn claim(&self, id: CacheId) -> Result<Option<CacheId>, CacheId> {
        match self.0.compare_exchange(
            Self::UNOWNED,
            id.get(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(None),
            Err(current) if current == id.get() => Ok(Some(id)),
            Err(current) => Err(NonZeroU64::new(current).map(CacheId).unwrap_or(id)),
        }
    }

    /// Clears the mark if it is owned by `id`. Returns true when cleared.
    pub fn release(&self, id: CacheId) -> bool {
        self.0
            .compare_exchange(id.get(), Self::UNOWNED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl fmt::Debug for OwnerMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnerMark").field(&self.owner()).finish()
    }
}
