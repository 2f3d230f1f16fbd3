//! Cache Module
//!
//! Provides the signature provider cache with sliding TTL expiration,
//! intent partitioning and ownership-guarded removal.

mod clock;
mod entry;
mod key;
mod provider_cache;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::{CacheKey, CacheKeyStrategy, DefaultKeyStrategy};
pub use provider_cache::{SharedProvider, SignatureProviderCache};
pub use stats::CacheStats;
pub(crate) use stats::StatsCounters;
pub use store::{EvictionHook, ExpiringStore, ExpiryListener, InsertOutcome};
