//! sigcache - An in-memory cache for signature providers
//!
//! Stores constructed sign/verify providers keyed by security key, algorithm
//! and provider type, with sliding TTL expiration and removal restricted to the
//! cache that owns an entry.

pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod tasks;

#[cfg(test)]
mod testutil;

pub use cache::{CacheKey, CacheKeyStrategy, CacheStats, SharedProvider, SignatureProviderCache};
pub use config::CacheConfig;
pub use crypto::{CacheId, Intent, OwnerMark, SecurityKey, SignatureProvider};
pub use error::{CacheError, Result};
pub use events::{BufferedEventWriter, CacheEvent, EventSink};
pub use tasks::{spawn_sweep_task, spawn_sweep_task_from_config};
