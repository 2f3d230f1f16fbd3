//! Signature Provider Cache Module
//!
//! The cache facade: two expiring stores partitioned by intent, guarded by
//! the owner token each provider carries.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheKey, CacheKeyStrategy, CacheStats, Clock, DefaultKeyStrategy, EvictionHook,
    ExpiringStore, ExpiryListener, InsertOutcome, StatsCounters, SystemClock,
};
use crate::config::CacheConfig;
use crate::crypto::{CacheId, Intent, KeyIdentity, SecurityKey, SignatureProvider};
use crate::error::{CacheError, Result};
use crate::events::{CacheEvent, CacheEventKind, EventSink, RemoveRejection};

/// Shared handle to a cached provider.
pub type SharedProvider = Arc<dyn SignatureProvider>;

/// Counters and the optional event sink, shared with the expiry listeners.
struct Telemetry {
    id: CacheId,
    counters: StatsCounters,
    sink: RwLock<Option<Arc<dyn EventSink>>>,
}

impl Telemetry {
    fn emit(&self, kind: impl FnOnce() -> CacheEventKind) {
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink.record(CacheEvent::new(self.id, kind()));
        }
    }
}

// == Signature Provider Cache ==
/// Process-local cache of signature providers.
///
/// Providers are stored under a key derived from their security key, algorithm
/// and provider type, in one of two partitions depending on whether they sign
/// or verify. Entries expire after a sliding TTL (one day by default).
///
/// A cached provider carries this cache's [`CacheId`] in its owner mark, and
/// only the owning cache can remove it. The mark is claimed and released
/// under the same lock that guards the provider's slot, so a provider is
/// marked exactly while it is stored.
///
/// After [`dispose`](Self::dispose) every operation fails with
/// [`CacheError::Disposed`].
pub struct SignatureProviderCache<S: CacheKeyStrategy = DefaultKeyStrategy> {
    signing: ExpiringStore<SharedProvider>,
    verifying: ExpiringStore<SharedProvider>,
    strategy: S,
    telemetry: Arc<Telemetry>,
    disposed: AtomicBool,
}

impl SignatureProviderCache<DefaultKeyStrategy> {
    // == Constructors ==
    /// Creates a cache with the default one day sliding TTL.
    pub fn new() -> Self {
        Self::from_config(&CacheConfig::default())
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_ttl(config.sliding_ttl())
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::with_strategy(DefaultKeyStrategy, ttl, clock)
    }
}

impl Default for SignatureProviderCache<DefaultKeyStrategy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CacheKeyStrategy> SignatureProviderCache<S> {
    /// Creates a cache composing keys with a custom strategy.
    pub fn with_strategy(strategy: S, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let telemetry = Arc::new(Telemetry {
            id: CacheId::next(),
            counters: StatsCounters::default(),
            sink: RwLock::new(None),
        });

        Self {
            signing: ExpiringStore::with_clock(ttl, Arc::clone(&clock))
                .with_eviction_hook(release_owner_mark(telemetry.id))
                .with_expiry_listener(expiry_listener(&telemetry, Intent::Sign)),
            verifying: ExpiringStore::with_clock(ttl, clock)
                .with_eviction_hook(release_owner_mark(telemetry.id))
                .with_expiry_listener(expiry_listener(&telemetry, Intent::Verify)),
            strategy,
            telemetry,
            disposed: AtomicBool::new(false),
        }
    }

    /// Reports cache events to `sink` from now on.
    pub fn with_event_sink(self, sink: Arc<dyn EventSink>) -> Self {
        *self.telemetry.sink.write() = Some(sink);
        self
    }

    // == Add ==
    /// Caches `provider` under the key derived from its security key,
    /// algorithm and type, in the partition matching its intent.
    ///
    /// Returns `Ok(false)` without caching when:
    /// - the provider's key has no internal identifier;
    /// - the provider is currently owned by another cache;
    /// - a live entry already exists for the same key and intent.
    ///
    /// In the last case the existing entry wins and the new provider is left
    /// untouched. Callers getting `false` should look the key up and prefer the
    /// cached instance, disposing of their own when appropriate.
    ///
    /// # Errors
    /// `InvalidArgument` on an empty algorithm or provider type,
    /// `Disposed` after [`dispose`](Self::dispose), including a dispose that
    /// raced this call. The provider is not left cached in that case.
    pub fn try_add(&self, provider: &SharedProvider) -> Result<bool> {
        self.ensure_live()?;
        let intent = provider.intent();
        validate_names(provider.algorithm(), provider.provider_type())?;

        if KeyIdentity::resolve(provider.key()).is_none() {
            self.telemetry.counters.record_uncacheable();
            debug!(
                "Provider not cached, key has no internal id: algorithm={} intent={}",
                provider.algorithm(),
                intent
            );
            self.telemetry.emit(|| CacheEventKind::Uncacheable {
                algorithm: provider.algorithm().to_string(),
                intent,
            });
            return Ok(false);
        }

        let key = self.strategy.key_for_provider(&**provider)?;
        let mut foreign_owner = None;
        // Claimed under the slot's lock, and only once the slot is free
        let admit = |_: &SharedProvider| match provider.owner().claim(self.id()) {
            Ok(_) => true,
            Err(owner) => {
                foreign_owner = Some(owner);
                false
            }
        };
        let outcome = self
            .partition(intent)
            .try_insert_with(key.clone(), Arc::clone(provider), admit);

        match outcome {
            InsertOutcome::Inserted => {
                if self.is_disposed() {
                    // Dispose may have drained this partition before the insert
                    self.partition(intent)
                        .try_remove_if(&key, |cached| same_provider(cached, provider));
                    debug!("Provider not cached, cache disposed during add: key={}", key);
                    return Err(CacheError::Disposed);
                }
                self.telemetry.counters.record_addition();
                debug!("Provider cached: key={} intent={}", key, intent);
                self.telemetry.emit(|| CacheEventKind::Added {
                    key: key.to_string(),
                    intent,
                });
                Ok(true)
            }
            InsertOutcome::Occupied => {
                self.telemetry.counters.record_duplicate();
                debug!("Provider not cached, key already present: key={} intent={}", key, intent);
                self.telemetry.emit(|| CacheEventKind::DuplicateRejected {
                    key: key.to_string(),
                    intent,
                });
                Ok(false)
            }
            InsertOutcome::Rejected => {
                if let Some(owner) = foreign_owner {
                    debug!("Provider not cached, already owned by {}: key={}", owner, key);
                }
                Ok(false)
            }
        }
    }

    // == Get ==
    /// Looks up the provider cached for `key`, `algorithm` and `provider_type`
    /// in the signing or verifying partition.
    ///
    /// A hit resets the entry's sliding TTL. A key without an internal
    /// identifier can never be cached and always misses.
    ///
    /// # Errors
    /// `InvalidArgument` on an empty algorithm or provider type,
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn try_get_signature_provider(
        &self,
        key: &dyn SecurityKey,
        algorithm: &str,
        provider_type: &str,
        will_create_signatures: bool,
    ) -> Result<Option<SharedProvider>> {
        self.ensure_live()?;
        validate_names(algorithm, provider_type)?;
        let intent = Intent::from_will_create_signatures(will_create_signatures);

        if KeyIdentity::resolve(key).is_none() {
            self.telemetry.counters.record_miss();
            return Ok(None);
        }

        let cache_key = self.strategy.key_for(key, algorithm, provider_type)?;
        match self.partition(intent).try_get(&cache_key) {
            Some(provider) => {
                self.telemetry.counters.record_hit();
                debug!("Provider cache hit: key={} intent={}", cache_key, intent);
                self.telemetry.emit(|| CacheEventKind::Hit {
                    key: cache_key.to_string(),
                    intent,
                });
                Ok(Some(provider))
            }
            None => {
                self.telemetry.counters.record_miss();
                debug!("Provider cache miss: key={} intent={}", cache_key, intent);
                self.telemetry.emit(|| CacheEventKind::Miss {
                    key: cache_key.to_string(),
                    intent,
                });
                Ok(None)
            }
        }
    }

    // == Remaining TTL ==
    /// Idle time left before the provider cached for `key`, `algorithm` and
    /// `provider_type` expires.
    ///
    /// Unlike a lookup this does not reset the sliding window, and it is not
    /// counted as a hit or miss.
    ///
    /// # Errors
    /// `InvalidArgument` on an empty algorithm or provider type,
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn remaining_ttl(
        &self,
        key: &dyn SecurityKey,
        algorithm: &str,
        provider_type: &str,
        will_create_signatures: bool,
    ) -> Result<Option<Duration>> {
        self.ensure_live()?;
        validate_names(algorithm, provider_type)?;
        if KeyIdentity::resolve(key).is_none() {
            return Ok(None);
        }

        let cache_key = self.strategy.key_for(key, algorithm, provider_type)?;
        let intent = Intent::from_will_create_signatures(will_create_signatures);
        Ok(self.partition(intent).remaining_ttl(&cache_key))
    }

    // == Remove ==
    /// Removes `provider` if this cache owns it.
    ///
    /// Returns `Ok(false)` without touching the store when the provider is not
    /// owned by this cache, and when no live entry holds this very provider.
    /// On success the owner mark is cleared as the entry leaves the store, so
    /// removing again returns false.
    ///
    /// # Errors
    /// `Disposed` after [`dispose`](Self::dispose).
    pub fn try_remove(&self, provider: &SharedProvider) -> Result<bool> {
        self.ensure_live()?;
        let intent = provider.intent();

        if !provider.owner().is_owned_by(self.id()) {
            debug!("Provider not removed, not owned by {}", self.id());
            self.telemetry.emit(|| CacheEventKind::RemoveRejected {
                intent,
                reason: RemoveRejection::NotOwned,
            });
            return Ok(false);
        }

        // The key is recomputed from the provider; material that no longer
        // yields a key cannot be located, which only costs a cache slot
        let key = match self.strategy.key_for_provider(&**provider) {
            Ok(key) => key,
            Err(err) => {
                warn!("Owned provider no longer yields a cache key: {}", err);
                return Ok(false);
            }
        };

        let removed = self
            .partition(intent)
            .try_remove_if(&key, |cached| same_provider(cached, provider));

        if removed {
            self.telemetry.counters.record_removal();
            debug!("Provider removed: key={} intent={}", key, intent);
            self.telemetry.emit(|| CacheEventKind::Removed {
                key: key.to_string(),
                intent,
            });
        } else {
            debug!("Provider not removed, no live entry: key={} intent={}", key, intent);
            self.telemetry.emit(|| CacheEventKind::RemoveRejected {
                intent,
                reason: RemoveRejection::NotPresent,
            });
        }
        Ok(removed)
    }

    // == Cleanup Expired ==
    /// Drops every expired entry from both partitions.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> Result<usize> {
        self.ensure_live()?;
        Ok(self.signing.purge_expired() + self.verifying.purge_expired())
    }

    // == Dispose ==
    /// Releases every entry of both partitions.
    ///
    /// Only the first call has an effect. All later operations fail with
    /// [`CacheError::Disposed`].
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Draining runs the eviction hook, which clears every owner mark
        let released = self.signing.drain().len() + self.verifying.drain().len();

        info!("Signature provider cache {} disposed, released {} providers", self.id(), released);
        self.telemetry.emit(|| CacheEventKind::Disposed { released });
    }

    // == Accessors ==
    pub fn id(&self) -> CacheId {
        self.telemetry.id
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn ttl(&self) -> Duration {
        self.signing.ttl()
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Entries in the signing partition, including expired ones not yet swept.
    pub fn signing_len(&self) -> usize {
        self.signing.len()
    }

    /// Entries in the verifying partition, including expired ones not yet swept.
    pub fn verifying_len(&self) -> usize {
        self.verifying.len()
    }

    pub fn len(&self) -> usize {
        self.signing_len() + self.verifying_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.telemetry
            .counters
            .snapshot(self.signing_len(), self.verifying_len())
    }

    fn partition(&self, intent: Intent) -> &ExpiringStore<SharedProvider> {
        match intent {
            Intent::Sign => &self.signing,
            Intent::Verify => &self.verifying,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(CacheError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl<S: CacheKeyStrategy> Drop for SignatureProviderCache<S> {
    fn drop(&mut self) {
        // Leaves no provider marked as owned by a cache that no longer exists
        self.dispose();
    }
}

impl<S: CacheKeyStrategy> fmt::Debug for SignatureProviderCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureProviderCache")
            .field("id", &self.id())
            .field("signing", &self.signing)
            .field("verifying", &self.verifying)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

fn expiry_listener(telemetry: &Arc<Telemetry>, intent: Intent) -> ExpiryListener<SharedProvider> {
    let telemetry = Arc::clone(telemetry);
    Arc::new(move |key: &CacheKey, _provider: SharedProvider| {
        telemetry.counters.record_expiration();
        debug!("Provider expired: key={} intent={}", key, intent);
        telemetry.emit(|| CacheEventKind::Expired {
            key: key.to_string(),
            intent,
        });
    })
}

fn release_owner_mark(id: CacheId) -> EvictionHook<SharedProvider> {
    Arc::new(move |provider: &SharedProvider| {
        provider.owner().release(id);
    })
}

fn validate_names(algorithm: &str, provider_type: &str) -> Result<()> {
    if algorithm.is_empty() {
        return Err(CacheError::InvalidArgument("algorithm"));
    }
    if provider_type.is_empty() {
        return Err(CacheError::InvalidArgument("provider type"));
    }
    Ok(())
}

fn same_provider(a: &SharedProvider, b: &SharedProvider) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
