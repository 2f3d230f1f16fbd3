//! Cache Key Module
//!
//! Builds the composite key a provider is stored under, and the strategy hook
//! that lets a derived cache change how keys are composed.

use std::fmt::{self, Write};

use crate::crypto::{KeyIdentity, SecurityKey, SignatureProvider};
use crate::error::{CacheError, Result};

// == Cache Key ==
/// Composite of key type, internal id, algorithm and provider type.
///
/// Each component is written as `<byte length>:<text>` and components are
/// joined with `|`. The length prefix makes the encoding unambiguous for any
/// component contents, so distinct tuples never produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    // == Build ==
    /// Builds a key from its four components.
    ///
    /// # Errors
    /// `InvalidArgument` if any component is empty.
    pub fn build(
        key_type: &str,
        internal_id: &str,
        algorithm: &str,
        provider_type: &str,
    ) -> Result<Self> {
        let parts = [
            ("key type", key_type),
            ("internal id", internal_id),
            ("algorithm", algorithm),
            ("provider type", provider_type),
        ];

        let capacity = parts.iter().map(|(_, p)| p.len() + 8).sum();
        let mut key = String::with_capacity(capacity);
        for (i, &(name, part)) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(CacheError::InvalidArgument(name));
            }
            if i > 0 {
                key.push('|');
            }
            // Writing into a String cannot fail
            let _ = write!(key, "{}:{}", part.len(), part);
        }

        Ok(Self(key))
    }

    /// Builds a key from an already resolved identity.
    pub fn for_identity(
        identity: KeyIdentity<'_>,
        algorithm: &str,
        provider_type: &str,
    ) -> Result<Self> {
        Self::build(
            identity.key_type,
            identity.internal_id,
            algorithm,
            provider_type,
        )
    }

    /// Wraps an arbitrary string produced by a custom [`CacheKeyStrategy`].
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Key Strategy ==
/// Key composition used by a cache.
///
/// Both methods must agree: the key computed for a provider has to equal the
/// key computed from that provider's security key, algorithm and type.
/// Strategies are only consulted for identifiable keys.
pub trait CacheKeyStrategy: Send + Sync {
    fn key_for_provider(&self, provider: &dyn SignatureProvider) -> Result<CacheKey> {
        self.key_for(provider.key(), provider.algorithm(), provider.provider_type())
    }

    fn key_for(
        &self,
        key: &dyn SecurityKey,
        algorithm: &str,
        provider_type: &str,
    ) -> Result<CacheKey>;
}

/// Length-prefixed composition of type, id, algorithm and provider type.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyStrategy;

impl CacheKeyStrategy for DefaultKeyStrategy {
    fn key_for(
        &self,
        key: &dyn SecurityKey,
        algorithm: &str,
        provider_type: &str,
    ) -> Result<CacheKey> {
        let identity =
            KeyIdentity::resolve(key).ok_or(CacheError::InvalidArgument("internal id"))?;
        CacheKey::for_identity(identity, algorithm, provider_type)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_is_deterministic() {
        let a = CacheKey::build("RsaKey", "K1", "RS256", "RsaProvider").unwrap();
        let b = CacheKey::build("RsaKey", "K1", "RS256", "RsaProvider").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "6:RsaKey|2:K1|5:RS256|11:RsaProvider");
    }

    #[test]
    fn test_build_is_case_sensitive() {
        let a = CacheKey::build("RsaKey", "K1", "RS256", "RsaProvider").unwrap();
        let b = CacheKey::build("RsaKey", "k1", "RS256", "RsaProvider").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_separator_inside_component_does_not_collide() {
        let a = CacheKey::build("T", "a|1:b", "c", "d").unwrap();
        let b = CacheKey::build("T", "a", "b|1:c", "d").unwrap();
        assert_ne!(a, b);

        let c = CacheKey::build("Key-A", "x", "RS256", "P").unwrap();
        let d = CacheKey::build("Key", "A-x", "RS256", "P").unwrap();
        assert_ne!(c, d);
    }

    #[test]
    fn test_build_rejects_empty_components() {
        assert_eq!(
            CacheKey::build("", "K1", "RS256", "P"),
            Err(CacheError::InvalidArgument("key type"))
        );
        assert_eq!(
            CacheKey::build("T", "", "RS256", "P"),
            Err(CacheError::InvalidArgument("internal id"))
        );
        assert_eq!(
            CacheKey::build("T", "K1", "", "P"),
            Err(CacheError::InvalidArgument("algorithm"))
        );
        assert_eq!(
            CacheKey::build("T", "K1", "RS256", ""),
            Err(CacheError::InvalidArgument("provider type"))
        );
    }

    #[test]
    fn test_build_counts_bytes_not_chars() {
        let key = CacheKey::build("T", "é", "A", "P").unwrap();
        assert_eq!(key.as_str(), "1:T|2:é|1:A|1:P");
    }
}
