//! Crypto Module
//!
//! The minimal view of security keys and signature providers the cache needs:
//! a key's identity, a provider's algorithm and intent, and the owner token a
//! provider carries while it is cached.

mod owner;

use std::fmt;

use serde::Serialize;

pub use owner::{CacheId, OwnerMark};

// == Security Key ==
/// A security key whose material has been reduced to a stable identifier.
pub trait SecurityKey: fmt::Debug + Send + Sync {
    /// Concrete runtime type name of the key.
    ///
    /// Defaults to the Rust type name, so two key types with identical
    /// identifiers never share a cache entry.
    fn key_type(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Stable identifier derived from the key's public material.
    ///
    /// An empty identifier means the key cannot be safely cached.
    fn internal_id(&self) -> &str;
}

// == Intent ==
/// Whether a provider produces signatures or checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Sign,
    Verify,
}

impl Intent {
    pub fn from_will_create_signatures(will_create_signatures: bool) -> Self {
        if will_create_signatures {
            Intent::Sign
        } else {
            Intent::Verify
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Sign => "sign",
            Intent::Verify => "verify",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Signature Provider ==
/// An object performing sign or verify operations for one key and algorithm.
///
/// Implementors embed an [`OwnerMark`] and hand it out through [`owner`];
/// the cache is the only writer of that mark.
///
/// [`owner`]: SignatureProvider::owner
pub trait SignatureProvider: fmt::Debug + Send + Sync {
    /// The key this provider was built for.
    fn key(&self) -> &dyn SecurityKey;

    /// Algorithm name, e.g. `RS256`.
    fn algorithm(&self) -> &str;

    /// Concrete runtime type name of the provider.
    fn provider_type(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// True when the provider was configured to create signatures.
    fn will_create_signatures(&self) -> bool;

    /// Owner token recording which cache currently holds this provider.
    fn owner(&self) -> &OwnerMark;

    fn intent(&self) -> Intent {
        Intent::from_will_create_signatures(self.will_create_signatures())
    }
}

// == Key Identity ==
/// The identity of a security key: its type plus its internal identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyIdentity<'a> {
    pub key_type: &'a str,
    pub internal_id: &'a str,
}

impl<'a> KeyIdentity<'a> {
    /// Resolves the identity of `key`, or `None` when the key is not identifiable.
    pub fn resolve(key: &'a dyn SecurityKey) -> Option<Self> {
        let internal_id = key.internal_id();
        if internal_id.is_empty() {
            return None;
        }

        Some(Self {
            key_type: key.key_type(),
            internal_id,
        })
    }
}
