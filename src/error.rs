//! Error types for the signature provider cache
//!
//! Provides unified error handling using thiserror.
//!
//! Only caller mistakes surface as errors. Conditions such as an
//! unidentifiable key, a duplicate entry or a removal of something that is
//! not cached are normal `Ok(false)` outcomes.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A required argument was empty
    #[error("Invalid argument: {0} must not be empty")]
    InvalidArgument(&'static str),

    /// The cache has been disposed and no longer accepts calls
    #[error("Cache has been disposed")]
    Disposed,
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
