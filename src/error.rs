//! Error types for the cache library
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache library.
///
/// Lookup failures are deliberately absent: a missing key is reported as
/// `None` from `get` or `false` from `contains`, never as an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A capacity of zero was requested at construction
    #[error("cache capacity must be at least 1")]
    ZeroCapacity,
}

// == Result Type Alias ==
/// Convenience Result type for the cache library.
pub type Result<T> = std::result::Result<T, CacheError>;
