//! Cache Module
//!
//! Provides a fixed-capacity in-memory cache with LRU eviction and an
//! optional eviction callback.

mod lru;
mod stats;


// Re-export public types
pub use lru::{LruCache, OnEvict};
pub use stats::CacheStats;
