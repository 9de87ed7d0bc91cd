//! Cache Statistics Module
//!
//! Counters describing how the cache has been used: hits, misses, and
//! capacity evictions. `contains` probes and explicit flushes are not
//! cache traffic and leave the counters alone.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache usage counters.
///
/// Serializable so embedders can export it as-is.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Lookups that found a live entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries dropped under capacity pressure
    pub evictions: u64,
    /// Number of entries held at snapshot time
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Requests ==
    /// Total number of lookups observed.
    pub fn requests(&self) -> u64 {
        self.hits + self.misses
    }

    // == Hit Rate ==
    /// Fraction of lookups that hit, or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Recorders ==
    /// Counts a successful lookup.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Counts a failed lookup.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Counts an entry dropped under capacity pressure.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Refreshes the held-entry count for a snapshot.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_start_at_zero() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.requests(), 0);
    }

    #[test]
    fn test_hit_rate_before_any_lookup() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed_traffic() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        assert_eq!(stats.requests(), 4);
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_eviction() {
        let mut stats = CacheStats::new();
        stats.record_eviction();
        stats.record_eviction();
        assert_eq!(stats.evictions, 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.set_total_entries(5);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["hits"], 1);
        assert_eq!(json["misses"], 1);
        assert_eq!(json["total_entries"], 5);
    }
}
