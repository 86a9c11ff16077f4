//! Copyable counter snapshots for the cache core.

/// Point-in-time view of a cache's counters and gauges.
///
/// Taken under the cache lock, so the fields are mutually consistent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Successful `lookup` calls.
    pub hits: u64,
    /// `lookup` calls that found nothing.
    pub misses: u64,
    /// Entries replaced on the insert path.
    pub evictions: u64,

    // gauges captured at snapshot time
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, or `0.0` before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_ratio_is_zero_without_lookups() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_ratio(), 0.0);
    }

    #[test]
    fn hit_ratio_divides_hits_by_total() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_ratio(), 0.75);
    }
}
