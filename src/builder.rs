//! Runtime policy selection: a builder and a unified cache wrapper.
//!
//! The policy cores are monomorphized over their per-entry payload, so a
//! policy chosen at runtime (config file, CLI flag) goes through the
//! [`Cache`] enum, which dispatches every operation to the selected core.
//!
//! ## Example
//!
//! ```
//! use pagecache::builder::{CacheBuilder, PolicyKind};
//!
//! let mut cache = CacheBuilder::new(100).build::<u64, String>(PolicyKind::Sieve);
//! cache.insert(1, "hello".to_string()).unwrap();
//! assert_eq!(cache.lookup(&1), Some("hello".to_string()));
//! assert_eq!(cache.policy_name(), "SIEVE");
//! ```

use std::hash::Hash;
use std::str::FromStr;

use crate::cache::CacheCore;
use crate::error::{ConfigError, InsertError};
use crate::policy::{ArcPolicy, ClockPolicy, FifoPolicy, LfuPolicy, LruPolicy, SievePolicy};
use crate::stats::CacheStats;

/// Available replacement policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Least Recently Used.
    Lru,
    /// First In, First Out.
    Fifo,
    /// Least Frequently Used (frequency buckets).
    Lfu,
    /// CLOCK second-chance.
    Clock,
    /// SIEVE (visited-bit sweep).
    Sieve,
    /// Adaptive Replacement Cache.
    Arc,
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(PolicyKind::Lru),
            "fifo" => Ok(PolicyKind::Fifo),
            "lfu" => Ok(PolicyKind::Lfu),
            "clock" => Ok(PolicyKind::Clock),
            "sieve" => Ok(PolicyKind::Sieve),
            "arc" => Ok(PolicyKind::Arc),
            other => Err(ConfigError::new(format!("unknown policy: {other}"))),
        }
    }
}

/// Cache with a runtime-selected policy; one variant per policy core.
pub enum Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    Lru(CacheCore<K, V, LruPolicy>),
    Fifo(CacheCore<K, V, FifoPolicy>),
    Lfu(CacheCore<K, V, LfuPolicy>),
    Clock(CacheCore<K, V, ClockPolicy>),
    Sieve(CacheCore<K, V, SievePolicy>),
    Arc(CacheCore<K, V, ArcPolicy<K>>),
}

/// Forwards one method call to whichever core is active.
macro_rules! dispatch {
    ($self:expr, $core:ident => $body:expr) => {
        match $self {
            Cache::Lru($core) => $body,
            Cache::Fifo($core) => $body,
            Cache::Lfu($core) => $body,
            Cache::Clock($core) => $body,
            Cache::Sieve($core) => $body,
            Cache::Arc($core) => $body,
        }
    };
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// See [`CacheCore::lookup`].
    pub fn lookup(&mut self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        dispatch!(self, core => core.lookup(key))
    }

    /// See [`CacheCore::peek`].
    pub fn peek(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        dispatch!(self, core => core.peek(key))
    }

    /// See [`CacheCore::insert`].
    pub fn insert(&mut self, key: K, value: V) -> Result<(), InsertError> {
        dispatch!(self, core => core.insert(key, value))
    }

    /// See [`CacheCore::upsert`].
    pub fn upsert(&mut self, key: K, value: V) -> Result<Option<V>, InsertError> {
        dispatch!(self, core => core.upsert(key, value))
    }

    /// See [`CacheCore::mark_dirty`].
    pub fn mark_dirty(&mut self, key: &K) -> bool {
        dispatch!(self, core => core.mark_dirty(key))
    }

    /// See [`CacheCore::mark_clean`].
    pub fn mark_clean(&mut self, key: &K) -> bool {
        dispatch!(self, core => core.mark_clean(key))
    }

    /// See [`CacheCore::pin`].
    pub fn pin(&mut self, key: &K) -> bool {
        dispatch!(self, core => core.pin(key))
    }

    /// See [`CacheCore::unpin`].
    pub fn unpin(&mut self, key: &K) -> bool {
        dispatch!(self, core => core.unpin(key))
    }

    /// See [`CacheCore::invalidate`].
    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        dispatch!(self, core => core.invalidate(key))
    }

    /// See [`CacheCore::get_dirty`].
    pub fn get_dirty(&self, limit: usize) -> Vec<K> {
        dispatch!(self, core => core.get_dirty(limit))
    }

    /// See [`CacheCore::resize`].
    pub fn resize(&mut self, new_capacity: usize) -> usize {
        dispatch!(self, core => core.resize(new_capacity))
    }

    /// See [`CacheCore::clear`].
    pub fn clear(&mut self) {
        dispatch!(self, core => core.clear())
    }

    /// See [`CacheCore::contains`].
    pub fn contains(&self, key: &K) -> bool {
        dispatch!(self, core => core.contains(key))
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        dispatch!(self, core => core.len())
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        dispatch!(self, core => core.is_empty())
    }

    /// Maximum number of resident entries.
    pub fn capacity(&self) -> usize {
        dispatch!(self, core => core.capacity())
    }

    /// Coherent snapshot of counters and gauges.
    pub fn stats(&self) -> CacheStats {
        dispatch!(self, core => core.stats())
    }

    /// Fraction of lookups that hit.
    pub fn hit_ratio(&self) -> f64 {
        dispatch!(self, core => core.hit_ratio())
    }

    /// Human-readable tag of the active policy.
    pub fn policy_name(&self) -> &'static str {
        dispatch!(self, core => core.policy_name())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        dispatch!(self, core => core.debug_validate_invariants())
    }
}

/// Builder for caches with a runtime-selected policy.
pub struct CacheBuilder {
    capacity: usize,
}

impl CacheBuilder {
    /// Starts a builder for a cache of `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Builds a cache running the given policy.
    pub fn build<K, V>(self, kind: PolicyKind) -> Cache<K, V>
    where
        K: Eq + Hash + Clone,
    {
        match kind {
            PolicyKind::Lru => Cache::Lru(CacheCore::new(self.capacity)),
            PolicyKind::Fifo => Cache::Fifo(CacheCore::new(self.capacity)),
            PolicyKind::Lfu => Cache::Lfu(CacheCore::new(self.capacity)),
            PolicyKind::Clock => Cache::Clock(CacheCore::new(self.capacity)),
            PolicyKind::Sieve => Cache::Sieve(CacheCore::new(self.capacity)),
            PolicyKind::Arc => Cache::Arc(CacheCore::new(self.capacity)),
        }
    }
}

/// All policies, in a stable order; handy for comparison runs and tests.
pub const ALL_POLICIES: [PolicyKind; 6] = [
    PolicyKind::Lru,
    PolicyKind::Fifo,
    PolicyKind::Lfu,
    PolicyKind::Clock,
    PolicyKind::Sieve,
    PolicyKind::Arc,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_policies_support_the_full_surface() {
        for kind in ALL_POLICIES {
            let mut cache = CacheBuilder::new(4).build::<u64, String>(kind);

            cache.insert(1, "one".into()).unwrap();
            cache.insert(2, "two".into()).unwrap();
            assert_eq!(cache.lookup(&1), Some("one".to_string()));
            assert_eq!(cache.lookup(&3), None);
            assert!(cache.contains(&1));
            assert_eq!(cache.len(), 2);

            cache.mark_dirty(&2);
            assert_eq!(cache.get_dirty(8), vec![2]);
            cache.mark_clean(&2);

            cache.pin(&1);
            cache.unpin(&1);
            assert_eq!(cache.invalidate(&2), Some("two".to_string()));

            cache.clear();
            assert!(cache.is_empty());
            assert_eq!(cache.capacity(), 4);
        }
    }

    #[test]
    fn capacity_is_enforced_for_every_policy() {
        for kind in ALL_POLICIES {
            let mut cache = CacheBuilder::new(2).build::<u64, u64>(kind);
            for k in 0..10 {
                let _ = cache.insert(k, k);
            }
            assert_eq!(cache.len(), 2, "policy {:?}", kind);
            assert_eq!(cache.stats().evictions, 8);
        }
    }

    #[test]
    fn policy_names_round_trip_through_from_str() {
        for kind in ALL_POLICIES {
            let mut cache = CacheBuilder::new(1).build::<u64, u64>(kind);
            let parsed: PolicyKind = cache.policy_name().parse().unwrap();
            assert_eq!(parsed, kind);
            let _ = cache.insert(1, 1);
        }
        assert!("mfu".parse::<PolicyKind>().is_err());
    }
}
