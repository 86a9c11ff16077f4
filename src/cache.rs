//! Cache coordinator: the public operations over slab, index, and policy.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                       CacheCore<K, V, P>                          │
//! │                                                                   │
//! │   index: FxHashMap<K, SlotId>      keys of resident entries only  │
//! │   slab:  Slab<K, V, P::Meta>       entry records + free stack     │
//! │   policy: P                        replacement decisions          │
//! │   hits / misses / evictions        counters                       │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per operation: consult the index; on a hit run the policy's access hook;
//! on an admitting insert select a victim when full, recycle its slot, then
//! run the insert hook. Values come back as copies; the slab is never exposed
//! as live references. Nothing here blocks, and nothing panics on missing
//! keys or a saturated cache.
//!
//! An entry with `pin_count > 0` or the dirty flag set is skipped by victim
//! selection, so a saturated cache full of pinned/dirty entries refuses new
//! inserts. That back-pressure is what a write-back flusher keys off
//! (`get_dirty` → write out → `mark_clean`).
//!
//! `CacheCore` is single-threaded; [`crate::sync::ConcurrentCache`] wraps it
//! in the one exclusive lock shared callers use.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::error::InsertError;
use crate::policy::Policy;
use crate::stats::CacheStats;
use crate::store::{Slab, SlotId};

/// Capacity-bounded key/value cache with a pluggable replacement policy.
///
/// # Example
///
/// ```
/// use pagecache::cache::CacheCore;
/// use pagecache::policy::lru::LruPolicy;
///
/// let mut cache: CacheCore<u64, String, LruPolicy> = CacheCore::new(2);
/// cache.insert(1, "one".into()).unwrap();
/// cache.insert(2, "two".into()).unwrap();
/// assert_eq!(cache.lookup(&1), Some("one".into()));
///
/// cache.insert(3, "three".into()).unwrap(); // evicts 2, the least recent
/// assert!(!cache.contains(&2));
/// assert_eq!(cache.evictions(), 1);
/// ```
pub struct CacheCore<K, V, P: Policy<K, V>> {
    slab: Slab<K, V, P::Meta>,
    index: FxHashMap<K, SlotId>,
    policy: P,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K, V, P> CacheCore<K, V, P>
where
    K: Eq + Hash + Clone,
    P: Policy<K, V>,
{
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, P::with_capacity(capacity))
    }

    /// Creates a cache with an explicitly constructed policy.
    pub fn with_policy(capacity: usize, policy: P) -> Self {
        Self {
            slab: Slab::new(capacity),
            index: FxHashMap::default(),
            policy,
            capacity,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Looks up `key`, returning a copy of its value.
    ///
    /// A hit runs the policy's access hook and counts toward `hits`; a miss
    /// counts toward `misses`.
    pub fn lookup(&mut self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let id = match self.index.get(key) {
            Some(&id) => id,
            None => {
                self.misses += 1;
                return None;
            },
        };
        match self.slab.get(id) {
            Some(entry) => {
                let value = entry.value.clone();
                self.policy.on_access(&mut self.slab, id);
                self.hits += 1;
                Some(value)
            },
            None => {
                self.misses += 1;
                None
            },
        }
    }

    /// Returns a copy of `key`'s value without touching policy state or
    /// counters.
    pub fn peek(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let id = *self.index.get(key)?;
        self.slab.get(id).map(|entry| entry.value.clone())
    }

    /// Inserts a fresh entry, evicting a victim if the cache is full.
    ///
    /// An already-resident key is refused with
    /// [`InsertError::AlreadyResident`] (its value untouched, its policy
    /// position refreshed). A full cache with no eligible victim refuses with
    /// [`InsertError::NotAdmitted`].
    pub fn insert(&mut self, key: K, value: V) -> Result<(), InsertError> {
        if let Some(&id) = self.index.get(&key) {
            self.policy.on_access(&mut self.slab, id);
            return Err(InsertError::AlreadyResident);
        }

        // a shrunk cache can sit over capacity until victims drain, so keep
        // evicting until there is room for this entry
        while self.slab.len() >= self.capacity {
            if !self.evict_one() {
                return Err(InsertError::NotAdmitted);
            }
            self.evictions += 1;
        }

        let id = match self.slab.alloc(key.clone(), value) {
            Some(id) => id,
            None => return Err(InsertError::NotAdmitted),
        };
        self.index.insert(key, id);
        self.policy.on_insert(&mut self.slab, id);
        Ok(())
    }

    /// Inserts or overwrites, returning the previous value if the key was
    /// resident.
    ///
    /// The overwrite path runs the access hook, like a hit.
    pub fn upsert(&mut self, key: K, value: V) -> Result<Option<V>, InsertError> {
        if let Some(&id) = self.index.get(&key) {
            if let Some(entry) = self.slab.get_mut(id) {
                let old = std::mem::replace(&mut entry.value, value);
                self.policy.on_access(&mut self.slab, id);
                return Ok(Some(old));
            }
        }
        self.insert(key, value).map(|()| None)
    }

    /// Sets the dirty flag of a resident entry. No-op on absent keys.
    pub fn mark_dirty(&mut self, key: &K) -> bool {
        match self.entry_mut(key) {
            Some(entry) => {
                entry.dirty = true;
                true
            },
            None => false,
        }
    }

    /// Clears the dirty flag of a resident entry. No-op on absent keys.
    pub fn mark_clean(&mut self, key: &K) -> bool {
        match self.entry_mut(key) {
            Some(entry) => {
                entry.dirty = false;
                true
            },
            None => false,
        }
    }

    /// Pins a resident entry, shielding it from eviction. No-op on absent
    /// keys.
    pub fn pin(&mut self, key: &K) -> bool {
        match self.entry_mut(key) {
            Some(entry) => {
                entry.pin_count += 1;
                true
            },
            None => false,
        }
    }

    /// Drops one pin from a resident entry, clamping at zero. No-op on
    /// absent keys.
    pub fn unpin(&mut self, key: &K) -> bool {
        match self.entry_mut(key) {
            Some(entry) => {
                entry.pin_count = entry.pin_count.saturating_sub(1);
                true
            },
            None => false,
        }
    }

    /// Drops a resident entry, returning its value. Not an eviction: the
    /// policy's remove hook runs and no ghost/counter state is touched.
    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        self.policy.on_remove(&mut self.slab, id);
        self.slab.release(id).map(|entry| entry.value)
    }

    /// Snapshots up to `limit` keys of dirty resident entries, in
    /// unspecified order.
    pub fn get_dirty(&self, limit: usize) -> Vec<K> {
        self.slab
            .iter()
            .filter(|entry| entry.dirty)
            .take(limit)
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Changes the capacity, evicting while the cache is over the new bound.
    ///
    /// Returns the resulting residency. Pinned/dirty entries can leave it
    /// above `new_capacity`; inserts stay refused until it drains. Shrink
    /// evictions go through the policy (ARC records ghosts) but do not count
    /// toward the `evictions` counter, which tracks insert-path replacements.
    pub fn resize(&mut self, new_capacity: usize) -> usize {
        if new_capacity > self.slab.slot_count() {
            self.slab.grow(new_capacity);
        }
        self.capacity = new_capacity;
        self.policy.on_resize(new_capacity);
        while self.slab.len() > new_capacity {
            if !self.evict_one() {
                break;
            }
        }
        self.slab.len()
    }

    /// Drops every entry and resets policy state, the free stack, and all
    /// counters. The result is indistinguishable from a fresh cache of the
    /// same capacity.
    pub fn clear(&mut self) {
        self.index.clear();
        self.policy.clear();
        self.slab.reset();
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    /// Returns `true` if `key` is resident, without touching policy state.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.slab.len()
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    /// Maximum number of resident entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lookup hits so far.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookup misses so far.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Insert-path replacements so far.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Fraction of lookups that hit, or `0.0` before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        self.stats().hit_ratio()
    }

    /// Coherent snapshot of counters and gauges.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            len: self.slab.len(),
            capacity: self.capacity,
        }
    }

    /// Human-readable tag of the active policy.
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Pin count of a resident entry.
    pub fn pin_count(&self, key: &K) -> Option<u32> {
        let id = *self.index.get(key)?;
        self.slab.get(id).map(|entry| entry.pin_count)
    }

    /// Dirty flag of a resident entry.
    pub fn is_dirty(&self, key: &K) -> Option<bool> {
        let id = *self.index.get(key)?;
        self.slab.get(id).map(|entry| entry.dirty)
    }

    /// Borrows the policy, for policy-specific probes (ARC's target, ghost
    /// membership).
    pub fn policy(&self) -> &P {
        &self.policy
    }

    fn entry_mut(&mut self, key: &K) -> Option<&mut crate::store::Entry<K, V, P::Meta>> {
        let id = *self.index.get(key)?;
        self.slab.get_mut(id)
    }

    /// Evicts one eligible entry through the policy; `false` if none exists.
    fn evict_one(&mut self) -> bool {
        let victim = match self
            .policy
            .select_victim(&mut self.slab, &|entry| entry.is_evictable())
        {
            Some(id) => id,
            None => return false,
        };
        self.policy.on_evict(&mut self.slab, victim);
        if let Some(entry) = self.slab.release(victim) {
            self.index.remove(&entry.key);
        }
        true
    }

    /// Renders resident entries in policy scan order with their flags, plus
    /// counters. Walks the policy's internal structures, so it doubles as a
    /// structure probe when debugging.
    #[cfg(feature = "dump")]
    pub fn state_dump(&self) -> String
    where
        K: std::fmt::Debug,
    {
        use std::fmt::Write as _;

        let mut out = String::new();
        let stats = self.stats();
        let _ = writeln!(
            out,
            "{} cache: {}/{} resident, hits={} misses={} evictions={} hit_ratio={:.2}",
            self.policy.name(),
            stats.len,
            stats.capacity,
            stats.hits,
            stats.misses,
            stats.evictions,
            stats.hit_ratio(),
        );
        for id in self.policy.ordered_slots(&self.slab) {
            if let Some(entry) = self.slab.get(id) {
                let _ = writeln!(
                    out,
                    "  slot {:>4}  key {:?}  pins={} {}",
                    id.index(),
                    entry.key,
                    entry.pin_count,
                    if entry.dirty { "dirty" } else { "clean" },
                );
            }
        }
        out
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.slab.debug_validate_invariants();
        assert!(self.index.len() == self.slab.len(), "index/slab len mismatch");

        for (key, &id) in &self.index {
            let entry = self.slab.get(id).expect("index points at free slot");
            assert!(&entry.key == key, "index key mismatch");
        }

        // the policy tracks exactly the resident slots, each once
        let ordered = self.policy.ordered_slots(&self.slab);
        assert_eq!(ordered.len(), self.slab.len(), "policy tracks wrong count");
        let mut seen = std::collections::HashSet::new();
        for id in ordered {
            assert!(self.slab.contains(id), "policy tracks freed slot");
            assert!(seen.insert(id), "policy tracks slot twice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::clock::ClockPolicy;
    use crate::policy::lru::LruPolicy;

    type LruCache = CacheCore<u64, String, LruPolicy>;

    fn filled(capacity: usize) -> LruCache {
        let mut cache = LruCache::new(capacity);
        for k in 0..capacity as u64 {
            cache.insert(k, format!("v{k}")).unwrap();
        }
        cache
    }

    #[test]
    fn lookup_hit_returns_copy_and_counts() {
        let mut cache = filled(2);
        assert_eq!(cache.lookup(&0), Some("v0".to_string()));
        assert_eq!(cache.lookup(&9), None);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hit_ratio(), 0.5);
    }

    #[test]
    fn insert_existing_key_is_refused_and_keeps_value() {
        let mut cache = filled(2);
        assert_eq!(
            cache.insert(0, "other".into()),
            Err(InsertError::AlreadyResident)
        );
        assert_eq!(cache.peek(&0), Some("v0".to_string()));
        // refusal is not a lookup; counters untouched
        assert_eq!(cache.hits() + cache.misses(), 0);
    }

    #[test]
    fn insert_when_full_evicts_and_counts() {
        let mut cache = filled(2);
        cache.insert(2, "v2".into()).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.evictions(), 1);
        assert!(!cache.contains(&0)); // LRU victim
        cache.debug_validate_invariants();
    }

    #[test]
    fn pinned_and_dirty_entries_block_admission() {
        let mut cache = filled(2);
        cache.pin(&0);
        cache.mark_dirty(&1);
        assert_eq!(cache.insert(2, "v2".into()), Err(InsertError::NotAdmitted));
        assert!(cache.contains(&0));
        assert!(cache.contains(&1));
        assert_eq!(cache.evictions(), 0);
    }

    #[test]
    fn unpin_clamps_at_zero_and_restores_evictability() {
        let mut cache = filled(1);
        cache.pin(&0);
        cache.pin(&0);
        assert_eq!(cache.pin_count(&0), Some(2));
        cache.unpin(&0);
        assert_eq!(cache.insert(1, "v1".into()), Err(InsertError::NotAdmitted));
        cache.unpin(&0);
        cache.unpin(&0); // extra unpin clamps
        assert_eq!(cache.pin_count(&0), Some(0));
        cache.insert(1, "v1".into()).unwrap();
        assert!(!cache.contains(&0));
    }

    #[test]
    fn mark_clean_undoes_mark_dirty() {
        let mut cache = filled(1);
        cache.mark_dirty(&0);
        assert_eq!(cache.is_dirty(&0), Some(true));
        cache.mark_clean(&0);
        assert_eq!(cache.is_dirty(&0), Some(false));
        cache.insert(1, "v1".into()).unwrap();
    }

    #[test]
    fn flag_ops_on_absent_keys_are_noops() {
        let mut cache = LruCache::new(2);
        assert!(!cache.mark_dirty(&7));
        assert!(!cache.mark_clean(&7));
        assert!(!cache.pin(&7));
        assert!(!cache.unpin(&7));
        assert!(cache.invalidate(&7).is_none());
    }

    #[test]
    fn invalidate_is_not_an_eviction() {
        let mut cache = filled(2);
        assert_eq!(cache.invalidate(&0), Some("v0".to_string()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.evictions(), 0);
        cache.debug_validate_invariants();
    }

    #[test]
    fn invalidate_ignores_pins() {
        let mut cache = filled(1);
        cache.pin(&0);
        cache.mark_dirty(&0);
        assert!(cache.invalidate(&0).is_some());
        assert!(cache.is_empty());
    }

    #[test]
    fn get_dirty_snapshots_up_to_limit() {
        let mut cache = filled(3);
        cache.mark_dirty(&0);
        cache.mark_dirty(&2);
        let mut dirty = cache.get_dirty(16);
        dirty.sort_unstable();
        assert_eq!(dirty, vec![0, 2]);
        assert_eq!(cache.get_dirty(1).len(), 1);
        assert_eq!(cache.get_dirty(0).len(), 0);
    }

    #[test]
    fn upsert_overwrites_resident_value() {
        let mut cache = filled(2);
        assert_eq!(cache.upsert(0, "new".into()), Ok(Some("v0".to_string())));
        assert_eq!(cache.peek(&0), Some("new".to_string()));
        assert_eq!(cache.upsert(5, "v5".into()), Ok(None));
        assert_eq!(cache.evictions(), 1);
    }

    #[test]
    fn resize_down_evicts_eligible_entries() {
        let mut cache = filled(4);
        assert_eq!(cache.resize(2), 2);
        assert_eq!(cache.capacity(), 2);
        assert_eq!(cache.evictions(), 0); // shrink is not an insert-path eviction
        cache.debug_validate_invariants();
    }

    #[test]
    fn resize_down_stalls_on_pinned_entries() {
        let mut cache = filled(3);
        for k in 0..3 {
            cache.pin(&k);
        }
        assert_eq!(cache.resize(1), 3); // nothing could go
        assert_eq!(cache.insert(9, "v9".into()), Err(InsertError::NotAdmitted));

        for k in 0..3 {
            cache.unpin(&k);
        }
        cache.insert(9, "v9".into()).unwrap(); // drains down to capacity
        assert_eq!(cache.len(), 1);
        cache.debug_validate_invariants();
    }

    #[test]
    fn resize_up_admits_more() {
        let mut cache = filled(1);
        assert_eq!(cache.resize(3), 1);
        cache.insert(10, "v10".into()).unwrap();
        cache.insert(11, "v11".into()).unwrap();
        assert_eq!(cache.len(), 3);
        cache.debug_validate_invariants();
    }

    #[test]
    fn resize_to_zero_then_back() {
        let mut cache = filled(2);
        assert_eq!(cache.resize(0), 0);
        assert_eq!(cache.insert(1, "x".into()), Err(InsertError::NotAdmitted));
        cache.resize(1);
        cache.insert(1, "x".into()).unwrap();
    }

    #[test]
    fn clear_matches_fresh_cache() {
        let mut cache = filled(2);
        cache.lookup(&0);
        cache.mark_dirty(&1);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 2);
        assert_eq!(cache.stats(), CacheStats {
            hits: 0,
            misses: 0,
            evictions: 0,
            len: 0,
            capacity: 2
        });
        cache.insert(5, "v5".into()).unwrap();
        assert_eq!(cache.lookup(&5), Some("v5".to_string()));
        cache.debug_validate_invariants();
    }

    #[test]
    fn zero_capacity_refuses_everything() {
        let mut cache = LruCache::new(0);
        assert_eq!(cache.capacity(), 0);
        assert_eq!(cache.insert(1, "x".into()), Err(InsertError::NotAdmitted));
        assert_eq!(cache.lookup(&1), None);
    }

    #[test]
    fn works_with_ring_policies_too() {
        let mut cache: CacheCore<u64, u64, ClockPolicy> = CacheCore::new(2);
        cache.insert(1, 10).unwrap();
        cache.insert(2, 20).unwrap();
        cache.lookup(&1);
        cache.insert(3, 30).unwrap();
        assert!(cache.contains(&1)); // referenced, got its second chance
        assert!(!cache.contains(&2));
        cache.debug_validate_invariants();
    }

    #[cfg(feature = "dump")]
    #[test]
    fn state_dump_walks_policy_order() {
        let mut cache = filled(3);
        cache.pin(&1);
        cache.mark_dirty(&2);
        let dump = cache.state_dump();
        assert!(dump.starts_with("LRU cache: 3/3 resident"));
        assert!(dump.contains("pins=1"));
        assert!(dump.contains("dirty"));
        // one line per resident entry, plus the header
        assert_eq!(dump.lines().count(), 4);
    }

    #[test]
    fn peek_does_not_touch_counters_or_order() {
        let mut cache = filled(2);
        assert_eq!(cache.peek(&0), Some("v0".to_string()));
        assert_eq!(cache.hits() + cache.misses(), 0);
        // 0 was not promoted by peek, so it is still the LRU victim
        cache.insert(2, "v2".into()).unwrap();
        assert!(!cache.contains(&0));
    }
}
