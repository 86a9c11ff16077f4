//! Shared-cache wrapper: one exclusive lock around the whole core.
//!
//! Parallel callers share a single cache instance through a
//! `parking_lot::Mutex`. Every operation takes the lock, runs the core
//! operation, and releases it; nothing blocks or suspends while holding it,
//! so critical sections stay short (a victim scan over ineligible entries is
//! the worst case). All operations on one instance are linearizable, and
//! `stats()` snapshots are coherent because they are taken under the same
//! lock.
//!
//! A write-back flusher runs against this type from its own thread:
//! `get_dirty` → write the pages out → `mark_clean`, with `pin`/`unpin`
//! bracketing pages the embedder is actively using.

use std::hash::Hash;

use parking_lot::Mutex;

use crate::cache::CacheCore;
use crate::error::InsertError;
use crate::policy::Policy;
use crate::stats::CacheStats;

/// Thread-safe cache: [`CacheCore`] behind one exclusive lock.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pagecache::policy::lru::LruPolicy;
/// use pagecache::sync::ConcurrentCache;
///
/// let cache: Arc<ConcurrentCache<u64, Vec<u8>, LruPolicy>> =
///     Arc::new(ConcurrentCache::new(1024));
///
/// let worker = cache.clone();
/// std::thread::spawn(move || {
///     worker.insert(1, vec![0u8; 16]).ok();
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(cache.lookup(&1), Some(vec![0u8; 16]));
/// ```
pub struct ConcurrentCache<K, V, P: Policy<K, V>> {
    inner: Mutex<CacheCore<K, V, P>>,
}

impl<K, V, P> ConcurrentCache<K, V, P>
where
    K: Eq + Hash + Clone,
    P: Policy<K, V>,
{
    /// Creates a shared cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheCore::new(capacity)),
        }
    }

    /// Wraps an already-configured core.
    pub fn from_core(core: CacheCore<K, V, P>) -> Self {
        Self {
            inner: Mutex::new(core),
        }
    }

    /// See [`CacheCore::lookup`].
    pub fn lookup(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.lock().lookup(key)
    }

    /// See [`CacheCore::peek`].
    pub fn peek(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.lock().peek(key)
    }

    /// See [`CacheCore::insert`].
    pub fn insert(&self, key: K, value: V) -> Result<(), InsertError> {
        self.inner.lock().insert(key, value)
    }

    /// See [`CacheCore::upsert`].
    pub fn upsert(&self, key: K, value: V) -> Result<Option<V>, InsertError> {
        self.inner.lock().upsert(key, value)
    }

    /// See [`CacheCore::mark_dirty`].
    pub fn mark_dirty(&self, key: &K) -> bool {
        self.inner.lock().mark_dirty(key)
    }

    /// See [`CacheCore::mark_clean`].
    pub fn mark_clean(&self, key: &K) -> bool {
        self.inner.lock().mark_clean(key)
    }

    /// See [`CacheCore::pin`].
    pub fn pin(&self, key: &K) -> bool {
        self.inner.lock().pin(key)
    }

    /// See [`CacheCore::unpin`].
    pub fn unpin(&self, key: &K) -> bool {
        self.inner.lock().unpin(key)
    }

    /// See [`CacheCore::invalidate`].
    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.inner.lock().invalidate(key)
    }

    /// See [`CacheCore::get_dirty`].
    pub fn get_dirty(&self, limit: usize) -> Vec<K> {
        self.inner.lock().get_dirty(limit)
    }

    /// See [`CacheCore::resize`].
    pub fn resize(&self, new_capacity: usize) -> usize {
        self.inner.lock().resize(new_capacity)
    }

    /// See [`CacheCore::clear`].
    pub fn clear(&self) {
        self.inner.lock().clear()
    }

    /// See [`CacheCore::contains`].
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Maximum number of resident entries.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Coherent snapshot of counters and gauges.
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }

    /// Fraction of lookups that hit.
    pub fn hit_ratio(&self) -> f64 {
        self.inner.lock().hit_ratio()
    }

    /// Human-readable tag of the active policy.
    pub fn policy_name(&self) -> &'static str {
        self.inner.lock().policy_name()
    }

    /// Runs `f` with the core held under the lock, for multi-step sequences
    /// that must be atomic against other callers.
    pub fn with_core<R>(&self, f: impl FnOnce(&mut CacheCore<K, V, P>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
