//! Replacement policies.
//!
//! Every policy implements the same small contract over `(policy state,
//! entry, slab)`: it is told when an entry is accessed, inserted, or removed,
//! and it is asked to pick the next victim among entries that satisfy an
//! eligibility predicate (unpinned and clean, as far as the coordinator is
//! concerned). Policy-specific per-entry state (list links, counters, scan
//! bits) lives in the entry's `meta` payload, whose type each policy chooses.
//!
//! | Policy  | Per-entry payload            | Victim order                        |
//! |---------|------------------------------|-------------------------------------|
//! | LRU     | list links                   | list tail (least recent) → head     |
//! | FIFO    | list links                   | list head (oldest) → tail           |
//! | LFU     | list links + access count    | lowest-count bucket, FIFO inside    |
//! | CLOCK   | ring links + reference bit   | hand sweep, second chance on bit    |
//! | SIEVE   | ring links + visited bit     | hand sweep, only unvisited returned |
//! | ARC     | list links + resident list   | T1 or T2 LRU end, steered by `p`    |

pub mod arc;
pub mod clock;
pub mod fifo;
pub mod lfu;
pub mod lru;
pub mod sieve;

pub use arc::ArcPolicy;
pub use clock::ClockPolicy;
pub use fifo::FifoPolicy;
pub use lfu::LfuPolicy;
pub use lru::LruPolicy;
pub use sieve::SievePolicy;

use std::fmt::Debug;

use crate::store::{Entry, Slab, SlotId};

/// Eligibility predicate handed to [`Policy::select_victim`].
///
/// Encodes which entries eviction may claim; the coordinator passes
/// "unpinned and clean".
pub type VictimFilter<'a, K, V, M> = &'a dyn Fn(&Entry<K, V, M>) -> bool;

/// A replacement policy over slab-resident entries.
///
/// The coordinator owns the slab and calls these hooks under its lock; the
/// policy owns `Meta` (the per-entry payload) and whatever aggregate state it
/// needs (list ends, buckets, a hand, ghost lists).
///
/// Implementations must keep exactly the resident entries in their
/// structures, and `select_victim` must never return an entry the filter
/// rejects. When it returns `None`, the only state it may have changed is the
/// documented scan bookkeeping (reference/visited bits, hand position).
pub trait Policy<K, V>: Sized {
    /// Per-entry payload embedded in the slab entry.
    type Meta: Default + Debug;

    /// Creates the policy for a cache with the given capacity.
    ///
    /// Most policies ignore the capacity; ARC uses it to bound its ghost
    /// lists and clamp the adaptation target.
    fn with_capacity(capacity: usize) -> Self;

    /// Human-readable policy tag.
    fn name(&self) -> &'static str;

    /// Called after a hit on `id` (lookup, or insert finding an existing key).
    fn on_access(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId);

    /// Called after a fresh entry was constructed at `id`.
    fn on_insert(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId);

    /// Called before the entry at `id` leaves through `invalidate` or
    /// `clear`.
    fn on_remove(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId);

    /// Called before the entry at `id` leaves through eviction.
    ///
    /// Defaults to [`on_remove`](Self::on_remove); ARC overrides this to
    /// record the departing key in a ghost list.
    fn on_evict(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        self.on_remove(slab, id);
    }

    /// Returns the next victim satisfying `eligible`, or `None` if no
    /// resident entry does.
    ///
    /// May perform bounded scan bookkeeping (clearing reference/visited
    /// bits, moving the hand) while looking.
    fn select_victim(
        &mut self,
        slab: &mut Slab<K, V, Self::Meta>,
        eligible: VictimFilter<'_, K, V, Self::Meta>,
    ) -> Option<SlotId>;

    /// Called when the owning cache changes capacity.
    fn on_resize(&mut self, _capacity: usize) {}

    /// Drops all aggregate state; entries are being dropped wholesale.
    fn clear(&mut self);

    /// Resident slots in scan order, for diagnostics and structure audits.
    fn ordered_slots(&self, slab: &Slab<K, V, Self::Meta>) -> Vec<SlotId>;
}
