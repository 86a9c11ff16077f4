//! Fixed-capacity slab of cache entries with stable `SlotId` handles.
//!
//! All entry records live in one `Vec<Option<Entry>>` allocated up front; a
//! stack of free slot indices governs allocation. Freed slots are reused, and
//! an entry keeps its slot index for its whole residency, so policies can link
//! entries to each other by index without pointer chasing.
//!
//! ## Architecture
//!
//! ```text
//!   slots: Vec<Option<Entry<K, V, M>>>     (length fixed at construction)
//!
//!   index: 0       1       2       3
//!          [entry] [     ] [entry] [     ]
//!                     ^               ^
//!                     |               |
//!                 free = [3, 1]   (stack; top is drawn next)
//! ```
//!
//! The free stack is seeded in reverse so slot 0 is drawn first. Each entry
//! carries the caller's key/value plus the dirty flag, the pin counter, and a
//! policy-owned payload `M` (list links, counters, scan bits).
//!
//! `debug_validate_invariants()` is available in debug/test builds.

use std::fmt;

/// Stable handle to a slab slot.
///
/// A `SlotId` stays valid while the referenced entry is resident; after the
/// entry is released, the numeric index may be reused by a later allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    /// Returns the underlying slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One resident cache entry.
///
/// `dirty` and `pin_count` are caller-managed through the cache coordinator;
/// either being set makes the entry ineligible for eviction. `meta` belongs to
/// the active replacement policy.
#[derive(Debug)]
pub struct Entry<K, V, M> {
    pub key: K,
    pub value: V,
    pub dirty: bool,
    pub pin_count: u32,
    pub slot: SlotId,
    pub meta: M,
}

impl<K, V, M> Entry<K, V, M> {
    /// Returns `true` if eviction may claim this entry.
    #[inline]
    pub fn is_evictable(&self) -> bool {
        self.pin_count == 0 && !self.dirty
    }
}

/// Slab of reusable entry slots.
///
/// Occupancy doubles as the entry's validity: a slot holding `Some` is a
/// resident entry, `None` is free. The slab never shrinks; `grow` extends it
/// when the owning cache is resized upward.
pub struct Slab<K, V, M> {
    slots: Vec<Option<Entry<K, V, M>>>,
    free: Vec<usize>,
    len: usize,
}

impl<K, V, M: Default> Slab<K, V, M> {
    /// Draws a free slot and constructs a fresh entry in it.
    ///
    /// The entry starts clean, unpinned, and with a default policy payload.
    /// Returns `None` when no free slot remains.
    pub fn alloc(&mut self, key: K, value: V) -> Option<SlotId> {
        let idx = self.free.pop()?;
        self.slots[idx] = Some(Entry {
            key,
            value,
            dirty: false,
            pin_count: 0,
            slot: SlotId(idx),
            meta: M::default(),
        });
        self.len += 1;
        Some(SlotId(idx))
    }
}

impl<K, V, M> Slab<K, V, M> {
    /// Creates a slab with `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            free: (0..capacity).rev().collect(),
            len: 0,
        }
    }

    /// Removes the entry at `id` and returns its slot to the free stack.
    pub fn release(&mut self, id: SlotId) -> Option<Entry<K, V, M>> {
        let slot = self.slots.get_mut(id.0)?;
        let entry = slot.take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(entry)
    }

    /// Extends the slab to hold `slot_count` slots.
    ///
    /// Existing slot ids are unaffected. New slots are pushed so the lowest
    /// new index is drawn first.
    pub fn grow(&mut self, slot_count: usize) {
        let old = self.slots.len();
        if slot_count <= old {
            return;
        }
        self.slots.resize_with(slot_count, || None);
        for idx in (old..slot_count).rev() {
            self.free.push(idx);
        }
    }

    /// Drops every entry and reseeds the free stack.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.free.clear();
        self.free.extend((0..self.slots.len()).rev());
        self.len = 0;
    }

    /// Returns a shared reference to the entry at `id`, if resident.
    #[inline]
    pub fn get(&self, id: SlotId) -> Option<&Entry<K, V, M>> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    /// Returns a mutable reference to the entry at `id`, if resident.
    #[inline]
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut Entry<K, V, M>> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Returns `true` if `id` currently refers to a resident entry.
    pub fn contains(&self, id: SlotId) -> bool {
        self.slots
            .get(id.0)
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Returns the number of resident entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no entry is resident.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of physical slots (resident plus free).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Iterates over resident entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry<K, V, M>> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let live = self.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(self.len, live);

        let mut seen_free = std::collections::HashSet::new();
        for &idx in &self.free {
            assert!(idx < self.slots.len());
            assert!(self.slots[idx].is_none(), "free slot {idx} holds an entry");
            assert!(seen_free.insert(idx), "slot {idx} on free stack twice");
        }
        assert_eq!(self.slots.len(), self.free.len() + self.len);

        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = slot {
                assert_eq!(entry.slot.index(), idx);
            }
        }
    }
}

impl<K, V, M> fmt::Debug for Slab<K, V, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slab")
            .field("len", &self.len)
            .field("slot_count", &self.slots.len())
            .field("free", &self.free.len())
            .finish()
    }
}
