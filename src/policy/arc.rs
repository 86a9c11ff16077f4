//! Adaptive Replacement Cache (ARC).
//!
//! Four lists and one dial:
//!
//! ```text
//!   T1 (seen once, resident)      T2 (seen again, resident)
//!   head=MRU ──────── tail=LRU    head=MRU ──────── tail=LRU
//!        │ evicted                     │ evicted
//!        ▼                             ▼
//!   B1 (ghost keys)                B2 (ghost keys)
//! ```
//!
//! `p` is the target share of capacity given to T1. A miss whose key is
//! remembered in B1 says "recency would have won" and grows `p`; a miss
//! remembered in B2 says "frequency would have won" and shrinks it. Ghost
//! lists hold keys only and are each capped at the cache capacity.
//!
//! Resident movement: a hit in T1 promotes the entry to T2's MRU end; a hit
//! in T2 refreshes its MRU position. Fresh keys with no ghost history land in
//! T1; keys returning from either ghost list land directly in T2.
//!
//! Victim selection follows `p`: T1 is scanned (LRU→MRU) while it exceeds its
//! target, T2 otherwise, and whichever list was not preferred is scanned as a
//! fallback so eviction only ever fails when every resident entry is pinned
//! or dirty.
//!
//! Reference: Megiddo & Modha, "ARC: A Self-Tuning, Low Overhead Replacement
//! Cache", FAST 2003.

use std::hash::Hash;

use crate::ds::{GhostList, LinkSlot, LinkedList};
use crate::policy::{Policy, VictimFilter};
use crate::store::{Slab, SlotId};

/// Which resident list an entry is on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Residency {
    /// T1: resident, seen exactly once.
    #[default]
    Recent,
    /// T2: resident, seen more than once.
    Frequent,
}

/// List links plus the resident-list tag, carried by each entry.
#[derive(Debug, Default)]
pub struct ArcMeta {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    residency: Residency,
}

impl ArcMeta {
    /// `true` once the entry has been promoted to the frequent list.
    pub fn is_frequent(&self) -> bool {
        self.residency == Residency::Frequent
    }
}

impl LinkSlot for ArcMeta {
    fn prev(&self) -> Option<SlotId> {
        self.prev
    }
    fn next(&self) -> Option<SlotId> {
        self.next
    }
    fn set_prev(&mut self, link: Option<SlotId>) {
        self.prev = link;
    }
    fn set_next(&mut self, link: Option<SlotId>) {
        self.next = link;
    }
}

/// ARC policy state: resident lists, ghost lists, and the adaptation target.
#[derive(Debug)]
pub struct ArcPolicy<K> {
    t1: LinkedList,
    t2: LinkedList,
    b1: GhostList<K>,
    b2: GhostList<K>,
    /// Target size for T1, in `[0, capacity]`.
    p: usize,
    capacity: usize,
}

impl<K> ArcPolicy<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates the policy for a cache of `capacity` entries.
    ///
    /// The capacity bounds both ghost lists and clamps the adaptation
    /// target, which starts at 0 (all of the cache belongs to T2 on paper
    /// until recency earns a share).
    pub fn new(capacity: usize) -> Self {
        Self {
            t1: LinkedList::default(),
            t2: LinkedList::default(),
            b1: GhostList::new(capacity),
            b2: GhostList::new(capacity),
            p: 0,
            capacity,
        }
    }

    /// Current adaptation target for T1.
    pub fn target_recent(&self) -> usize {
        self.p
    }

    /// Resident list lengths `(|T1|, |T2|)`.
    pub fn resident_lens(&self) -> (usize, usize) {
        (self.t1.len(), self.t2.len())
    }

    /// Ghost list lengths `(|B1|, |B2|)`.
    pub fn ghost_lens(&self) -> (usize, usize) {
        (self.b1.len(), self.b2.len())
    }

    /// `true` if `key` is remembered in B1 or B2.
    pub fn remembers(&self, key: &K) -> bool {
        self.b1.contains(key) || self.b2.contains(key)
    }

    fn scan<V>(
        list: &LinkedList,
        slab: &Slab<K, V, ArcMeta>,
        eligible: VictimFilter<'_, K, V, ArcMeta>,
    ) -> Option<SlotId> {
        let mut cursor = list.tail();
        while let Some(id) = cursor {
            let entry = slab.get(id)?;
            if eligible(entry) {
                return Some(id);
            }
            cursor = entry.meta.prev();
        }
        None
    }
}

impl<K, V> Policy<K, V> for ArcPolicy<K>
where
    K: Eq + Hash + Clone,
{
    type Meta = ArcMeta;

    fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity)
    }

    fn name(&self) -> &'static str {
        "ARC"
    }

    fn on_access(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        let residency = match slab.get(id) {
            Some(entry) => entry.meta.residency,
            None => return,
        };
        match residency {
            Residency::Recent => {
                self.t1.unlink(slab, id);
                if let Some(entry) = slab.get_mut(id) {
                    entry.meta.residency = Residency::Frequent;
                }
                self.t2.push_head(slab, id);
            },
            Residency::Frequent => self.t2.move_to_head(slab, id),
        }
    }

    fn on_insert(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        let key = match slab.get(id) {
            Some(entry) => entry.key.clone(),
            None => return,
        };

        if self.b1.contains(&key) {
            // recency ghost hit: grow the T1 target
            let delta = (self.b2.len() / self.b1.len()).max(1);
            self.p = (self.p + delta).min(self.capacity);
            self.b1.remove(&key);
            if let Some(entry) = slab.get_mut(id) {
                entry.meta.residency = Residency::Frequent;
            }
            self.t2.push_head(slab, id);
        } else if self.b2.contains(&key) {
            // frequency ghost hit: shrink the T1 target
            let delta = (self.b1.len() / self.b2.len()).max(1);
            self.p = self.p.saturating_sub(delta);
            self.b2.remove(&key);
            if let Some(entry) = slab.get_mut(id) {
                entry.meta.residency = Residency::Frequent;
            }
            self.t2.push_head(slab, id);
        } else {
            self.t1.push_head(slab, id);
        }
    }

    fn on_remove(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        let residency = match slab.get(id) {
            Some(entry) => entry.meta.residency,
            None => return,
        };
        match residency {
            Residency::Recent => self.t1.unlink(slab, id),
            Residency::Frequent => self.t2.unlink(slab, id),
        }
    }

    fn on_evict(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        let (key, residency) = match slab.get(id) {
            Some(entry) => (entry.key.clone(), entry.meta.residency),
            None => return,
        };
        match residency {
            Residency::Recent => {
                self.t1.unlink(slab, id);
                self.b1.record(key);
            },
            Residency::Frequent => {
                self.t2.unlink(slab, id);
                self.b2.record(key);
            },
        }
    }

    fn select_victim(
        &mut self,
        slab: &mut Slab<K, V, Self::Meta>,
        eligible: VictimFilter<'_, K, V, Self::Meta>,
    ) -> Option<SlotId> {
        let prefer_recent = if self.t1.len() > self.p {
            true
        } else {
            // at target with a populated T2, the frequent side pays
            !(self.t1.len() == self.p && !self.t2.is_empty())
        };
        let (first, second) = if prefer_recent {
            (&self.t1, &self.t2)
        } else {
            (&self.t2, &self.t1)
        };
        // fall back to the other resident list so admission only fails when
        // every resident entry is ineligible
        Self::scan(first, slab, eligible).or_else(|| Self::scan(second, slab, eligible))
    }

    fn on_resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.p = self.p.min(capacity);
        self.b1.set_capacity(capacity);
        self.b2.set_capacity(capacity);
    }

    fn clear(&mut self) {
        self.t1.reset();
        self.t2.reset();
        self.b1.clear();
        self.b2.clear();
        self.p = 0;
    }

    fn ordered_slots(&self, slab: &Slab<K, V, Self::Meta>) -> Vec<SlotId> {
        let mut out = self.t1.iter_from_tail(slab);
        out.extend(self.t2.iter_from_tail(slab));
        out
    }
}
