//! SIEVE replacement.
//!
//! Same ring-and-hand skeleton as CLOCK, with a visited bit instead of a
//! reference bit: a hit marks the entry visited, and the sweep only ever
//! returns an eligible entry that is *not* visited, demoting visited ones
//! back to unvisited as it passes. Lazy promotion makes SIEVE cheaper than
//! LRU on hits while still separating one-hit wonders from the working set.
//!
//! Bounded to two full passes, like CLOCK.

use crate::ds::{LinkSlot, Ring};
use crate::policy::{Policy, VictimFilter};
use crate::store::{Slab, SlotId};

/// Ring links plus the visited bit, carried by each entry.
#[derive(Debug, Default)]
pub struct SieveMeta {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    visited: bool,
}

impl SieveMeta {
    /// Visited bit: set on every hit, cleared by the sweep.
    pub fn visited(&self) -> bool {
        self.visited
    }
}

impl LinkSlot for SieveMeta {
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

/// SIEVE policy state: the ring and its hand.
#[derive(Debug, Default)]
pub struct SievePolicy {
    ring: Ring,
}

impl<K, V> Policy<K, V> for SievePolicy {
    type Meta = SieveMeta;

    fn with_capacity(_capacity: usize) -> Self {
        Self::default()
    }

    fn name(&self) -> &'static str {
        "SIEVE"
    }

    fn on_access(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        if let Some(entry) = slab.get_mut(id) {
            entry.meta.visited = true;
        }
    }

    fn on_insert(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        self.ring.insert(slab, id);
    }

    fn on_remove(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        self.ring.remove(slab, id);
    }

    fn select_victim(
        &mut self,
        slab: &mut Slab<K, V, Self::Meta>,
        eligible: VictimFilter<'_, K, V, Self::Meta>,
    ) -> Option<SlotId> {
        let len = self.ring.len();
        for _ in 0..2 * len {
            let id = self.ring.hand()?;
            let entry = slab.get_mut(id)?;
            if eligible(entry) {
                if entry.meta.visited {
                    entry.meta.visited = false;
                } else {
                    self.ring.advance(slab);
                    return Some(id);
                }
            }
            self.ring.advance(slab);
        }
        None
    }

    fn clear(&mut self) {
        self.ring.reset();
    }

    fn ordered_slots(&self, slab: &Slab<K, V, Self::Meta>) -> Vec<SlotId> {
        self.ring.iter_from_hand(slab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evictable(entry: &crate::store::Entry<u64, u64, SieveMeta>) -> bool {
        entry.is_evictable()
    }

    fn setup(n: u64) -> (Slab<u64, u64, SieveMeta>, SievePolicy, Vec<SlotId>) {
        let mut slab = Slab::new(n as usize);
        let mut policy = SievePolicy::default();
        let ids: Vec<_> = (0..n)
            .map(|k| {
                let id = slab.alloc(k, k).unwrap();
                Policy::<u64, u64>::on_insert(&mut policy, &mut slab, id);
                id
            })
            .collect();
        (slab, policy, ids)
    }

    #[test]
    fn unvisited_entry_goes_first() {
        let (mut slab, mut policy, ids) = setup(3);
        policy.on_access(&mut slab, ids[0]);
        assert_eq!(policy.select_victim(&mut slab, &evictable), Some(ids[1]));
    }

    #[test]
    fn sweep_demotes_visited_entries() {
        let (mut slab, mut policy, ids) = setup(2);
        policy.on_access(&mut slab, ids[0]);
        policy.on_access(&mut slab, ids[1]);

        assert_eq!(policy.select_victim(&mut slab, &evictable), Some(ids[0]));
        assert!(!slab.get(ids[1]).unwrap().meta.visited());
    }

    #[test]
    fn visited_bit_survives_when_entry_is_ineligible() {
        let (mut slab, mut policy, ids) = setup(3);
        policy.on_access(&mut slab, ids[0]);
        slab.get_mut(ids[0]).unwrap().pin_count = 1;

        assert_eq!(policy.select_victim(&mut slab, &evictable), Some(ids[1]));
        assert!(slab.get(ids[0]).unwrap().meta.visited());
    }

    #[test]
    fn all_ineligible_returns_none() {
        let (mut slab, mut policy, ids) = setup(2);
        for &id in &ids {
            slab.get_mut(id).unwrap().dirty = true;
        }
        assert_eq!(policy.select_victim(&mut slab, &evictable), None);
    }
}
