//! CLOCK (second chance) replacement.
//!
//! Resident entries form a circular list swept by a hand. A hit only sets the
//! entry's reference bit; no list surgery happens until eviction, when the
//! hand sweeps forward, clearing reference bits it finds set and stopping at
//! the first eligible entry whose bit is already clear. An entry accessed
//! since the last sweep therefore survives one extra rotation.
//!
//! The sweep is bounded to two full rotations: the first pass can clear every
//! bit, the second must then find a victim unless every entry is pinned or
//! dirty.

use crate::ds::{LinkSlot, Ring};
use crate::policy::{Policy, VictimFilter};
use crate::store::{Slab, SlotId};

/// Ring links plus the reference bit, carried by each entry.
#[derive(Debug, Default)]
pub struct ClockMeta {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    referenced: bool,
}

impl ClockMeta {
    /// Reference bit: set on every hit, cleared by the sweep.
    pub fn referenced(&self) -> bool {
        self.referenced
    }
}

impl LinkSlot for ClockMeta {
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

/// CLOCK policy state: the ring and its hand.
#[derive(Debug, Default)]
pub struct ClockPolicy {
    ring: Ring,
}

impl<K, V> Policy<K, V> for ClockPolicy {
    type Meta = ClockMeta;

    fn with_capacity(_capacity: usize) -> Self {
        Self::default()
    }

    fn name(&self) -> &'static str {
        "CLOCK"
    }

    fn on_access(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        if let Some(entry) = slab.get_mut(id) {
            entry.meta.referenced = true;
        }
    }

    fn on_insert(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        // fresh entries start unreferenced; only a hit earns the second chance
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
                if entry.meta.referenced {
                    entry.meta.referenced = false;
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

    fn evictable(entry: &crate::store::Entry<u64, u64, ClockMeta>) -> bool {
        entry.is_evictable()
    }

    fn setup(n: u64) -> (Slab<u64, u64, ClockMeta>, ClockPolicy, Vec<SlotId>) {
        let mut slab = Slab::new(n as usize);
        let mut policy = ClockPolicy::default();
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
    fn unreferenced_entry_goes_first() {
        let (mut slab, mut policy, ids) = setup(3);
        policy.on_access(&mut slab, ids[0]);
        policy.on_access(&mut slab, ids[1]);
        // ids[2] is the only one never hit since insert
        assert_eq!(policy.select_victim(&mut slab, &evictable), Some(ids[2]));
    }

    #[test]
    fn sweep_clears_bits_as_second_chance() {
        let (mut slab, mut policy, ids) = setup(2);
        policy.on_access(&mut slab, ids[0]);
        policy.on_access(&mut slab, ids[1]);

        // all referenced: first rotation strips the bits, second picks the
        // entry under the hand
        assert_eq!(policy.select_victim(&mut slab, &evictable), Some(ids[0]));
        assert!(!slab.get(ids[1]).unwrap().meta.referenced());
    }

    #[test]
    fn sweep_ignores_bits_of_ineligible_entries() {
        let (mut slab, mut policy, ids) = setup(3);
        policy.on_access(&mut slab, ids[1]);
        slab.get_mut(ids[0]).unwrap().pin_count = 1;
        slab.get_mut(ids[0]).unwrap().meta.referenced = true;

        assert_eq!(policy.select_victim(&mut slab, &evictable), Some(ids[2]));
        // pinned entry kept its bit; the sweep only clears eligible ones
        assert!(slab.get(ids[0]).unwrap().meta.referenced());
    }

    #[test]
    fn all_ineligible_returns_none_after_two_rotations() {
        let (mut slab, mut policy, ids) = setup(2);
        slab.get_mut(ids[0]).unwrap().dirty = true;
        slab.get_mut(ids[1]).unwrap().pin_count = 1;
        assert_eq!(policy.select_victim(&mut slab, &evictable), None);
    }

    #[test]
    fn hand_moves_past_returned_victim() {
        let (mut slab, mut policy, ids) = setup(3);
        assert_eq!(policy.select_victim(&mut slab, &evictable), Some(ids[0]));
        assert_eq!(policy.ring.hand(), Some(ids[1]));
    }
}
