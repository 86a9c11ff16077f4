//! Least Recently Used replacement.
//!
//! One intrusive list, head = most recent. Hits and fresh inserts move the
//! entry to the head; the victim scan starts at the tail and walks toward the
//! head past pinned/dirty entries.

use crate::ds::{LinkSlot, LinkedList};
use crate::policy::{Policy, VictimFilter};
use crate::store::{Slab, SlotId};

/// Recency-list links carried by each entry.
#[derive(Debug, Default)]
pub struct LruMeta {
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

impl LinkSlot for LruMeta {
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

/// LRU policy state: the recency list ends.
#[derive(Debug, Default)]
pub struct LruPolicy {
    list: LinkedList,
}

impl<K, V> Policy<K, V> for LruPolicy {
    type Meta = LruMeta;

    fn with_capacity(_capacity: usize) -> Self {
        Self::default()
    }

    fn name(&self) -> &'static str {
        "LRU"
    }

    fn on_access(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        self.list.move_to_head(slab, id);
    }

    fn on_insert(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        self.list.push_head(slab, id);
    }

    fn on_remove(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        self.list.unlink(slab, id);
    }

    fn select_victim(
        &mut self,
        slab: &mut Slab<K, V, Self::Meta>,
        eligible: VictimFilter<'_, K, V, Self::Meta>,
    ) -> Option<SlotId> {
        let mut cursor = self.list.tail();
        while let Some(id) = cursor {
            let entry = slab.get(id)?;
            if eligible(entry) {
                return Some(id);
            }
            cursor = entry.meta.prev();
        }
        None
    }

    fn clear(&mut self) {
        self.list.reset();
    }

    fn ordered_slots(&self, slab: &Slab<K, V, Self::Meta>) -> Vec<SlotId> {
        self.list.iter_from_tail(slab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evictable(entry: &crate::store::Entry<u64, u64, LruMeta>) -> bool {
        entry.is_evictable()
    }

    fn setup(n: u64) -> (Slab<u64, u64, LruMeta>, LruPolicy, Vec<SlotId>) {
        let mut slab = Slab::new(n as usize);
        let mut policy = LruPolicy::default();
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
    fn victim_is_least_recent() {
        let (mut slab, mut policy, ids) = setup(3);
        // access slot 0: order head→tail is now [0, 2, 1]
        policy.on_access(&mut slab, ids[0]);
        let victim = policy.select_victim(&mut slab, &evictable);
        assert_eq!(victim, Some(ids[1]));
    }

    #[test]
    fn victim_scan_skips_ineligible_tail() {
        let (mut slab, mut policy, ids) = setup(3);
        slab.get_mut(ids[0]).unwrap().pin_count = 1; // tail entry pinned
        let victim = policy.select_victim(&mut slab, &evictable);
        assert_eq!(victim, Some(ids[1]));
    }

    #[test]
    fn no_eligible_victim_returns_none() {
        let (mut slab, mut policy, ids) = setup(2);
        slab.get_mut(ids[0]).unwrap().dirty = true;
        slab.get_mut(ids[1]).unwrap().pin_count = 1;
        assert_eq!(policy.select_victim(&mut slab, &evictable), None);
    }

    #[test]
    fn remove_keeps_order_of_rest() {
        let (mut slab, mut policy, ids) = setup(3);
        Policy::<u64, u64>::on_remove(&mut policy, &mut slab, ids[1]);
        assert_eq!(
            Policy::<u64, u64>::ordered_slots(&policy, &slab),
            vec![ids[0], ids[2]]
        );
    }
}
