//! First In, First Out replacement.
//!
//! Entries queue up in insertion order; hits do not reorder anything. The
//! victim scan starts at the oldest entry and walks toward the newest.

use crate::ds::{LinkSlot, LinkedList};
use crate::policy::{Policy, VictimFilter};
use crate::store::{Slab, SlotId};

/// Queue links carried by each entry.
#[derive(Debug, Default)]
pub struct FifoMeta {
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

impl LinkSlot for FifoMeta {
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

/// FIFO policy state: the queue ends (head = oldest).
#[derive(Debug, Default)]
pub struct FifoPolicy {
    queue: LinkedList,
}

impl<K, V> Policy<K, V> for FifoPolicy {
    type Meta = FifoMeta;

    fn with_capacity(_capacity: usize) -> Self {
        Self::default()
    }

    fn name(&self) -> &'static str {
        "FIFO"
    }

    fn on_access(&mut self, _slab: &mut Slab<K, V, Self::Meta>, _id: SlotId) {
        // insertion order is all that matters
    }

    fn on_insert(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        self.queue.push_tail(slab, id);
    }

    fn on_remove(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        self.queue.unlink(slab, id);
    }

    fn select_victim(
        &mut self,
        slab: &mut Slab<K, V, Self::Meta>,
        eligible: VictimFilter<'_, K, V, Self::Meta>,
    ) -> Option<SlotId> {
        let mut cursor = self.queue.head();
        while let Some(id) = cursor {
            let entry = slab.get(id)?;
            if eligible(entry) {
                return Some(id);
            }
            cursor = entry.meta.next();
        }
        None
    }

    fn clear(&mut self) {
        self.queue.reset();
    }

    fn ordered_slots(&self, slab: &Slab<K, V, Self::Meta>) -> Vec<SlotId> {
        self.queue.iter_from_head(slab)
    }
}
