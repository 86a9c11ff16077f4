//! Least Frequently Used replacement.
//!
//! Entries are grouped into frequency buckets: one intrusive list per access
//! count, with the buckets themselves chained in count order so the scan can
//! move from the lowest populated count upward without probing gaps.
//!
//! ```text
//!   min_count = 1
//!       │
//!       ▼
//!   bucket(1):  [a] ─ [d]          ← intra-bucket order is FIFO
//!   bucket(3):  [b]                  (new arrivals at the tail)
//!   bucket(7):  [c] ─ [e]
//! ```
//!
//! A hit moves the entry from its bucket to the tail of the next-count
//! bucket, creating or unlinking buckets as they populate and drain.
//! `min_count` always names the lowest populated bucket (0 when empty).

use rustc_hash::FxHashMap;

use crate::ds::{LinkSlot, LinkedList};
use crate::policy::{Policy, VictimFilter};
use crate::store::{Slab, SlotId};

/// Bucket links plus the access count, carried by each entry.
#[derive(Debug, Default)]
pub struct LfuMeta {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    count: u64,
}

impl LfuMeta {
    /// Access count of this entry (1 on insert, +1 per hit).
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl LinkSlot for LfuMeta {
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

#[derive(Debug, Default)]
struct Bucket {
    list: LinkedList,
    /// Next-lower populated count.
    below: Option<u64>,
    /// Next-higher populated count.
    above: Option<u64>,
}

/// LFU policy state: populated buckets and the lowest populated count.
#[derive(Debug, Default)]
pub struct LfuPolicy {
    buckets: FxHashMap<u64, Bucket>,
    /// Lowest populated count; 0 when no entry is resident.
    min_count: u64,
}

impl LfuPolicy {
    /// Unlinks `id` from its bucket; drops the bucket if it drained.
    ///
    /// Returns the drained bucket's chain neighbors, or `None` if the bucket
    /// still holds entries.
    fn detach<K, V>(
        &mut self,
        slab: &mut Slab<K, V, LfuMeta>,
        id: SlotId,
        count: u64,
    ) -> Option<(Option<u64>, Option<u64>)> {
        let bucket = self.buckets.get_mut(&count)?;
        bucket.list.unlink(slab, id);
        if !bucket.list.is_empty() {
            return None;
        }

        let (below, above) = (bucket.below, bucket.above);
        self.buckets.remove(&count);
        if let Some(b) = below {
            if let Some(bucket) = self.buckets.get_mut(&b) {
                bucket.above = above;
            }
        }
        if let Some(a) = above {
            if let Some(bucket) = self.buckets.get_mut(&a) {
                bucket.below = below;
            }
        }
        if self.min_count == count {
            self.min_count = above.unwrap_or(0);
        }
        Some((below, above))
    }

    /// Appends `id` to the bucket for `count`, creating the bucket between
    /// `below` and `above` if it does not exist yet.
    fn attach<K, V>(
        &mut self,
        slab: &mut Slab<K, V, LfuMeta>,
        id: SlotId,
        count: u64,
        below: Option<u64>,
        above: Option<u64>,
    ) {
        if !self.buckets.contains_key(&count) {
            self.buckets.insert(
                count,
                Bucket {
                    list: LinkedList::default(),
                    below,
                    above,
                },
            );
            if let Some(b) = below {
                if let Some(bucket) = self.buckets.get_mut(&b) {
                    bucket.above = Some(count);
                }
            }
            if let Some(a) = above {
                if let Some(bucket) = self.buckets.get_mut(&a) {
                    bucket.below = Some(count);
                }
            }
        }
        if let Some(bucket) = self.buckets.get_mut(&count) {
            bucket.list.push_tail(slab, id);
        }
        if self.min_count == 0 || count < self.min_count {
            self.min_count = count;
        }
    }
}

impl<K, V> Policy<K, V> for LfuPolicy {
    type Meta = LfuMeta;

    fn with_capacity(_capacity: usize) -> Self {
        Self::default()
    }

    fn name(&self) -> &'static str {
        "LFU"
    }

    fn on_access(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        let count = match slab.get(id) {
            Some(entry) => entry.meta.count,
            None => return,
        };
        if count == u64::MAX {
            // counter saturated; keep the entry where frequency says it goes
            if let Some(bucket) = self.buckets.get_mut(&count) {
                bucket.list.move_to_tail(slab, id);
            }
            return;
        }

        let (chain_below, chain_above) = {
            let bucket = match self.buckets.get(&count) {
                Some(bucket) => bucket,
                None => return,
            };
            (bucket.below, bucket.above)
        };

        let drained = self.detach(slab, id, count);
        let next_count = count + 1;
        if let Some(entry) = slab.get_mut(id) {
            entry.meta.count = next_count;
        }

        // chain position for a fresh bucket: after the old bucket if it
        // survived, otherwise between the old bucket's neighbors
        let (below, above) = match drained {
            Some(_) => (chain_below, chain_above),
            None => (Some(count), chain_above),
        };
        self.attach(slab, id, next_count, below, above);
    }

    fn on_insert(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        if let Some(entry) = slab.get_mut(id) {
            entry.meta.count = 1;
        }
        let above = match self.min_count {
            0 => None,
            1 => self.buckets.get(&1).and_then(|bucket| bucket.above),
            min => Some(min),
        };
        self.attach(slab, id, 1, None, above);
    }

    fn on_remove(&mut self, slab: &mut Slab<K, V, Self::Meta>, id: SlotId) {
        let count = match slab.get(id) {
            Some(entry) => entry.meta.count,
            None => return,
        };
        self.detach(slab, id, count);
    }

    fn select_victim(
        &mut self,
        slab: &mut Slab<K, V, Self::Meta>,
        eligible: VictimFilter<'_, K, V, Self::Meta>,
    ) -> Option<SlotId> {
        let mut count = match self.min_count {
            0 => return None,
            min => Some(min),
        };
        while let Some(c) = count {
            let bucket = self.buckets.get(&c)?;
            let mut cursor = bucket.list.head();
            while let Some(id) = cursor {
                let entry = slab.get(id)?;
                if eligible(entry) {
                    return Some(id);
                }
                cursor = entry.meta.next();
            }
            count = bucket.above;
        }
        None
    }

    fn clear(&mut self) {
        self.buckets.clear();
        self.min_count = 0;
    }

    fn ordered_slots(&self, slab: &Slab<K, V, Self::Meta>) -> Vec<SlotId> {
        let mut out = Vec::new();
        let mut count = match self.min_count {
            0 => None,
            min => Some(min),
        };
        while let Some(c) = count {
            match self.buckets.get(&c) {
                Some(bucket) => {
                    out.extend(bucket.list.iter_from_head(slab));
                    count = bucket.above;
                },
                None => break,
            }
        }
        out
    }
}
