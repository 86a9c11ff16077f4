//! Bounded recency list of evicted keys.
//!
//! ARC's B1/B2 lists remember *which* keys were evicted, not their values, so
//! a later miss on one of them can steer the adaptation target. Keys live in
//! their own small node pool (they are no longer slab residents), linked
//! MRU→LRU, with a hash index for O(1) membership and removal. Recording past
//! the capacity drops the oldest key.

use std::hash::Hash;

use rustc_hash::FxHashMap;

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Key-only recency list with a fixed upper bound.
#[derive(Debug)]
pub struct GhostList<K> {
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    index: FxHashMap<K, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
}

impl<K> GhostList<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a list that remembers at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            index: FxHashMap::default(),
            head: None,
            tail: None,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Records `key` at the MRU end; re-recording promotes it.
    ///
    /// Drops the LRU key when the list is over capacity.
    pub fn record(&mut self, key: K) {
        if self.capacity == 0 {
            return;
        }
        if let Some(&idx) = self.index.get(&key) {
            self.detach(idx);
            self.attach_head(idx);
            return;
        }

        if self.len() >= self.capacity {
            self.drop_oldest();
        }

        let node = Node {
            key: key.clone(),
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            },
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            },
        };
        self.index.insert(key, idx);
        self.attach_head(idx);
    }

    /// Forgets `key`; returns `true` if it was being tracked.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(idx) => {
                self.detach(idx);
                self.nodes[idx] = None;
                self.free.push(idx);
                true
            },
            None => false,
        }
    }

    /// Changes the bound, dropping oldest keys if the list is now over it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.len() > self.capacity {
            self.drop_oldest();
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys MRU→LRU, for diagnostics.
    pub fn keys(&self) -> Vec<K> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            if let Some(node) = &self.nodes[idx] {
                out.push(node.key.clone());
                cursor = node.next;
            } else {
                break;
            }
        }
        out
    }

    fn drop_oldest(&mut self) {
        if let Some(idx) = self.tail {
            self.detach(idx);
            if let Some(node) = self.nodes[idx].take() {
                self.index.remove(&node.key);
            }
            self.free.push(idx);
        }
    }

    fn attach_head(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.nodes[idx].as_mut() {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(head) => {
                if let Some(node) = self.nodes[head].as_mut() {
                    node.prev = Some(idx);
                }
            },
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(node) = self.nodes[p].as_mut() {
                    node.next = next;
                }
            },
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.nodes[n].as_mut() {
                    node.prev = prev;
                }
            },
            None => self.tail = prev,
        }
        if let Some(node) = self.nodes[idx].as_mut() {
            node.prev = None;
            node.next = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_contains() {
        let mut ghost = GhostList::new(3);
        ghost.record(1u64);
        ghost.record(2);
        assert!(ghost.contains(&1));
        assert!(ghost.contains(&2));
        assert!(!ghost.contains(&3));
        assert_eq!(ghost.len(), 2);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut ghost = GhostList::new(2);
        ghost.record(1u64);
        ghost.record(2);
        ghost.record(3);
        assert!(!ghost.contains(&1));
        assert!(ghost.contains(&2));
        assert!(ghost.contains(&3));
        assert_eq!(ghost.keys(), vec![3, 2]);
    }

    #[test]
    fn re_record_promotes_to_mru() {
        let mut ghost = GhostList::new(2);
        ghost.record(1u64);
        ghost.record(2);
        ghost.record(1); // 1 becomes MRU; 2 is now oldest
        ghost.record(3);
        assert!(ghost.contains(&1));
        assert!(!ghost.contains(&2));
        assert!(ghost.contains(&3));
    }

    #[test]
    fn remove_frees_tracking() {
        let mut ghost = GhostList::new(2);
        ghost.record(1u64);
        assert!(ghost.remove(&1));
        assert!(!ghost.remove(&1));
        assert!(ghost.is_empty());
        assert_eq!(ghost.keys(), Vec::<u64>::new());
    }

    #[test]
    fn shrinking_capacity_trims_lru_end() {
        let mut ghost = GhostList::new(4);
        for k in 1u64..=4 {
            ghost.record(k);
        }
        ghost.set_capacity(2);
        assert_eq!(ghost.keys(), vec![4, 3]);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut ghost = GhostList::new(0);
        ghost.record(1u64);
        assert!(ghost.is_empty());
    }
}
