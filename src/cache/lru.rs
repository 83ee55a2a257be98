//! Bounded map with least-recently-used eviction.
//!
//! Entries live in a slot vector threaded by an intrusive doubly linked list
//! ordered from newest to oldest, so lookups, promotion and eviction are O(1).

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;

struct Slot<K, V> {
    key: K,
    value: V,
    newer: Option<usize>,
    older: Option<usize>,
}

pub(crate) struct LruMap<K, V> {
    index: HashMap<K, usize, RandomState>,
    slots: Vec<Option<Slot<K, V>>>,
    vacant: Vec<usize>,
    newest: Option<usize>,
    oldest: Option<usize>,
    capacity: usize,
}

impl<K, V> LruMap<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Capacity is clamped to at least one entry.
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            slots: Vec::with_capacity(capacity),
            vacant: Vec::new(),
            newest: None,
            oldest: None,
            capacity,
        }
    }

    /// Looks up `key` and marks it most recently used.
    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.promote(idx);
        self.slots[idx].as_ref().map(|slot| &slot.value)
    }

    /// Looks up `key` without touching its recency.
    pub(crate) fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.slots[idx].as_ref().map(|slot| &slot.value)
    }

    /// Inserts or overwrites `key`. Returns the key evicted to make room, if any.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<K> {
        if let Some(&idx) = self.index.get(&key) {
            if let Some(slot) = self.slots[idx].as_mut() {
                slot.value = value;
            }
            self.promote(idx);
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        let idx = match self.vacant.pop() {
            Some(idx) => idx,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        self.slots[idx] = Some(Slot {
            key: key.clone(),
            value,
            newer: None,
            older: None,
        });
        self.link_newest(idx);
        self.index.insert(key, idx);

        evicted
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        self.unlink(idx);
        self.vacant.push(idx);
        self.slots[idx].take().map(|slot| slot.value)
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.vacant.clear();
        self.newest = None;
        self.oldest = None;
    }

    #[cfg(test)]
    fn keys_newest_first(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.newest;
        while let Some(idx) = cursor {
            match self.slots[idx].as_ref() {
                Some(slot) => {
                    keys.push(slot.key.clone());
                    cursor = slot.older;
                }
                None => break,
            }
        }
        keys
    }

    fn promote(&mut self, idx: usize) {
        if self.newest == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.link_newest(idx);
    }

    fn link_newest(&mut self, idx: usize) {
        let previous = self.newest;
        if let Some(slot) = self.slots[idx].as_mut() {
            slot.newer = None;
            slot.older = previous;
        }
        match previous {
            Some(prev_idx) => {
                if let Some(prev) = self.slots[prev_idx].as_mut() {
                    prev.newer = Some(idx);
                }
            }
            None => self.oldest = Some(idx),
        }
        self.newest = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (newer, older) = match self.slots[idx].as_ref() {
            Some(slot) => (slot.newer, slot.older),
            None => return,
        };

        match newer {
            Some(newer_idx) => {
                if let Some(slot) = self.slots[newer_idx].as_mut() {
                    slot.older = older;
                }
            }
            None => self.newest = older,
        }
        match older {
            Some(older_idx) => {
                if let Some(slot) = self.slots[older_idx].as_mut() {
                    slot.newer = newer;
                }
            }
            None => self.oldest = newer,
        }

        if let Some(slot) = self.slots[idx].as_mut() {
            slot.newer = None;
            slot.older = None;
        }
    }

    fn evict_oldest(&mut self) -> Option<K> {
        let idx = self.oldest?;
        self.unlink(idx);
        let slot = self.slots[idx].take()?;
        self.index.remove(&slot.key);
        self.vacant.push(idx);
        Some(slot.key)
    }
}
