//! LRU (Least Recently Used) map with a fixed capacity
//!
//! Recency is a monotonically increasing tick; the ordered tick map gives
//! the eviction victim in O(log n).

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use ahash::RandomState;

struct Slot<V> {
    value: V,
    used_at: u64,
}

/// Bounded map that evicts the least recently used key on overflow
pub struct LruCache<K, V> {
    map: HashMap<K, Slot<V>, RandomState>,
    order: BTreeMap<u64, K>,
    tick: u64,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU map with the given capacity
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            map: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            order: BTreeMap::new(),
            tick: 0,
            capacity,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Look up a key and mark it as most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let tick = self.next_tick();
        let slot = self.map.get_mut(key)?;
        if let Some(owned) = self.order.remove(&slot.used_at) {
            self.order.insert(tick, owned);
        }
        slot.used_at = tick;
        Some(&slot.value)
    }

    /// Insert or replace a value; returns the entry evicted to make room
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let tick = self.next_tick();

        if let Some(slot) = self.map.get_mut(&key) {
            self.order.remove(&slot.used_at);
            slot.value = value;
            slot.used_at = tick;
            self.order.insert(tick, key);
            return None;
        }

        let evicted = if self.map.len() >= self.capacity {
            self.pop_oldest()
        } else {
            None
        };

        self.order.insert(tick, key.clone());
        self.map.insert(
            key,
            Slot {
                value,
                used_at: tick,
            },
        );
        evicted
    }

    /// Remove a key
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.map.remove(key)?;
        self.order.remove(&slot.used_at);
        Some(slot.value)
    }

    /// Keep only entries for which `keep` returns true; returns how many were dropped
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let before = self.map.len();
        let order = &mut self.order;
        self.map.retain(|key, slot| {
            let kept = keep(key, &slot.value);
            if !kept {
                order.remove(&slot.used_at);
            }
            kept
        });
        before - self.map.len()
    }

    fn pop_oldest(&mut self) -> Option<(K, V)> {
        let (_, key) = self.order.pop_first()?;
        let slot = self.map.remove(&key)?;
        Some((key, slot.value))
    }

    /// Get the current number of entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get the capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}
