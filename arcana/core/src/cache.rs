//! Bounded Keyed Store with LRU Eviction
//!
//! The engine keeps two process-lifetime maps: the render sink's
//! last-written-frame cache and the per-chat card state. Both would grow
//! without bound if keyed naively, so they live in this capacity-limited
//! store: inserting into a full store evicts the least recently used
//! entry.
//!
//! Recency is tracked with a logical clock rather than wall time, which
//! keeps eviction order deterministic under test. Eviction scans for the
//! minimum stamp; capacities here are small enough that the scan is not
//! worth a heap.

use std::collections::HashMap;
use std::hash::Hash;

/// Default capacity for the render sink's frame cache.
pub const DEFAULT_SINK_CAPACITY: usize = 1024;
/// Default capacity for the per-chat state map.
pub const DEFAULT_CHAT_CAPACITY: usize = 512;

#[derive(Clone, Debug)]
struct Entry<V> {
    value: V,
    last_used: u64,
}

/// A capacity-limited map evicting the least recently used entry on
/// overflow. Reads through [`BoundedCache::get`] refresh recency;
/// [`BoundedCache::peek`] does not.
#[derive(Clone, Debug)]
pub struct BoundedCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    capacity: usize,
    clock: u64,
}

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> {
    /// Create a store holding at most `capacity` entries. A zero capacity
    /// is promoted to one so the store can always hold the newest entry.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a key, refreshing its recency.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = clock;
            &entry.value
        })
    }

    /// Look up a key without touching recency.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Mutable lookup, refreshing recency.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = clock;
            &mut entry.value
        })
    }

    /// Insert or replace a value. When the store is full and the key is
    /// new, the least recently used entry is evicted first.
    pub fn insert(&mut self, key: K, value: V) {
        self.clock += 1;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.entries.insert(
            key,
            Entry {
                value,
                last_used: self.clock,
            },
        );
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut cache = BoundedCache::new(4);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn replace_does_not_grow() {
        let mut cache = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("a", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&"a"), Some(&2));
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.get(&"a");
        cache.insert("c", 3);
        assert_eq!(cache.peek(&"b"), None, "b was the LRU entry");
        assert_eq!(cache.peek(&"a"), Some(&1));
        assert_eq!(cache.peek(&"c"), Some(&3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn peek_does_not_refresh() {
        let mut cache = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.peek(&"a");
        cache.insert("c", 3);
        assert_eq!(cache.peek(&"a"), None, "peek must not rescue a from eviction");
    }

    #[test]
    fn zero_capacity_still_holds_newest() {
        let mut cache = BoundedCache::new(0);
        cache.insert("a", 1);
        assert_eq!(cache.peek(&"a"), Some(&1));
        cache.insert("b", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&"b"), Some(&2));
    }
}
