use std::collections::HashMap;
use std::hash::Hash;

use crate::object::Timestamp;

/// Per-shape cache capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

struct Slot<V> {
    value: V,
    last_used: u64,
}

/// Count-bounded map that evicts the least recently used entry when full.
/// Recency is a tick bumped on every `get`/`put`; eviction scans for the
/// smallest tick, which is cheap at the small capacities used here.
pub struct LruCache<K, V> {
    entries: HashMap<K, Slot<V>>,
    capacity: usize,
    tick: u64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            tick: 0,
        }
    }

    #[inline(always)]
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Look up an entry and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.next_tick();
        self.entries.get_mut(key).map(|slot| {
            slot.last_used = tick;
            &slot.value
        })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let tick = self.next_tick();
        self.entries.get_mut(key).map(|slot| {
            slot.last_used = tick;
            &mut slot.value
        })
    }

    /// Presence check that does not affect recency.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace. Returns the entry evicted to make room, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        let tick = self.next_tick();
        if let Some(slot) = self.entries.get_mut(&key) {
            slot.value = value;
            slot.last_used = tick;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict_lru()
        } else {
            None
        };
        self.entries.insert(key, Slot { value, last_used: tick });
        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|slot| slot.value)
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&oldest).map(|slot| (oldest, slot.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A derived value stamped with its owner's modification time at computation.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub last_modified: Timestamp,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, last_modified: Timestamp) -> Self {
        Self { value, last_modified }
    }

    /// Still usable unless the owner changed after this entry was computed.
    #[inline(always)]
    pub fn is_valid(&self, owner_modified: Timestamp) -> bool {
        self.last_modified >= owner_modified
    }
}

/// Hashable form of the fidelity parameter (texel size, intervals per degree)
/// that a cached computation depended on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FidelityKey(u64);

impl FidelityKey {
    pub fn new(value: f64) -> Self {
        // Fold -0.0 into 0.0 so both hash alike.
        Self(if value == 0.0 { 0 } else { value.to_bits() })
    }
}

/// LRU of derived shape data keyed by fidelity.
pub struct ShapeCache<T> {
    entries: LruCache<FidelityKey, CacheEntry<T>>,
}

impl<T: Clone> ShapeCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: f64) -> Option<&CacheEntry<T>> {
        self.entries.get(&FidelityKey::new(key))
    }

    pub fn put(&mut self, key: f64, entry: CacheEntry<T>) {
        self.entries.put(FidelityKey::new(key), entry);
    }

    /// The cached value if present and computed no earlier than `owner_modified`.
    pub fn get_valid(&mut self, key: f64, owner_modified: Timestamp) -> Option<T> {
        self.get(key)
            .filter(|entry| entry.is_valid(owner_modified))
            .map(|entry| entry.value.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> Default for ShapeCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
