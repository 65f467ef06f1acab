use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Bounded least-recently-used cache, safe to share between threads.
///
/// Recency is tracked with a monotonic tick per access; the smallest tick is
/// evicted first. A capacity of zero disables caching.
///
/// Every [`insert`](Self::insert) and [`remove`](Self::remove) bumps a
/// generation. A reader filling the cache from the database passes the
/// generation it saw before the read to [`insert_if_current`](Self::insert_if_current),
/// so a value read before a concurrent commit never replaces what that commit cached.
pub struct LruCache<K, V> {
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

struct Inner<K, V> {
    entries: HashMap<K, (V, u64)>,
    recency: BTreeMap<u64, K>,
    tick: u64,
    generation: u64,
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
{
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn insert(&mut self, capacity: usize, key: K, value: V) {
        let tick = self.next_tick();
        if let Some((_, old_tick)) = self.entries.insert(key.clone(), (value, tick)) {
            self.recency.remove(&old_tick);
        } else if self.entries.len() > capacity {
            if let Some((_, evicted)) = self.recency.pop_first() {
                self.entries.remove(&evicted);
            }
        }
        self.recency.insert(tick, key);
    }
}

impl<K: Hash + Eq + Clone, V: Clone> LruCache<K, V> {
    /// With `preallocate` the map reserves `capacity` slots up front so it never resizes later
    pub fn new(capacity: usize, preallocate: bool) -> Self {
        let entries = if preallocate { HashMap::with_capacity(capacity) } else { HashMap::new() };
        let inner = Inner { entries, recency: BTreeMap::new(), tick: 0, generation: 0 };
        Self { capacity, inner: Mutex::new(inner) }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let tick = inner.next_tick();
        let (value, old_tick) = match inner.entries.get_mut(key) {
            Some((value, last)) => {
                let old = std::mem::replace(last, tick);
                (value.clone(), old)
            }
            None => return None,
        };
        inner.recency.remove(&old_tick);
        inner.recency.insert(tick, key.clone());
        Some(value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Caches an authoritative value
    pub fn insert(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.insert(self.capacity, key, value);
    }

    /// Caches `value` only if nothing was inserted or removed since `generation`.
    /// Returns whether the value was cached.
    pub fn insert_if_current(&self, generation: u64, key: K, value: V) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        inner.insert(self.capacity, key, value);
        true
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let (value, tick) = inner.entries.remove(key)?;
        inner.recency.remove(&tick);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
