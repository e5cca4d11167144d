use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A bounded map with least-recently-used eviction.
///
/// Recency is tracked with a per-slot atomic counter so lookups only need a
/// shared reference; callers wrap the map in a read-write lock and keep
/// `get` on the read path. Eviction scans for the stalest slot, which is
/// fine at the small capacities used here.
pub(crate) struct LruMap<V> {
    capacity: usize,
    clock: AtomicU64,
    map: HashMap<String, Slot<V>>,
}

struct Slot<V> {
    value: V,
    touched: AtomicU64,
}

impl<V> LruMap<V> {
    pub(crate) fn new(capacity: usize) -> LruMap<V> {
        LruMap {
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            map: HashMap::new(),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn get(&self, key: &str) -> Option<&V> {
        let slot = self.map.get(key)?;
        slot.touched.store(self.tick(), Ordering::Relaxed);
        Some(&slot.value)
    }

    /// Inserts `value`, evicting the least-recently-used entry when at
    /// capacity. Returns whether an eviction happened.
    pub(crate) fn insert(&mut self, key: String, value: V) -> bool {
        let mut evicted = false;
        if !self.map.contains_key(&key) && self.map.len() >= self.capacity {
            let stalest = self
                .map
                .iter()
                .min_by_key(|(_, slot)| slot.touched.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            if let Some(stalest) = stalest {
                self.map.remove(&stalest);
                evicted = true;
            }
        }
        let touched = AtomicU64::new(self.tick());
        self.map.insert(key, Slot { value, touched });
        evicted
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }
}
