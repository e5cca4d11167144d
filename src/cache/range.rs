use parking_lot::RwLock;

use crate::cache::lru::LruMap;

/// A half-open interval of bases still missing from the cache.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Gap {
    pub(crate) start: i32,
    pub(crate) end: i32,
}

/// One contiguous previously-fetched interval and its decoded points.
/// Every point starts within `[start, end)`; point order inside `data` is
/// whatever the decoders produced.
#[derive(Clone, Debug)]
pub(crate) struct RangeEntry<T> {
    pub(crate) start: i32,
    pub(crate) end: i32,
    pub(crate) data: Vec<T>,
}

/// Computes the minimal set of sub-intervals of `[start, end)` not covered
/// by `entries`, which must be sorted by start and non-overlapping.
pub(crate) fn find_gaps<T>(start: i32, end: i32, entries: &[RangeEntry<T>]) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let mut cursor = start;
    for entry in entries {
        if cursor >= entry.end {
            continue;
        }
        if cursor < entry.start {
            let gap_end = entry.start.min(end);
            gaps.push(Gap {
                start: cursor,
                end: gap_end,
            });
            cursor = gap_end;
            if end < entry.start {
                return gaps;
            }
        }
        if cursor >= entry.start {
            if end <= entry.end {
                return gaps;
            }
            cursor = entry.end;
        }
    }
    if cursor != end {
        gaps.push(Gap { start: cursor, end });
    }
    gaps
}

/// Sorts entries by start and merges any that overlap or touch, keeping the
/// stored list pairwise disjoint. Point data of merged entries is
/// concatenated in order.
pub(crate) fn merge_entries<T>(mut entries: Vec<RangeEntry<T>>) -> Vec<RangeEntry<T>> {
    entries.sort_by_key(|entry| entry.start);

    let mut merged: Vec<RangeEntry<T>> = Vec::with_capacity(entries.len());
    for entry in entries {
        match merged.last_mut() {
            Some(current) if entry.start <= current.end => {
                current.end = current.end.max(entry.end);
                current.data.extend(entry.data);
            }
            _ => merged.push(entry),
        }
    }
    merged
}

/// Bounded LRU from cache key to the sorted interval list for that key.
/// Probes run under the read lock; inserts replace the whole list for a key
/// under the write lock.
pub(crate) struct RangeCache<T> {
    inner: RwLock<LruMap<Vec<RangeEntry<T>>>>,
}

impl<T: Clone> RangeCache<T> {
    pub(crate) fn new(capacity: usize) -> RangeCache<T> {
        RangeCache {
            inner: RwLock::new(LruMap::new(capacity)),
        }
    }

    /// Returns the cached entries for `key` together with the sub-intervals
    /// of `[start, end)` they do not cover.
    pub(crate) fn probe(
        &self,
        key: &str,
        start: i32,
        end: i32,
    ) -> (Vec<RangeEntry<T>>, Vec<Gap>) {
        let inner = self.inner.read();
        match inner.get(key) {
            Some(entries) => {
                let gaps = find_gaps(start, end, entries);
                (entries.clone(), gaps)
            }
            None => (Vec::new(), vec![Gap { start, end }]),
        }
    }

    /// Merges `entries` into canonical form and stores the result as the new
    /// state for `key`, returning it.
    pub(crate) fn insert(&self, key: String, entries: Vec<RangeEntry<T>>) -> Vec<RangeEntry<T>> {
        let merged = merge_entries(entries);
        self.inner.write().insert(key, merged.clone());
        merged
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.inner.read().keys()
    }
}
