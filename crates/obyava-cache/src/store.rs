//! The keyed query store.
//!
//! Values are whatever the REST layer materialized for a key; this crate
//! never inspects them. Transforms are copy-on-write: a callback receives
//! the current value by reference and returns a replacement, or `None` to
//! leave the entry untouched (the "shape does not match" case).

use std::collections::HashMap;

use tracing::debug;

use crate::key::QueryKey;

/// Whether an entry may be served as-is or must be refetched on next read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    freshness: Freshness,
}

/// Keyed store of query results with prefix-addressed bulk operations.
#[derive(Debug)]
pub struct QueryCache<V> {
    entries: HashMap<QueryKey, Slot<V>>,
}

impl<V: Clone> QueryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Insert or overwrite the entry at `key`, marking it fresh.
    pub fn put(&mut self, key: QueryKey, value: V) {
        self.entries.insert(
            key,
            Slot {
                value,
                freshness: Freshness::Fresh,
            },
        );
    }

    pub fn get(&self, key: &QueryKey) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    pub fn freshness(&self, key: &QueryKey) -> Option<Freshness> {
        self.entries.get(key).map(|slot| slot.freshness)
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        matches!(self.freshness(key), Some(Freshness::Stale))
    }

    pub fn remove(&mut self, key: &QueryKey) -> Option<V> {
        self.entries.remove(key).map(|slot| slot.value)
    }

    /// Transform the single entry at exactly `key`. Returns whether the
    /// entry existed and the transform produced a replacement.
    pub fn update(&mut self, key: &QueryKey, f: impl FnOnce(&V) -> Option<V>) -> bool {
        match self.entries.get_mut(key) {
            Some(slot) => match f(&slot.value) {
                Some(next) => {
                    slot.value = next;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Transform every entry whose key starts with `prefix`. Entries for
    /// which `f` returns `None` pass through unchanged. Returns the number
    /// of replaced entries.
    pub fn update_all_matching(
        &mut self,
        prefix: &QueryKey,
        f: impl Fn(&V) -> Option<V>,
    ) -> usize {
        let mut replaced = 0;
        for (key, slot) in self.entries.iter_mut() {
            if !key.starts_with(prefix) {
                continue;
            }
            if let Some(next) = f(&slot.value) {
                slot.value = next;
                replaced += 1;
            }
        }
        replaced
    }

    /// Mark every entry under `prefix` stale so the next read refetches.
    /// Returns the number of entries affected.
    pub fn invalidate(&mut self, prefix: &QueryKey) -> usize {
        let mut marked = 0;
        for (key, slot) in self.entries.iter_mut() {
            if key.starts_with(prefix) {
                slot.freshness = Freshness::Stale;
                marked += 1;
            }
        }
        if marked > 0 {
            debug!(prefix = %prefix, entries = marked, "invalidated cache prefix");
        }
        marked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.keys()
    }
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listings_page(page: u64) -> QueryKey {
        QueryKey::root("listings").child("list").child(page)
    }

    #[test]
    fn update_exact_key_leaves_siblings_alone() {
        let mut cache = QueryCache::new();
        cache.put(listings_page(1), 10u64);
        cache.put(listings_page(2), 20u64);

        let hit = cache.update(&listings_page(1), |v| Some(v + 1));
        assert!(hit);
        assert_eq!(cache.get(&listings_page(1)), Some(&11));
        assert_eq!(cache.get(&listings_page(2)), Some(&20));
    }

    #[test]
    fn update_all_matching_respects_prefix_and_passthrough() {
        let mut cache = QueryCache::new();
        cache.put(listings_page(1), 1u64);
        cache.put(listings_page(2), 2u64);
        cache.put(QueryKey::root("favorites").child("list").child(1u64), 100u64);

        let prefix = QueryKey::root("listings");
        let replaced = cache.update_all_matching(&prefix, |v| {
            // Odd values don't match the "shape" and pass through.
            if v % 2 == 0 {
                Some(v * 10)
            } else {
                None
            }
        });

        assert_eq!(replaced, 1);
        assert_eq!(cache.get(&listings_page(1)), Some(&1));
        assert_eq!(cache.get(&listings_page(2)), Some(&20));
        assert_eq!(
            cache.get(&QueryKey::root("favorites").child("list").child(1u64)),
            Some(&100)
        );
    }

    #[test]
    fn invalidate_marks_prefix_stale() {
        let mut cache = QueryCache::new();
        cache.put(listings_page(1), 1u64);
        cache.put(QueryKey::root("favorites").child("list").child(1u64), 2u64);

        let marked = cache.invalidate(&QueryKey::root("favorites"));
        assert_eq!(marked, 1);
        assert!(cache.is_stale(&QueryKey::root("favorites").child("list").child(1u64)));
        assert!(!cache.is_stale(&listings_page(1)));
    }

    #[test]
    fn put_overwrites_and_refreshes() {
        let mut cache = QueryCache::new();
        cache.put(listings_page(1), 1u64);
        cache.invalidate(&listings_page(1));
        assert!(cache.is_stale(&listings_page(1)));

        cache.put(listings_page(1), 5u64);
        assert_eq!(cache.freshness(&listings_page(1)), Some(Freshness::Fresh));
        assert_eq!(cache.get(&listings_page(1)), Some(&5));
    }

    #[test]
    fn missing_key_update_is_a_noop() {
        let mut cache: QueryCache<u64> = QueryCache::new();
        assert!(!cache.update(&listings_page(9), |v| Some(v + 1)));
        assert!(cache.is_empty());
    }
}
