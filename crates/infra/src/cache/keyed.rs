use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Hit/miss counters and current size of one cache.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Key/value cache with explicit eviction and no expiry.
pub trait KeyedCache<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    /// Like `get`, without touching the hit/miss counters.
    fn peek(&self, key: &K) -> Option<V>;
    fn put(&self, key: K, value: V);
    fn evict(&self, key: &K);
    fn clear(&self);
    fn stats(&self) -> CacheStats;
}

impl<K, V, C> KeyedCache<K, V> for Arc<C>
where
    C: KeyedCache<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn peek(&self, key: &K) -> Option<V> {
        (**self).peek(key)
    }

    fn put(&self, key: K, value: V) {
        (**self).put(key, value)
    }

    fn evict(&self, key: &K) {
        (**self).evict(key)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn stats(&self) -> CacheStats {
        (**self).stats()
    }
}

/// In-memory cache for tests/dev and single-node deployments.
///
/// A poisoned lock degrades to "always miss" rather than failing the request.
#[derive(Debug)]
pub struct InMemoryCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> InMemoryCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<K, V> Default for InMemoryCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> KeyedCache<K, V> for InMemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        let found = self.entries.read().ok().and_then(|map| map.get(key).cloned());
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn peek(&self, key: &K) -> Option<V> {
        self.entries.read().ok().and_then(|map| map.get(key).cloned())
    }

    fn put(&self, key: K, value: V) {
        if let Ok(mut map) = self.entries.write() {
            map.insert(key, value);
        }
    }

    fn evict(&self, key: &K) {
        if let Ok(mut map) = self.entries.write() {
            map.remove(key);
        }
    }

    fn clear(&self) {
        if let Ok(mut map) = self.entries.write() {
            map.clear();
        }
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().map(|m| m.len()).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_counts_hits_and_misses() {
        let cache = InMemoryCache::<u32, String>::new();
        assert_eq!(cache.get(&1), None);
        cache.put(1, "one".into());
        assert_eq!(cache.get(&1).as_deref(), Some("one"));

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );

        assert_eq!(cache.peek(&1).as_deref(), Some("one"));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn evict_and_clear_remove_entries() {
        let cache = InMemoryCache::<u32, u32>::new();
        cache.put(1, 10);
        cache.put(2, 20);

        cache.evict(&1);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(20));

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
