use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// In-memory keyed TTL cache. Each key expires independently.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, (V, Instant)>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Returns the cached value for `key` only when still within TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .filter(|(_, cached_at)| cached_at.elapsed() <= self.ttl)
            .map(|(value, _)| value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now()));
    }

    /// Drop one key, leaving every other entry untouched.
    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// Remove expired entries.
    pub fn purge_expired(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, (_, cached_at)| cached_at.elapsed() <= ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn get_returns_none_when_cache_is_empty() {
        let cache = TtlCache::<String, u64>::new(Duration::from_secs(5));
        assert!(cache.get(&"alice".to_string()).is_none());
    }

    #[test]
    fn get_returns_value_when_entry_is_fresh() {
        let mut cache = TtlCache::new(Duration::from_secs(1));
        cache.insert("alice", 42_u64);

        assert_eq!(cache.get(&"alice"), Some(42));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_do_not_collide() {
        let mut cache = TtlCache::new(Duration::from_secs(5));
        cache.insert("alice", 1_u64);
        cache.insert("bob", 2_u64);

        assert_eq!(cache.get(&"alice"), Some(1));
        assert_eq!(cache.get(&"bob"), Some(2));
    }

    #[test]
    fn get_returns_none_after_ttl_expires() {
        let mut cache = TtlCache::new(Duration::from_millis(10));
        cache.insert("alice", 42_u64);
        thread::sleep(Duration::from_millis(20));

        assert!(cache.get(&"alice").is_none());
        cache.purge_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_clears_only_that_key() {
        let mut cache = TtlCache::new(Duration::from_secs(5));
        cache.insert("alice", 1_u64);
        cache.insert("bob", 2_u64);
        cache.invalidate(&"alice");

        assert!(cache.get(&"alice").is_none());
        assert_eq!(cache.get(&"bob"), Some(2));
    }
}
