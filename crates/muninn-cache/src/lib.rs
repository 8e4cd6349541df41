//! muninn-cache: a bounded, namespaced TTL+LRU cache (spec.md §4.1).
//!
//! Single-writer, single-owner-per-process by design — every enricher in
//! `muninn-enrich` holds its own `Cache<V>` instance rather than sharing one
//! behind a lock pool, so a `std::sync::Mutex` around plain `HashMap`/
//! `VecDeque` is enough; there is no cross-task contention to design around,
//! mirroring how the teacher's `csa-memory::MemoryStore` assumes a single
//! owner rather than reaching for `dashmap`.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default TTL for cache entries (spec.md §4.1: "Default TTL is 5 minutes").
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default capacity (spec.md §4.1: "Capacity default 1,000").
pub const DEFAULT_CAPACITY: usize = 1_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

struct Entry<V> {
    value: V,
    /// `None` means non-expiring (`ttl = 0`, spec.md §4.1).
    expires_at: Option<Instant>,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    /// Most-recently-used key at the back; eviction pops the front.
    recency: VecDeque<String>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl<V> Inner<V> {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
        }
        self.recency.push_back(key.to_string());
    }

    fn evict_lru(&mut self) {
        if let Some(oldest) = self.recency.pop_front() {
            self.entries.remove(&oldest);
        }
    }
}

/// A bounded associative store keyed by namespaced strings
/// (`file:{pid}:{path}`, `blast:{pid}:{path}`, …, spec.md §4.1).
pub struct Cache<V> {
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> Cache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: VecDeque::new(),
                capacity,
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let expired = match inner.entries.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|t| Instant::now() >= t),
            None => {
                inner.misses += 1;
                return None;
            }
        };
        if expired {
            inner.entries.remove(key);
            if let Some(pos) = inner.recency.iter().position(|k| k == key) {
                inner.recency.remove(pos);
            }
            inner.misses += 1;
            return None;
        }
        inner.hits += 1;
        inner.touch(key);
        inner.entries.get(key).map(|e| e.value.clone())
    }

    /// `ttl = None` means the entry never expires.
    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        if !inner.entries.contains_key(key) && inner.entries.len() >= inner.capacity {
            inner.evict_lru();
        }
        let expires_at = ttl.map(|d| Instant::now() + d);
        inner.entries.insert(key.to_string(), Entry { value, expires_at });
        inner.touch(key);
    }

    pub fn has(&self, key: &str) -> bool {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        match inner.entries.get(key) {
            Some(entry) => !entry.expires_at.is_some_and(|t| Instant::now() >= t),
            None => false,
        }
    }

    pub fn delete(&self, key: &str) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.remove(key);
        if let Some(pos) = inner.recency.iter().position(|k| k == key) {
            inner.recency.remove(pos);
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        inner.entries.clear();
        inner.recency.clear();
    }

    /// Sweep all currently-expired entries. Returns the number removed.
    pub fn prune(&self) -> usize {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        let now = Instant::now();
        let expired_keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at.is_some_and(|t| now >= t))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired_keys {
            inner.entries.remove(key);
            if let Some(pos) = inner.recency.iter().position(|k| k == key) {
                inner.recency.remove(pos);
            }
        }
        expired_keys.len()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("cache mutex poisoned");
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.entries.len(),
        }
    }
}

impl<V: Clone> Default for Cache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Namespace prefixes for cache keys (spec.md §4.1).
pub mod key {
    pub fn file(project: i64, path: &str) -> String {
        format!("file:{project}:{path}")
    }
    pub fn blast(project: i64, path: &str) -> String {
        format!("blast:{project}:{path}")
    }
    pub fn corr(project: i64, path: &str) -> String {
        format!("corr:{project}:{path}")
    }
    pub fn issue(project: i64, path: &str) -> String {
        format!("issue:{project}:{path}")
    }
    pub fn decision(project: i64, path: &str) -> String {
        format!("decision:{project}:{path}")
    }
    pub fn learning(project: i64, query: &str) -> String {
        format!("learning:{project}:{query}")
    }
    pub fn test(project: i64, path: &str) -> String {
        format!("test:{project}:{path}")
    }
    pub fn codeintel(project: i64, path: &str) -> String {
        format!("codeintel:{project}:{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get_hit() {
        let cache: Cache<String> = Cache::new(10);
        cache.set("a", "value".to_string(), None);
        assert_eq!(cache.get("a"), Some("value".to_string()));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_get_miss_on_unknown_key() {
        let cache: Cache<String> = Cache::new(10);
        assert_eq!(cache.get("missing"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache: Cache<i32> = Cache::new(10);
        cache.set("k", 1, Some(Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let cache: Cache<i32> = Cache::new(10);
        cache.set("k", 1, None);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache: Cache<i32> = Cache::new(2);
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        cache.get("a"); // touch a, making b the LRU
        cache.set("c", 3, None); // evicts b
        assert_eq!(cache.get("b"), None);
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_has_respects_expiry() {
        let cache: Cache<i32> = Cache::new(10);
        cache.set("k", 1, Some(Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(!cache.has("k"));
    }

    #[test]
    fn test_delete_removes_entry() {
        let cache: Cache<i32> = Cache::new(10);
        cache.set("k", 1, None);
        cache.delete("k");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_clear_empties_cache() {
        let cache: Cache<i32> = Cache::new(10);
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let cache: Cache<i32> = Cache::new(10);
        cache.set("expiring", 1, Some(Duration::from_millis(1)));
        cache.set("persisting", 2, None);
        std::thread::sleep(Duration::from_millis(5));
        let removed = cache.prune();
        assert_eq!(removed, 1);
        assert_eq!(cache.stats().size, 1);
        assert!(cache.get("persisting").is_some());
    }

    #[test]
    fn test_key_namespaces() {
        assert_eq!(key::file(1, "a.rs"), "file:1:a.rs");
        assert_eq!(key::blast(1, "a.rs"), "blast:1:a.rs");
        assert_eq!(key::learning(1, "auth"), "learning:1:auth");
    }
}
