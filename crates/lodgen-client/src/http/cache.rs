//! Time- and size-bounded cache for paginated GET responses
//!
//! Entries go stale after the TTL and are evicted lazily on the next read;
//! once the entry count exceeds capacity, the oldest-inserted key is evicted
//! eagerly. Keys derive from the endpoint plus a deterministic serialization
//! of the query parameters; a key that cannot be serialized simply disables
//! caching for that call (the request itself still runs).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Pagination cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entry lifetime
    pub ttl: Duration,
    /// Maximum number of entries
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            capacity: 100,
        }
    }
}

impl CacheConfig {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self { ttl, capacity }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ttl.is_zero() {
            return Err("ttl cannot be zero".to_string());
        }
        if self.capacity == 0 {
            return Err("capacity cannot be zero".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, for capacity eviction
    order: VecDeque<String>,
}

/// TTL- and capacity-bounded pagination cache
///
/// Only GET-derived reads consult or populate this cache; mutating calls
/// invalidate affected endpoint prefixes after success (a caller
/// responsibility, see `ApiClient::invalidate_after_mutation`).
#[derive(Debug)]
pub struct PaginationCache {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
}

/// Derive the cache key for `(endpoint, params)`.
///
/// Returns `None` when the parameters cannot be serialized, which callers
/// treat as "skip caching for this call" rather than an error.
pub fn cache_key<P: Serialize>(endpoint: &str, params: &P) -> Option<String> {
    match serde_json::to_string(params) {
        Ok(serialized) => Some(format!("{}::{}", endpoint, serialized)),
        Err(e) => {
            debug!(endpoint, error = %e, "cache key not serializable, skipping cache");
            None
        }
    }
}

impl PaginationCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Fetch a cached value, removing it on the way out if it has gone stale.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock().unwrap();
        let stale = match inner.entries.get(key) {
            Some(entry) => entry.stored_at.elapsed() > self.config.ttl,
            None => return None,
        };

        if stale {
            debug!(key, "cache entry expired");
            inner.entries.remove(key);
            inner.order.retain(|k| k.as_str() != key);
            return None;
        }

        debug!(key, "cache hit");
        inner.entries.get(key).map(|entry| entry.data.clone())
    }

    /// Insert or overwrite an entry, evicting the oldest-inserted key once
    /// the count exceeds capacity. Overwrites keep the key's original
    /// insertion position.
    pub fn insert(&self, key: String, data: Value) {
        let mut inner = self.inner.lock().unwrap();

        let replaced = inner
            .entries
            .insert(
                key.clone(),
                CacheEntry {
                    data,
                    stored_at: Instant::now(),
                },
            )
            .is_some();
        if !replaced {
            inner.order.push_back(key);
        }

        while inner.entries.len() > self.config.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            debug!(key = %oldest, "cache at capacity, evicting oldest entry");
            inner.entries.remove(&oldest);
        }
    }

    /// Remove every entry whose key starts with the endpoint prefix.
    pub fn invalidate_prefix(&self, endpoint: &str) {
        let mut inner = self.inner.lock().unwrap();
        let inner = &mut *inner;
        inner.entries.retain(|k, _| !k.starts_with(endpoint));
        let entries = &inner.entries;
        inner.order.retain(|k| entries.contains_key(k));
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde_json::json;

    fn small_cache(ttl_ms: u64, capacity: usize) -> PaginationCache {
        PaginationCache::new(CacheConfig::new(Duration::from_millis(ttl_ms), capacity))
    }

    #[test]
    fn test_get_miss_returns_none() {
        let cache = small_cache(1_000, 10);
        assert_eq!(cache.get("/units::{}"), None);
    }

    #[test]
    fn test_insert_then_get() {
        let cache = small_cache(1_000, 10);
        cache.insert("/units::{}".to_string(), json!({"data": [1, 2]}));
        assert_eq!(cache.get("/units::{}"), Some(json!({"data": [1, 2]})));
    }

    #[test]
    fn test_stale_entry_removed_lazily() {
        let cache = small_cache(20, 10);
        cache.insert("/units::{}".to_string(), json!(1));
        assert_eq!(cache.len(), 1);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("/units::{}"), None);
        // The stale read removed the entry
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest_inserted() {
        let cache = small_cache(60_000, 3);
        cache.insert("a".to_string(), json!(1));
        cache.insert("b".to_string(), json!(2));
        cache.insert("c".to_string(), json!(3));
        cache.insert("d".to_string(), json!(4));

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("d"), Some(json!(4)));
    }

    #[test]
    fn test_default_capacity_caps_at_100_entries() {
        let cache = PaginationCache::new(CacheConfig::default());
        for i in 0..101 {
            cache.insert(format!("/units::{{\"page\":{}}}", i), json!(i));
        }
        // The 101st insert evicted exactly one entry, the oldest-inserted
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.get("/units::{\"page\":0}"), None);
        assert_eq!(cache.get("/units::{\"page\":1}"), Some(json!(1)));
        assert_eq!(cache.get("/units::{\"page\":100}"), Some(json!(100)));
    }

    #[test]
    fn test_overwrite_keeps_insertion_position() {
        let cache = small_cache(60_000, 2);
        cache.insert("a".to_string(), json!(1));
        cache.insert("b".to_string(), json!(2));
        cache.insert("a".to_string(), json!(10));
        cache.insert("c".to_string(), json!(3));

        // "a" kept its original (oldest) slot, so it is the one evicted
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("c"), Some(json!(3)));
    }

    #[test]
    fn test_invalidate_prefix() {
        let cache = small_cache(60_000, 10);
        cache.insert("/units::{\"page\":1}".to_string(), json!(1));
        cache.insert("/units::{\"page\":2}".to_string(), json!(2));
        cache.insert("/leases::{}".to_string(), json!(3));

        cache.invalidate_prefix("/units");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("/leases::{}"), Some(json!(3)));
    }

    #[test]
    fn test_clear() {
        let cache = small_cache(60_000, 10);
        cache.insert("a".to_string(), json!(1));
        cache.insert("b".to_string(), json!(2));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        let params: std::collections::BTreeMap<String, String> = [
            ("limit".to_string(), "20".to_string()),
            ("cursor".to_string(), "abc".to_string()),
        ]
        .into_iter()
        .collect();

        let a = cache_key("/units", &params).unwrap();
        let b = cache_key("/units", &params).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("/units::"));
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(
            &self,
            _serializer: S,
        ) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("deliberately unserializable"))
        }
    }

    #[test]
    fn test_unserializable_params_skip_caching() {
        assert_eq!(cache_key("/units", &Unserializable), None);
    }
}
