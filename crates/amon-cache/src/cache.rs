use std::hash::Hash;
use std::time::Duration;

use moka::sync::Cache as MokaCache;

/// A cached lookup result. Negative results are cached too (§4.3), so a
/// miss that has already been recorded is cheap to repeat.
#[derive(Debug, Clone)]
pub enum CacheEntry<V> {
    Hit(V),
    Miss,
}

impl<V> CacheEntry<V> {
    pub fn into_hit(self) -> Option<V> {
        match self {
            CacheEntry::Hit(v) => Some(v),
            CacheEntry::Miss => None,
        }
    }
}

/// A named, capacity- and TTL-bounded cache. `capacity = 0` means
/// effectively unbounded, per §4.3. A cache built with `disabled = true`
/// makes every `get` report "not cached" and every `set`/`invalidate` a
/// no-op, implementing the global disable sentinel.
pub struct Cache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Option<MokaCache<K, CacheEntry<V>>>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: u64, ttl_secs: u64, disabled: bool) -> Self {
        if disabled {
            return Self { inner: None };
        }
        let capacity = if capacity == 0 { u64::MAX } else { capacity };
        let inner = MokaCache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { inner: Some(inner) }
    }

    /// `None` means the key has not been cached at all (or caching is
    /// disabled) and the caller must perform the real lookup; `Some(_)`
    /// distinguishes a cached value from a cached negative result.
    pub fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        self.inner.as_ref()?.get(key)
    }

    pub fn set_hit(&self, key: K, value: V) {
        if let Some(c) = &self.inner {
            c.insert(key, CacheEntry::Hit(value));
        }
    }

    pub fn set_miss(&self, key: K) {
        if let Some(c) = &self.inner {
            c.insert(key, CacheEntry::Miss);
        }
    }

    pub fn invalidate(&self, key: &K) {
        if let Some(c) = &self.inner {
            c.invalidate(key);
        }
    }

    pub fn reset(&self) {
        if let Some(c) = &self.inner {
            c.invalidate_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_cache_never_hits() {
        let c: Cache<String, i32> = Cache::new(10, 30, true);
        c.set_hit("a".to_string(), 1);
        assert!(c.get(&"a".to_string()).is_none());
    }

    #[test]
    fn negative_result_is_cached() {
        let c: Cache<String, i32> = Cache::new(10, 30, false);
        c.set_miss("missing".to_string());
        assert!(matches!(c.get(&"missing".to_string()), Some(CacheEntry::Miss)));
    }

    #[test]
    fn invalidate_clears_entry() {
        let c: Cache<String, i32> = Cache::new(10, 30, false);
        c.set_hit("a".to_string(), 1);
        c.invalidate(&"a".to_string());
        assert!(c.get(&"a".to_string()).is_none());
    }
}
