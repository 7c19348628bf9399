//! # Expiring LRU Cache
//!
//! Bounded in-memory store shared by the marine and tide normalizers.
//!
//! ## Key Structure
//! Keys are `prefix:name=value&name=value` with parameter names sorted
//! lexicographically, so the same parameter set always yields the same key no
//! matter what order the caller supplied it in.
//!
//! ## Eviction Strategy
//! - TTL expiration on read (lazy). An expired entry is removed when touched and
//!   reported as a miss, so it is indistinguishable from an absent one.
//! - Count-based LRU eviction: inserting a new key at capacity drops exactly one
//!   entry, the least recently used.
//!
//! ## Concurrency
//! A single mutex guards the LRU list; every operation is one short critical
//! section with no await inside. Concurrent misses on the same key are *not*
//! collapsed: each caller fetches upstream independently and the last `set`
//! wins.

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Build a canonical cache key from a prefix and a parameter set.
///
/// # Example
/// ```
/// use bay_conditions_lib::cache::build_key;
///
/// let a = build_key("marine", [("lat", 1.0), ("lon", 2.0)]);
/// let b = build_key("marine", [("lon", 2.0), ("lat", 1.0)]);
/// assert_eq!(a, b);
/// assert_eq!(a, "marine:lat=1&lon=2");
/// ```
pub fn build_key<I, K, V>(prefix: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Display,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(name, value)| (name.into(), value.to_string()))
        .collect();

    let joined = sorted
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}:{}", prefix, joined)
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// Running counters for the cache.
#[derive(Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub expired: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`] plus occupancy, for reporting.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
    pub entries: usize,
    pub capacity: usize,
    pub ttl_ms: u64,
}

/// Bounded key/value store with per-entry TTL and LRU eviction.
pub struct ExpiringCache<V> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    ttl: Duration,
    stats: CacheStats,
}

impl<V: Clone> ExpiringCache<V> {
    /// Create a cache holding at most `max_items` entries, each living `ttl`.
    ///
    /// A `max_items` of zero is raised to one.
    pub fn new(ttl: Duration, max_items: usize) -> Self {
        let capacity = NonZeroUsize::new(max_items).unwrap_or(NonZeroUsize::MIN);

        tracing::info!(
            "ExpiringCache initialized: ttl_ms={}, max_items={}",
            ttl.as_millis(),
            capacity
        );

        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            stats: CacheStats::default(),
        }
    }

    /// Look up a live entry, refreshing its recency.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            self.stats.expired.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "cache entry expired");
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or overwrite `key`, restarting its TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
            ttl: self.ttl,
        };

        let mut entries = self.entries.lock();
        // push returns the old pair on overwrite, or the LRU pair on eviction
        if let Some((displaced, _)) = entries.push(key.clone(), entry) {
            if displaced != key {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(evicted = %displaced, "cache at capacity, evicted LRU entry");
            }
        }
    }

    /// Drop every entry, returning how many were held.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        tracing::info!(removed, "cache cleared");
        removed
    }

    /// Number of stored entries, including expired ones not yet touched.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        let entries = self.entries.lock();
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            expired: self.stats.expired.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
            ttl_ms: self.ttl().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_millis(60_000);

    #[test]
    fn test_key_ignores_parameter_order() {
        let a = build_key("marine", [("lat", 1), ("lon", 2)]);
        let b = build_key("marine", [("lon", 2), ("lat", 1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_distinguishes_prefix_and_value() {
        let base = build_key("marine", [("lat", 1), ("lon", 2)]);
        assert_ne!(base, build_key("tides", [("lat", 1), ("lon", 2)]));
        assert_ne!(base, build_key("marine", [("lat", 1), ("lon", 3)]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_returns_value_until_ttl_elapses() {
        let cache = ExpiringCache::new(TTL, 10);
        cache.set("k", "v".to_string());

        tokio::time::advance(Duration::from_millis(59_999)).await;
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().expired, 1);
        assert!(cache.is_empty(), "expired entry is removed on access");
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_resets_ttl() {
        let cache = ExpiringCache::new(TTL, 10);
        cache.set("k", 1);
        tokio::time::advance(Duration::from_millis(50_000)).await;
        cache.set("k", 2);
        tokio::time::advance(Duration::from_millis(50_000)).await;
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn test_capacity_evicts_exactly_least_recently_used() {
        let cache = ExpiringCache::new(TTL, 3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        // touch "a" so "b" becomes least recently used
        assert_eq!(cache.get("a"), Some(1));

        cache.set("d", 4);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.get("d"), Some(4));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let cache = ExpiringCache::new(TTL, 2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_clear_removes_everything() {
        let cache = ExpiringCache::new(TTL, 10);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = ExpiringCache::new(TTL, 0);
        cache.set("a", 1);
        let _ = cache.get("a");
        let _ = cache.get("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.capacity, 1);
        assert_eq!(stats.ttl_ms, 60_000);
        assert_eq!(cache.ttl(), TTL);
    }
}
