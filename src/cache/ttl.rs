//! In-memory TTL cache with a hard entry limit.

use super::clock::{Clock, SystemClock};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
        }
    }
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// String-keyed cache with per-entry expiry.
///
/// Reads never reorder entries, so the LRU end of the map is always the
/// least-recently-inserted entry. Replacing a key counts as a fresh insert.
/// A single mutex covers the map because expired reads remove entries.
pub struct TtlCache<V> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    capacity: NonZeroUsize,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    /// A zero capacity is clamped to one entry.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self::with_clock(capacity, default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
            default_ttl,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let expired = match entries.peek(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
            tracing::trace!(key, "expired cache entry dropped");
        }
        None
    }

    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.lock();
        let expired = match entries.peek(key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };
        if expired {
            entries.pop(key);
        }
        !expired
    }

    /// Insert with the configured default TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = self.clock.now();
        let mut entries = self.lock();
        if !entries.contains(&key) && entries.len() >= self.capacity.get() {
            let expired: Vec<String> = entries
                .iter()
                .filter(|(_, e)| e.is_expired(now))
                .map(|(k, _)| k.clone())
                .collect();
            for k in &expired {
                entries.pop(k);
            }
            if entries.len() >= self.capacity.get() {
                if let Some((evicted, entry)) = entries.pop_lru() {
                    tracing::debug!(
                        key = %evicted,
                        age_ms = now.saturating_duration_since(entry.created_at).as_millis() as u64,
                        "cache full, evicted oldest entry"
                    );
                }
            }
        }
        // `push` replaces an existing key and moves it to the most-recent end.
        entries.push(key, CacheEntry::new(value, now, ttl));
    }

    pub fn remove(&self, key: &str) -> bool {
        self.lock().pop(key).is_some()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.lock().iter().filter(|(_, e)| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;

    fn cache_with_clock(capacity: usize) -> (TtlCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::with_clock(capacity, Duration::from_secs(60), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_get_missing_is_none() {
        let (cache, _) = cache_with_clock(4);
        assert!(cache.get("nope").is_none());
        assert!(!cache.has("nope"));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (cache, clock) = cache_with_clock(4);
        cache.set("k", "v".to_string(), Duration::from_secs(1));
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        clock.advance(Duration::from_millis(1001));
        assert!(cache.get("k").is_none());
        assert!(!cache.has("k"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_entry_expires_exactly_at_deadline() {
        let (cache, clock) = cache_with_clock(4);
        cache.set("k", "v".to_string(), Duration::from_secs(1));
        clock.advance(Duration::from_secs(1));
        assert!(!cache.has("k"));
    }

    #[test]
    fn test_default_ttl_applies_on_insert() {
        let (cache, clock) = cache_with_clock(4);
        cache.insert("k", "v".to_string());
        clock.advance(Duration::from_secs(59));
        assert!(cache.has("k"));
        clock.advance(Duration::from_secs(1));
        assert!(!cache.has("k"));
    }

    #[test]
    fn test_capacity_evicts_oldest_insert() {
        let (cache, _) = cache_with_clock(3);
        for i in 0..4 {
            cache.insert(format!("k{i}"), format!("v{i}"));
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.get("k0").is_none());
        for i in 1..4 {
            assert_eq!(cache.get(&format!("k{i}")), Some(format!("v{i}")));
        }
    }

    #[test]
    fn test_reads_do_not_protect_from_eviction() {
        let (cache, _) = cache_with_clock(2);
        cache.insert("a", "1".to_string());
        cache.insert("b", "2".to_string());
        assert!(cache.get("a").is_some());
        cache.insert("c", "3".to_string());
        assert!(cache.get("a").is_none());
        assert!(cache.has("b"));
        assert!(cache.has("c"));
    }

    #[test]
    fn test_expired_entries_are_evicted_before_live_ones() {
        let (cache, clock) = cache_with_clock(2);
        cache.set("old", "1".to_string(), Duration::from_secs(60));
        cache.set("short", "2".to_string(), Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));
        cache.insert("new", "3".to_string());
        assert!(cache.has("old"));
        assert!(cache.has("new"));
    }

    #[test]
    fn test_set_replaces_value_and_resets_expiry() {
        let (cache, clock) = cache_with_clock(2);
        cache.set("k", "v1".to_string(), Duration::from_secs(2));
        clock.advance(Duration::from_secs(1));
        cache.set("k", "v2".to_string(), Duration::from_secs(2));
        clock.advance(Duration::from_millis(1500));
        assert_eq!(cache.get("k").as_deref(), Some("v2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_replacing_at_capacity_does_not_evict() {
        let (cache, _) = cache_with_clock(2);
        cache.insert("a", "1".to_string());
        cache.insert("b", "2".to_string());
        cache.insert("a", "1b".to_string());
        assert!(cache.has("b"));
        assert_eq!(cache.get("a").as_deref(), Some("1b"));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache: TtlCache<u32> = TtlCache::new(0, Duration::from_secs(5));
        assert_eq!(cache.capacity(), 1);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_remove() {
        let (cache, _) = cache_with_clock(2);
        cache.insert("a", "1".to_string());
        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert!(cache.is_empty());
    }
}
