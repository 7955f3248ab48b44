//! One partition of the response cache
//!
//! A shard is an `LruCache` (hash map plus intrusive recency list) behind a
//! single mutex. Every operation, reads included, takes the lock exclusively
//! because a hit moves the entry to the front of the recency order.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use crate::text::best_match;

/// Cached response, keyed by its canonical key in the owning shard
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: String,
    pub expires_at: Instant,
}

impl CacheEntry {
    /// A TTL too large to represent is treated as "never expires".
    pub fn new(value: String, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            expires_at: now.checked_add(ttl).unwrap_or_else(|| far_future(now)),
        }
    }

    /// An entry is live strictly before its expiry instant
    pub fn is_live_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Latest instant reachable from `now` in whole-year steps
fn far_future(now: Instant) -> Instant {
    const YEAR: Duration = Duration::from_secs(365 * 24 * 3600);
    [100u32, 10, 1]
        .into_iter()
        .find_map(|years| now.checked_add(YEAR * years))
        .unwrap_or(now)
}

pub struct Shard {
    entries: Mutex<LruCache<String, CacheEntry>>,
    capacity: NonZeroUsize,
}

impl Shard {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
        }
    }

    /// Insert or refresh `key`, making it the most recent entry.
    ///
    /// Returns the key evicted for capacity, if any.
    pub fn set(&self, key: &str, value: String, ttl: Duration) -> Option<String> {
        let mut entries = self.entries.lock();
        let entry = CacheEntry::new(value, ttl);

        let evicted = if let Some(existing) = entries.get_mut(key) {
            *existing = entry;
            None
        } else {
            entries.push(key.to_string(), entry).map(|(old_key, _)| old_key)
        };

        debug_assert!(entries.len() <= self.capacity.get());
        evicted
    }

    /// Exact lookup. Expired entries are dropped and reported as a miss.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let lookup = entries
            .get(key)
            .map(|entry| entry.is_live_at(now).then(|| entry.value.clone()));

        match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    /// Sweep expired entries, least recent first. Full O(capacity) scan.
    pub fn remove_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let expired: Vec<String> = entries
            .iter()
            .rev()
            .filter(|(_, entry)| !entry.is_live_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// Best approximate match among this shard's live keys.
    ///
    /// The lock is held only to snapshot the resident keys; scoring runs
    /// unlocked, so entries inserted mid-scan may be missed. The winner is
    /// re-read through [`Shard::get`] to revalidate expiry.
    pub fn fuzzy_get(&self, key: &str, threshold: f64) -> Option<(String, String)> {
        let snapshot = self.live_keys();
        let (best, score) = best_match(key, snapshot.iter().map(String::as_str))?;
        if score <= threshold {
            return None;
        }
        let best = best.to_string();
        self.get(&best).map(|value| (best, value))
    }

    fn live_keys(&self) -> Vec<String> {
        let entries = self.entries.lock();
        let now = Instant::now();
        entries
            .iter()
            .filter(|(_, entry)| entry.is_live_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains(key)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn shard(capacity: usize) -> Shard {
        Shard::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_set_then_get() {
        let shard = shard(4);
        shard.set("app deploy", "kubectl apply -f app.yaml".to_string(), HOUR);
        assert_eq!(shard.get("app deploy").as_deref(), Some("kubectl apply -f app.yaml"));
        assert_eq!(shard.get("missing"), None);
    }

    #[test]
    fn test_set_refreshes_value() {
        let shard = shard(4);
        shard.set("k", "old".to_string(), HOUR);
        assert_eq!(shard.set("k", "new".to_string(), HOUR), None);
        assert_eq!(shard.get("k").as_deref(), Some("new"));
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_touched() {
        let shard = shard(3);
        shard.set("a", "1".to_string(), HOUR);
        shard.set("b", "2".to_string(), HOUR);
        shard.set("c", "3".to_string(), HOUR);

        // Touch "a" so "b" becomes the oldest
        assert!(shard.get("a").is_some());

        let evicted = shard.set("d", "4".to_string(), HOUR);
        assert_eq!(evicted.as_deref(), Some("b"));
        assert_eq!(shard.len(), 3);
        assert_eq!(shard.get("b"), None);
        for key in ["a", "c", "d"] {
            assert!(shard.get(key).is_some(), "{} should still be cached", key);
        }
    }

    #[test]
    fn test_expired_entry_is_removed_on_get() {
        let shard = shard(4);
        shard.set("stale", "value".to_string(), Duration::ZERO);
        assert!(shard.contains("stale"));
        assert_eq!(shard.get("stale"), None);
        assert!(!shard.contains("stale"));
    }

    #[test]
    fn test_remove_expired() {
        let shard = shard(8);
        shard.set("fresh", "1".to_string(), HOUR);
        shard.set("old1", "2".to_string(), Duration::ZERO);
        shard.set("old2", "3".to_string(), Duration::ZERO);

        assert_eq!(shard.remove_expired(), 2);
        assert_eq!(shard.len(), 1);
        assert!(shard.get("fresh").is_some());
        assert_eq!(shard.remove_expired(), 0);
    }

    #[test]
    fn test_fuzzy_get() {
        let shard = shard(8);
        shard.set("files hidden list", "ls -la".to_string(), HOUR);
        shard.set("disk usage", "du -sh".to_string(), HOUR);

        let (key, value) = shard.fuzzy_get("files hidden lists", 0.8).unwrap();
        assert_eq!(key, "files hidden list");
        assert_eq!(value, "ls -la");

        assert!(shard.fuzzy_get("network interfaces", 0.8).is_none());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let shard = shard(4);
        shard.set("app deploy", "kubectl apply -f app.yaml".to_string(), Duration::MAX);
        shard.set(
            "files list",
            "ls".to_string(),
            Duration::from_secs(u64::MAX),
        );
        assert_eq!(shard.get("app deploy").as_deref(), Some("kubectl apply -f app.yaml"));
        assert_eq!(shard.get("files list").as_deref(), Some("ls"));
        assert_eq!(shard.remove_expired(), 0);
    }

    #[test]
    fn test_fuzzy_get_skips_expired() {
        let shard = shard(8);
        shard.set("files hidden list", "stale".to_string(), Duration::ZERO);
        assert!(shard.fuzzy_get("files hidden lists", 0.8).is_none());
    }
}
