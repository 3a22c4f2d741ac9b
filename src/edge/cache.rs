/// TTL-bounded record cache owned by the edge cache service
use crate::{metrics, resolution::ResolvedRecord};
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Separator between domain and record type in cache keys
pub const KEY_SEPARATOR: char = ':';

/// Expiry used when `now + ttl` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Build the composite cache key for a (domain, recordType) pair.
///
/// Record types never contain the separator (enforced at the HTTP boundary),
/// so the last separator always splits the pair unambiguously.
pub fn cache_key(domain: &str, record_type: &str) -> String {
    format!("{}{}{}", domain, KEY_SEPARATOR, record_type)
}

/// Cached resolution with its clamped TTL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: String,
    /// min(registry TTL, ceiling)
    pub ttl: u64,
    /// Registry lastUpdated, kept so cache hits still carry the proof
    pub last_updated: i64,
    pub expires_at: Instant,
}

impl CacheEntry {
    /// Valid iff `now < expires_at`
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Result of a cache read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheRead {
    Hit(CacheEntry),
    /// An entry existed but had expired; it has been dropped
    Expired,
    Miss,
}

/// Sharded concurrent map of cache entries.
///
/// `max_entries` is a soft bound: every writer makes room before inserting a
/// new key, but writers racing on different keys can each land one entry, so
/// the map may briefly hold up to `max_entries + writers - 1` entries. The
/// next insert of a new key trims it back below the bound.
pub struct RecordCache {
    entries: DashMap<String, CacheEntry>,
    ttl_ceiling: u64,
    max_entries: usize,
}

impl RecordCache {
    pub fn new(ttl_ceiling: u64, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ceiling,
            max_entries: max_entries.max(1),
        }
    }

    pub fn ttl_ceiling(&self) -> u64 {
        self.ttl_ceiling
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Clamp a registry TTL to the local ceiling
    pub fn clamp_ttl(&self, ttl: u64) -> u64 {
        ttl.min(self.ttl_ceiling)
    }

    /// Read an entry. Expired entries are never returned.
    pub fn get(&self, key: &str, now: Instant) -> CacheRead {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => return CacheRead::Hit(entry.value().clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            // Only drop it if nobody refreshed the key in between
            if self.entries.remove_if(key, |_, e| !e.is_fresh(now)).is_some() {
                metrics::record_cache_evictions("expired", 1);
            }
            CacheRead::Expired
        } else {
            CacheRead::Miss
        }
    }

    /// Insert or overwrite the entry for `key` from a fresh resolution
    pub fn insert(&self, key: String, record: &ResolvedRecord, now: Instant) -> CacheEntry {
        let ttl = self.clamp_ttl(record.ttl);
        let entry = CacheEntry {
            value: record.value.clone(),
            ttl,
            last_updated: record.last_updated,
            expires_at: now
                .checked_add(Duration::from_secs(ttl))
                .unwrap_or_else(|| now + FAR_FUTURE),
        };

        if !self.entries.contains_key(&key) {
            self.make_room(now);
        }

        self.entries.insert(key, entry.clone());
        metrics::set_cache_entries(self.entries.len());
        entry
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.is_fresh(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        metrics::record_cache_evictions("expired", removed);
        metrics::set_cache_entries(self.entries.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict until there is room for one more key. Each pass is a read-only
    /// scan followed by a single removal, so hits on other shards are never
    /// blocked. The entry closest to expiry goes first, which puts already
    /// expired entries ahead of live ones.
    fn make_room(&self, now: Instant) {
        while self.entries.len() >= self.max_entries {
            // Copy out the candidate so no shard guard outlives its step
            let mut victim: Option<(Instant, String)> = None;
            for entry in self.entries.iter() {
                let expires_at = entry.value().expires_at;
                if victim.as_ref().map_or(true, |(best, _)| expires_at < *best) {
                    victim = Some((expires_at, entry.key().clone()));
                }
            }

            let Some((expires_at, key)) = victim else {
                return;
            };
            let fresh = now < expires_at;

            if self.entries.remove(&key).is_some() {
                let reason = if fresh { "capacity" } else { "expired" };
                debug!(key = %key, reason, "Evicted cache entry at capacity");
                metrics::record_cache_evictions(reason, 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str, ttl: u64) -> ResolvedRecord {
        ResolvedRecord {
            value: value.to_string(),
            ttl,
            last_updated: 1_700_000_000,
        }
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("example.eth", "A"), "example.eth:A");
        assert_eq!(
            cache_key("host:8080.eth", "A").rsplit_once(KEY_SEPARATOR),
            Some(("host:8080.eth", "A"))
        );
    }

    #[test]
    fn test_clamp_ttl() {
        let cache = RecordCache::new(60, 10);
        for (registry_ttl, expected) in [(0, 0), (1, 1), (59, 59), (60, 60), (61, 60), (u64::MAX, 60)] {
            assert_eq!(cache.clamp_ttl(registry_ttl), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_exactly_at_ttl() {
        let cache = RecordCache::new(60, 10);
        let now = Instant::now();
        cache.insert(cache_key("example.eth", "A"), &record("203.0.113.10", 120), now);

        assert!(matches!(
            cache.get("example.eth:A", now + Duration::from_secs(59)),
            CacheRead::Hit(_)
        ));
        assert_eq!(
            cache.get("example.eth:A", now + Duration::from_secs(60)),
            CacheRead::Expired
        );
        assert!(cache.is_empty());
        assert_eq!(cache.get("example.eth:A", now), CacheRead::Miss);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_replaces_entry() {
        let cache = RecordCache::new(60, 10);
        let now = Instant::now();
        cache.insert("k".to_string(), &record("v1", 50), now);
        let second = cache.insert("k".to_string(), &record("v2", 10), now);

        assert_eq!(second.ttl, 10);
        match cache.get("k", now) {
            CacheRead::Hit(entry) => assert_eq!(entry, second),
            other => panic!("expected hit, got {:?}", other),
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = RecordCache::new(60, 10);
        let now = Instant::now();
        cache.insert("short".to_string(), &record("v", 5), now);
        cache.insert("long".to_string(), &record("v", 50), now);

        assert_eq!(cache.purge_expired(now + Duration::from_secs(10)), 1);
        assert_eq!(cache.len(), 1);
        assert!(matches!(cache.get("long", now), CacheRead::Hit(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_soonest_expiry() {
        let cache = RecordCache::new(60, 2);
        let now = Instant::now();
        cache.insert("a".to_string(), &record("v", 30), now);
        cache.insert("b".to_string(), &record("v", 10), now);
        cache.insert("c".to_string(), &record("v", 20), now);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b", now), CacheRead::Miss);
        assert!(matches!(cache.get("a", now), CacheRead::Hit(_)));
        assert!(matches!(cache.get("c", now), CacheRead::Hit(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_prefers_expired_entries() {
        let cache = RecordCache::new(60, 2);
        let now = Instant::now();
        cache.insert("a".to_string(), &record("v", 5), now);
        cache.insert("b".to_string(), &record("v", 50), now);

        let later = now + Duration::from_secs(10);
        cache.insert("c".to_string(), &record("v", 1), later);

        assert_eq!(cache.len(), 2);
        assert!(matches!(cache.get("b", later), CacheRead::Hit(_)));
        assert!(matches!(cache.get("c", later), CacheRead::Hit(_)));
    }
    #[tokio::test(start_paused = true)]
    async fn test_capacity_eviction_removes_one_entry() {
        let cache = RecordCache::new(60, 3);
        let now = Instant::now();
        cache.insert("a".to_string(), &record("v", 1), now);
        cache.insert("b".to_string(), &record("v", 2), now);
        cache.insert("c".to_string(), &record("v", 50), now);

        let later = now + Duration::from_secs(5);
        cache.insert("d".to_string(), &record("v", 50), later);

        // Only the soonest expiry is evicted; the other stale entry waits for the sweeper
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.purge_expired(later), 1);
    }

    #[test]
    fn test_concurrent_inserts_settle_at_capacity() {
        const WRITERS: usize = 8;
        const MAX: usize = 50;

        let cache = std::sync::Arc::new(RecordCache::new(60, MAX));
        let now = Instant::now();

        let handles: Vec<_> = (0..WRITERS)
            .map(|writer| {
                let cache = std::sync::Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        cache.insert(format!("{}-{}", writer, i), &record("v", 30), now);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        cache.insert("final".to_string(), &record("v", 30), now);
        assert!(cache.len() <= MAX);
    }
}
