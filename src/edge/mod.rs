/// Edge Cache Service - TTL-bounded read-through cache in front of a resolver
///
/// Lookup order:
/// 1. Fresh cache entry (served with `cache` provenance)
/// 2. Upstream resolution, TTL clamped to the ceiling, entry overwritten
///    (served with `resolver` provenance)
///
/// Upstream failures are propagated unchanged. An expired entry is never
/// served as a fallback.

pub mod cache;

pub use cache::{cache_key, CacheEntry, CacheRead, RecordCache, KEY_SEPARATOR};

use crate::{
    config::GatewayConfig,
    error::{NameError, NameResult},
    metrics,
    resolution::Resolve,
};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Where an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provenance {
    #[serde(rename = "cache")]
    Cache,
    #[serde(rename = "resolver")]
    Live,
}

/// Answer returned by [`EdgeCacheService::lookup`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub value: String,
    pub ttl: u64,
    /// Registry lastUpdated (freshness proof)
    pub last_updated: i64,
    pub provenance: Provenance,
}

impl Lookup {
    fn from_entry(entry: CacheEntry, provenance: Provenance) -> Self {
        Self {
            value: entry.value,
            ttl: entry.ttl,
            last_updated: entry.last_updated,
            provenance,
        }
    }
}

/// Edge cache tuning
#[derive(Debug, Clone)]
pub struct EdgeSettings {
    /// Upper bound on any cached TTL, in seconds
    pub ttl_ceiling: u64,
    pub max_entries: usize,
    /// Bound on a single upstream call
    pub upstream_timeout: Duration,
}

impl From<&GatewayConfig> for EdgeSettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            ttl_ceiling: config.cache_ttl_ceiling,
            max_entries: config.cache_max_entries,
            upstream_timeout: Duration::from_millis(config.resolver_timeout_ms),
        }
    }
}

/// Read-through cache owning its record map
pub struct EdgeCacheService {
    cache: RecordCache,
    upstream: Arc<dyn Resolve>,
    upstream_timeout: Duration,
    /// Per-key gates collapsing concurrent misses into one upstream call
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl EdgeCacheService {
    pub fn new(upstream: Arc<dyn Resolve>, settings: EdgeSettings) -> Self {
        Self {
            cache: RecordCache::new(settings.ttl_ceiling, settings.max_entries),
            upstream,
            upstream_timeout: settings.upstream_timeout,
            in_flight: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// Resolve `(domain, record_type)` through the cache
    pub async fn lookup(&self, domain: &str, record_type: &str) -> NameResult<Lookup> {
        let key = cache_key(domain, record_type);

        match self.cache.get(&key, Instant::now()) {
            CacheRead::Hit(entry) => {
                metrics::record_cache_lookup("hit");
                return Ok(Lookup::from_entry(entry, Provenance::Cache));
            }
            CacheRead::Expired => metrics::record_cache_lookup("expired"),
            CacheRead::Miss => metrics::record_cache_lookup("miss"),
        }

        // One deadline covers waiting on the gate and the upstream call
        let deadline = Instant::now() + self.upstream_timeout;
        let gate = Arc::clone(&self.in_flight.entry(key.clone()).or_default());

        let result =
            match tokio::time::timeout_at(deadline, self.fill_miss(&gate, &key, domain, record_type, deadline))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(self.timed_out(domain, record_type)),
            };

        drop(gate);
        self.in_flight
            .remove_if(&key, |_, gate| Arc::strong_count(gate) == 1);

        result
    }

    /// Remove expired entries; used by the sweeper job
    pub fn sweep_expired(&self) -> usize {
        self.cache.purge_expired(Instant::now())
    }

    /// Miss path run under the per-key gate
    async fn fill_miss(
        &self,
        gate: &Mutex<()>,
        key: &str,
        domain: &str,
        record_type: &str,
        deadline: Instant,
    ) -> NameResult<Lookup> {
        let _guard = gate.lock().await;

        // Another caller may have filled the entry while we waited
        if let CacheRead::Hit(entry) = self.cache.get(key, Instant::now()) {
            debug!(key = %key, "Collapsed concurrent miss");
            return Ok(Lookup::from_entry(entry, Provenance::Cache));
        }

        // The previous holder used up our budget
        if Instant::now() >= deadline {
            return Err(self.timed_out(domain, record_type));
        }

        let resolved = self.upstream.resolve(domain, record_type).await?;

        let entry = self.cache.insert(key.to_string(), &resolved, Instant::now());
        debug!(
            domain = %domain,
            record_type = %record_type,
            registry_ttl = resolved.ttl,
            ttl = entry.ttl,
            "Cached live resolution"
        );

        Ok(Lookup::from_entry(entry, Provenance::Live))
    }

    fn timed_out(&self, domain: &str, record_type: &str) -> NameError {
        tracing::error!(
            domain = %domain,
            record_type = %record_type,
            timeout_ms = self.upstream_timeout.as_millis() as u64,
            "Upstream resolution timed out"
        );
        NameError::ResolutionFailed("Upstream resolution timed out".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::{ResolutionService, ResolvedRecord};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Resolver double with a swappable answer and delay
    struct StubResolver {
        answer: StdMutex<NameResult<ResolvedRecord>>,
        delay: StdMutex<Duration>,
        calls: AtomicUsize,
    }

    impl StubResolver {
        fn new(answer: NameResult<ResolvedRecord>) -> Arc<Self> {
            Arc::new(Self {
                answer: StdMutex::new(answer),
                delay: StdMutex::new(Duration::ZERO),
                calls: AtomicUsize::new(0),
            })
        }

        fn set_answer(&self, answer: NameResult<ResolvedRecord>) {
            *self.answer.lock().unwrap() = answer;
        }

        fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = delay;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Resolve for StubResolver {
        async fn resolve(&self, _domain: &str, _record_type: &str) -> NameResult<ResolvedRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.delay.lock().unwrap();
            tokio::time::sleep(delay).await;
            self.answer.lock().unwrap().clone()
        }
    }

    fn record(value: &str, ttl: u64) -> ResolvedRecord {
        ResolvedRecord {
            value: value.to_string(),
            ttl,
            last_updated: 1_700_000_000,
        }
    }

    fn service(upstream: Arc<dyn Resolve>) -> EdgeCacheService {
        EdgeCacheService::new(
            upstream,
            EdgeSettings {
                ttl_ceiling: 60,
                max_entries: 100,
                upstream_timeout: Duration::from_secs(2),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_then_cache() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 120)));
        let edge = service(upstream.clone());

        let first = edge.lookup("example.eth", "A").await.unwrap();
        assert_eq!(first.provenance, Provenance::Live);
        assert_eq!(first.ttl, 60);
        assert_eq!(first.last_updated, 1_700_000_000);

        tokio::time::advance(Duration::from_secs(30)).await;

        let second = edge.lookup("example.eth", "A").await.unwrap();
        assert_eq!(second.provenance, Provenance::Cache);
        assert_eq!(second.value, "203.0.113.10");
        assert_eq!(second.last_updated, 1_700_000_000);
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_requeries_upstream() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 120)));
        let edge = service(upstream.clone());

        edge.lookup("example.eth", "A").await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;

        let again = edge.lookup("example.eth", "A").await.unwrap();
        assert_eq!(again.provenance, Provenance::Live);
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_cached() {
        let upstream = StubResolver::new(Err(NameError::NotFound));
        let edge = service(upstream.clone());

        assert_eq!(edge.lookup("example.eth", "A").await, Err(NameError::NotFound));
        assert!(edge.cache().is_empty());

        assert_eq!(edge.lookup("example.eth", "A").await, Err(NameError::NotFound));
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_unconfigured_fails_immediately() {
        let upstream = Arc::new(ResolutionService::new(None, Duration::from_secs(30)));
        let edge = service(upstream);

        let started = std::time::Instant::now();
        assert_eq!(
            edge.lookup("example.eth", "A").await,
            Err(NameError::Unconfigured)
        );
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(edge.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_recovery() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 120)));
        upstream.set_delay(Duration::from_secs(10));
        let edge = service(upstream.clone());

        let result = edge.lookup("example.eth", "A").await;
        assert!(matches!(result, Err(NameError::ResolutionFailed(_))));
        assert!(edge.cache().is_empty());

        upstream.set_delay(Duration::ZERO);
        let recovered = edge.lookup("example.eth", "A").await.unwrap();
        assert_eq!(recovered.provenance, Provenance::Live);

        let cached = edge.lookup("example.eth", "A").await.unwrap();
        assert_eq!(cached.provenance, Provenance::Cache);
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_stale_fallback() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 30)));
        let edge = service(upstream.clone());

        edge.lookup("example.eth", "A").await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;

        upstream.set_answer(Err(NameError::ResolutionFailed("registry down".to_string())));
        let result = edge.lookup("example.eth", "A").await;
        assert!(matches!(result, Err(NameError::ResolutionFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_kind_propagates_unchanged() {
        let upstream = StubResolver::new(Err(NameError::DomainExpired("example.eth".to_string())));
        let edge = service(upstream);

        assert_eq!(
            edge.lookup("example.eth", "A").await,
            Err(NameError::DomainExpired("example.eth".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_not_merge() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 50)));
        let edge = service(upstream.clone());

        edge.lookup("example.eth", "A").await.unwrap();
        tokio::time::advance(Duration::from_secs(51)).await;

        upstream.set_answer(Ok(record("203.0.113.99", 10)));
        let refreshed = edge.lookup("example.eth", "A").await.unwrap();
        assert_eq!(refreshed.value, "203.0.113.99");
        assert_eq!(refreshed.ttl, 10);

        tokio::time::advance(Duration::from_secs(10)).await;
        let after = edge.lookup("example.eth", "A").await.unwrap();
        assert_eq!(after.provenance, Provenance::Live);
        assert_eq!(upstream.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idempotent_reads() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 45)));
        let edge = service(upstream);

        edge.lookup("example.eth", "A").await.unwrap();
        let a = edge.lookup("example.eth", "A").await.unwrap();
        let b = edge.lookup("example.eth", "A").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.ttl, 45);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_never_exceeds_ceiling() {
        for registry_ttl in [0, 1, 59, 60, 61, 86_400] {
            let upstream = StubResolver::new(Ok(record("v", registry_ttl)));
            let edge = service(upstream);

            let lookup = edge.lookup("example.eth", "A").await.unwrap();
            assert_eq!(lookup.ttl, registry_ttl.min(60));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_never_a_hit() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 0)));
        let edge = service(upstream.clone());

        assert_eq!(edge.lookup("example.eth", "A").await.unwrap().provenance, Provenance::Live);
        assert_eq!(edge.lookup("example.eth", "A").await.unwrap().provenance, Provenance::Live);
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_collapse() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 120)));
        upstream.set_delay(Duration::from_millis(100));
        let edge = Arc::new(service(upstream.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let edge = Arc::clone(&edge);
            tasks.spawn(async move { edge.lookup("example.eth", "A").await });
        }

        let mut live = 0;
        while let Some(joined) = tasks.join_next().await {
            let lookup = joined.unwrap().unwrap();
            assert_eq!(lookup.value, "203.0.113.10");
            if lookup.provenance == Provenance::Live {
                live += 1;
            }
        }

        assert_eq!(live, 1);
        assert_eq!(upstream.calls(), 1);
        assert!(edge.in_flight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_upstream_bounds_every_waiter() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 120)));
        upstream.set_delay(Duration::from_secs(3600));
        let edge = Arc::new(service(upstream.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..5 {
            let edge = Arc::clone(&edge);
            tasks.spawn(async move {
                let started = Instant::now();
                let result = edge.lookup("example.eth", "A").await;
                (result, started.elapsed())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (result, elapsed) = joined.unwrap();
            assert!(matches!(result, Err(NameError::ResolutionFailed(_))));
            assert!(elapsed <= Duration::from_secs(2), "waited {:?}", elapsed);
        }

        assert_eq!(upstream.calls(), 1);
        assert!(edge.cache().is_empty());
        assert!(edge.in_flight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_keys_resolve_separately() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 120)));
        let edge = service(upstream.clone());

        edge.lookup("example.eth", "A").await.unwrap();
        edge.lookup("example.eth", "TXT").await.unwrap();
        edge.lookup("other.eth", "A").await.unwrap();

        assert_eq!(upstream.calls(), 3);
        assert_eq!(edge.cache().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired() {
        let upstream = StubResolver::new(Ok(record("203.0.113.10", 5)));
        let edge = service(upstream);

        edge.lookup("example.eth", "A").await.unwrap();
        edge.lookup("other.eth", "A").await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(edge.sweep_expired(), 2);
        assert!(edge.cache().is_empty());
    }
}
