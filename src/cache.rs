//! Key-scoped TTL memoization for sheet fetches.
//!
//! Dashboard views re-request the same sheet constantly; a hit inside the
//! TTL window returns the memoized batch with zero network I/O. Entries are
//! independent per key (no cross-key locking) and stale entries are never
//! returned silently: an expired or missing entry always triggers a real
//! fetch. Failures are never cached. Two concurrent misses for one key both
//! fetch and the last write wins, which is acceptable for read-only derived
//! data.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use crate::error::FetchError;
use crate::fetch::{fetch_and_parse, SheetFetcher};
use crate::models::{Dashboard, RecordBatch};

/// Time source for TTL checks, injected so tests drive it by hand.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

struct CacheEntry<V> {
    payload: V,
    created_at: u64,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Valid iff `now - created_at < ttl`.
    fn is_valid(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) < self.ttl.as_millis() as u64
    }
}

/// Concurrent key → payload map with per-entry TTL.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            entries: DashMap::new(),
            clock,
        }
    }

    /// The payload under `key` when the entry is still inside its TTL.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_valid(self.clock.now_millis()) {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    /// Store `payload` under `key`, replacing any previous entry.
    pub fn set(&self, key: &str, payload: V, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                created_at: self.clock.now_millis(),
                ttl,
            },
        );
    }

    /// Unconditionally drop `key`, forcing the next lookup to miss.
    pub fn clear(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Fetcher + orchestrator + cache, wired together for the dashboards.
pub struct CachedClient {
    fetcher: Arc<dyn SheetFetcher>,
    cache: TtlCache<Arc<RecordBatch>>,
}

impl CachedClient {
    pub fn new(fetcher: Arc<dyn SheetFetcher>, clock: Arc<dyn Clock>) -> Self {
        CachedClient {
            fetcher,
            cache: TtlCache::new(clock),
        }
    }

    /// Return the cached batch for `key` when fresh; otherwise fetch, store
    /// on success, and propagate failures uncached.
    pub async fn fetch_with_cache(
        &self,
        url: &str,
        dashboard: Dashboard,
        key: &str,
        ttl: Duration,
    ) -> Result<Arc<RecordBatch>, FetchError> {
        if let Some(hit) = self.cache.get(key) {
            debug!(key, "cache hit");
            return Ok(hit);
        }
        debug!(key, "cache miss");
        let batch = fetch_and_parse(self.fetcher.as_ref(), url, dashboard).await?;
        let payload = Arc::new(batch);
        self.cache.set(key, Arc::clone(&payload), ttl);
        Ok(payload)
    }

    /// Force-refresh entry point for the UI's refresh action.
    pub fn clear(&self, key: &str) {
        self.cache.clear(key);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct FakeClock {
        millis: AtomicU64,
    }

    impl FakeClock {
        fn new() -> Arc<Self> {
            Arc::new(FakeClock {
                millis: AtomicU64::new(0),
            })
        }

        fn advance(&self, by: u64) {
            self.millis.fetch_add(by, Ordering::SeqCst);
        }
    }

    impl Clock for FakeClock {
        fn now_millis(&self) -> u64 {
            self.millis.load(Ordering::SeqCst)
        }
    }

    struct CountingFetcher {
        calls: AtomicUsize,
        body: String,
    }

    impl CountingFetcher {
        fn new(body: &str) -> Arc<Self> {
            Arc::new(CountingFetcher {
                calls: AtomicUsize::new(0),
                body: body.to_string(),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SheetFetcher for CountingFetcher {
        async fn fetch_text(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    struct AlwaysFailingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SheetFetcher for AlwaysFailingFetcher {
        async fn fetch_text(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Transport(503))
        }
    }

    const SALES_BODY: &str = "Date,Firm,Contact\n2024-01-05,Acme Corp,Jane\n";

    #[tokio::test]
    async fn second_call_within_ttl_does_no_network_io() {
        let fetcher = CountingFetcher::new(SALES_BODY);
        let clock = FakeClock::new();
        let client = CachedClient::new(fetcher.clone(), clock.clone());
        let ttl = Duration::from_millis(5000);

        let first = client
            .fetch_with_cache("http://sheet.test", Dashboard::Sales, "sales", ttl)
            .await
            .unwrap();
        clock.advance(1000);
        let second = client
            .fetch_with_cache("http://sheet.test", Dashboard::Sales, "sales", ttl)
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn clear_forces_the_next_call_to_miss() {
        let fetcher = CountingFetcher::new(SALES_BODY);
        let client = CachedClient::new(fetcher.clone(), FakeClock::new());
        let ttl = Duration::from_millis(5000);

        client
            .fetch_with_cache("http://sheet.test", Dashboard::Sales, "sales", ttl)
            .await
            .unwrap();
        client.clear("sales");
        client
            .fetch_with_cache("http://sheet.test", Dashboard::Sales, "sales", ttl)
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn expired_entries_trigger_a_fresh_fetch() {
        let fetcher = CountingFetcher::new(SALES_BODY);
        let clock = FakeClock::new();
        let client = CachedClient::new(fetcher.clone(), clock.clone());
        let ttl = Duration::from_millis(5000);

        client
            .fetch_with_cache("http://sheet.test", Dashboard::Sales, "sales", ttl)
            .await
            .unwrap();
        clock.advance(5000);
        client
            .fetch_with_cache("http://sheet.test", Dashboard::Sales, "sales", ttl)
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let fetcher = CountingFetcher::new(SALES_BODY);
        let client = CachedClient::new(fetcher.clone(), FakeClock::new());
        let ttl = Duration::from_millis(5000);

        client
            .fetch_with_cache("http://a.test", Dashboard::Sales, "sales", ttl)
            .await
            .unwrap();
        client
            .fetch_with_cache("http://b.test", Dashboard::Payroll, "payroll", ttl)
            .await
            .unwrap();
        client.clear("payroll");
        client
            .fetch_with_cache("http://a.test", Dashboard::Sales, "sales", ttl)
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn url_scoped_keys_keep_one_dashboard_from_colliding() {
        let fetcher = CountingFetcher::new(SALES_BODY);
        let client = CachedClient::new(fetcher.clone(), FakeClock::new());
        let ttl = Duration::from_millis(5000);

        // Same dashboard, two source URLs. Keys carry the URL so the
        // second source does not read the first's cached batch.
        for url in ["http://a.test", "http://b.test"] {
            let key = format!("sales:{url}");
            client
                .fetch_with_cache(url, Dashboard::Sales, &key, ttl)
                .await
                .unwrap();
        }
        assert_eq!(fetcher.calls(), 2);

        client
            .fetch_with_cache(
                "http://a.test",
                Dashboard::Sales,
                "sales:http://a.test",
                ttl,
            )
            .await
            .unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn failures_are_propagated_and_never_cached() {
        let fetcher = Arc::new(AlwaysFailingFetcher {
            calls: AtomicUsize::new(0),
        });
        let client = CachedClient::new(fetcher.clone(), FakeClock::new());
        let ttl = Duration::from_millis(5000);

        for _ in 0..2 {
            let err = client
                .fetch_with_cache("http://sheet.test", Dashboard::Sales, "sales", ttl)
                .await
                .unwrap_err();
            assert!(matches!(err, FetchError::Transport(503)));
        }

        // Both attempts hit the network: the failure was not memoized.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn entry_validity_is_strictly_inside_ttl() {
        let entry = CacheEntry {
            payload: (),
            created_at: 1000,
            ttl: Duration::from_millis(5000),
        };
        assert!(entry.is_valid(1000));
        assert!(entry.is_valid(5999));
        assert!(!entry.is_valid(6000));
    }
}
