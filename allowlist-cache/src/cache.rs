//! In-memory verified-domain cache with lazy, single-flight refresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use allowlist_core::error::{AllowlistError, FetchError, Result};
use allowlist_core::traits::{AllowlistFetcher, Clock, SystemClock};
use allowlist_core::types::{Allowlist, RefreshParameters};
use allowlist_core::AllowlistConfig;

/// An allowlist together with the time it was fetched.
///
/// The pair is replaced as one unit, so a snapshot never mixes a new list
/// with an old timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CacheSnapshot {
    /// Domains from the last successful refresh
    pub allowlist: Allowlist,
    /// When that refresh completed
    pub refreshed_at: DateTime<Utc>,
}

impl CacheSnapshot {
    fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.refreshed_at).num_seconds()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    /// Number of cached domains
    pub domains: usize,
    /// Successful refreshes, including the initial one
    pub refreshes: u64,
    /// Failed refresh attempts since construction
    pub failed_refreshes: u64,
    /// Time of the last successful refresh
    pub refreshed_at: DateTime<Utc>,
    /// Seconds since the last successful refresh
    pub age_seconds: i64,
    /// Whether the next read will attempt a refresh
    pub stale: bool,
}

struct CacheInner {
    fetcher: Arc<dyn AllowlistFetcher>,
    clock: Arc<dyn Clock>,
    params: RefreshParameters,
    state: RwLock<Arc<CacheSnapshot>>,
    refresh_lock: Arc<Mutex<()>>,
    /// Completed refresh attempts, successful or not.
    attempts: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

impl CacheInner {
    fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.state.read().clone()
    }

    fn is_stale(&self, snapshot: &CacheSnapshot) -> bool {
        snapshot.age_secs(self.clock.now()) >= self.params.staleness_secs()
    }

    /// Fetches and swaps in a new snapshot. Callers must hold `refresh_lock`.
    async fn refresh_locked(&self) -> std::result::Result<Arc<CacheSnapshot>, FetchError> {
        let result = self.fetcher.fetch(&self.params).await;

        let outcome = match result {
            Ok(domains) => {
                let snapshot = Arc::new(CacheSnapshot {
                    allowlist: Allowlist::from_domains(domains),
                    refreshed_at: self.clock.now(),
                });
                *self.state.write() = Arc::clone(&snapshot);
                self.refreshes.fetch_add(1, Ordering::Relaxed);

                info!(domains = snapshot.allowlist.len(), "Refreshed verified domains");
                Ok(snapshot)
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        };

        self.attempts.fetch_add(1, Ordering::Release);
        outcome
    }
}

/// Cache of the Fediseer verified-domain allowlist.
///
/// A cache value always holds data: construction only succeeds once the
/// initial fetch does. Reads are served from memory and trigger a refresh
/// once the data is at least the staleness threshold old.
///
/// # Refresh policy
///
/// - At most one fetch runs at a time. Readers that find the data stale while
///   a fetch is running wait for it and reuse its result, whether it
///   succeeded or failed.
/// - A failed refresh keeps the previous allowlist and its timestamp, so the
///   next read tries again. The failure is logged and counted in
///   [`stats`](Self::stats); the read itself never fails.
/// - A fetch runs on its own task. A reader that is dropped mid-refresh does
///   not abort it.
///
/// Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct VerifiedDomainCache {
    inner: Arc<CacheInner>,
}

impl VerifiedDomainCache {
    /// Creates a cache and performs the initial refresh.
    ///
    /// Fails with [`AllowlistError::UpstreamUnavailable`] or
    /// [`AllowlistError::UpstreamMalformedResponse`] if that refresh fails.
    pub async fn new(fetcher: Arc<dyn AllowlistFetcher>, params: RefreshParameters) -> Result<Self> {
        Self::with_clock(fetcher, params, Arc::new(SystemClock)).await
    }

    /// Creates a cache using parameters resolved from `config`.
    pub async fn from_config(
        config: &AllowlistConfig,
        fetcher: Arc<dyn AllowlistFetcher>,
    ) -> Result<Self> {
        Self::new(fetcher, config.refresh_parameters()).await
    }

    /// Creates a cache that reads time from `clock`.
    pub async fn with_clock(
        fetcher: Arc<dyn AllowlistFetcher>,
        params: RefreshParameters,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let domains = fetcher.fetch(&params).await.map_err(|err| {
            warn!(error = %err, "Initial verified domain fetch failed");
            AllowlistError::from(err)
        })?;

        let snapshot = CacheSnapshot {
            allowlist: Allowlist::from_domains(domains),
            refreshed_at: clock.now(),
        };

        info!(
            domains = snapshot.allowlist.len(),
            endorsements = params.endorsements,
            guarantors = params.guarantors,
            limit = params.limit,
            "Verified domain cache ready"
        );

        Ok(Self {
            inner: Arc::new(CacheInner {
                fetcher,
                clock,
                params,
                state: RwLock::new(Arc::new(snapshot)),
                refresh_lock: Arc::new(Mutex::new(())),
                attempts: AtomicU64::new(1),
                refreshes: AtomicU64::new(1),
                failures: AtomicU64::new(0),
            }),
        })
    }

    /// Returns the current allowlist, refreshing it first if stale.
    ///
    /// Never fails. If the refresh fails, the last good allowlist is
    /// returned, however old.
    pub async fn get_domains(&self) -> Allowlist {
        self.current().await.allowlist.clone()
    }

    /// Like [`get_domains`](Self::get_domains), but returns the allowlist
    /// together with the time it was fetched.
    ///
    /// The pair is the one this call's refresh produced, or the previous one
    /// if that refresh failed.
    pub async fn get_snapshot(&self) -> CacheSnapshot {
        self.current().await.as_ref().clone()
    }

    async fn current(&self) -> Arc<CacheSnapshot> {
        let seen = self.inner.attempts.load(Ordering::Acquire);
        let current = self.inner.snapshot();

        if !self.inner.is_stale(&current) {
            return current;
        }

        let guard = Arc::clone(&self.inner.refresh_lock).lock_owned().await;

        if self.inner.attempts.load(Ordering::Acquire) != seen {
            // An attempt finished while we waited: reuse its outcome.
            drop(guard);
            debug!("Reusing result of concurrent refresh");
            return self.inner.snapshot();
        }

        match self.spawn_refresh(guard).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let previous = self.inner.snapshot();
                warn!(
                    error = %err,
                    recoverable = err.is_recoverable(),
                    age_seconds = previous.age_secs(self.inner.clock.now()),
                    domains = previous.allowlist.len(),
                    "Verified domain refresh failed, serving stale allowlist"
                );
                previous
            }
        }
    }

    /// Refreshes now, regardless of staleness.
    ///
    /// Waits for a refresh already in flight, then runs its own. On failure
    /// the cached state is left untouched and the error is returned.
    pub async fn refresh(&self) -> std::result::Result<(), FetchError> {
        let guard = Arc::clone(&self.inner.refresh_lock).lock_owned().await;
        self.spawn_refresh(guard).await.map(|_| ())
    }

    async fn spawn_refresh(
        &self,
        guard: OwnedMutexGuard<()>,
    ) -> std::result::Result<Arc<CacheSnapshot>, FetchError> {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let _guard = guard;
            inner.refresh_locked().await
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(FetchError::Transport(format!(
                "refresh task failed: {join_err}"
            ))),
        }
    }

    /// Returns the current allowlist and its timestamp as one pair.
    ///
    /// Does not refresh.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.inner.snapshot().as_ref().clone()
    }

    /// Time of the last successful refresh.
    pub fn last_refreshed_at(&self) -> DateTime<Utc> {
        self.inner.snapshot().refreshed_at
    }

    /// Returns true if the next read will attempt a refresh.
    pub fn is_stale(&self) -> bool {
        self.inner.is_stale(&self.inner.snapshot())
    }

    /// The parameters sent upstream on every refresh.
    pub fn params(&self) -> &RefreshParameters {
        &self.inner.params
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let snapshot = self.inner.snapshot();
        let now = self.inner.clock.now();
        CacheStats {
            domains: snapshot.allowlist.len(),
            refreshes: self.inner.refreshes.load(Ordering::Relaxed),
            failed_refreshes: self.inner.failures.load(Ordering::Relaxed),
            refreshed_at: snapshot.refreshed_at,
            age_seconds: snapshot.age_secs(now),
            stale: snapshot.age_secs(now) >= self.inner.params.staleness_secs(),
        }
    }
}

impl std::fmt::Debug for VerifiedDomainCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.inner.snapshot();
        f.debug_struct("VerifiedDomainCache")
            .field("params", &self.inner.params)
            .field("domains", &snapshot.allowlist.len())
            .field("refreshed_at", &snapshot.refreshed_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::future::join_all;
    use parking_lot::Mutex as SyncMutex;

    use allowlist_core::error::ErrorKind;
    use allowlist_core::traits::ManualClock;

    use super::*;

    type Response = std::result::Result<Vec<String>, FetchError>;

    /// Fetcher that replays scripted responses. The last one repeats.
    struct ScriptedFetcher {
        responses: SyncMutex<VecDeque<Response>>,
        calls: AtomicUsize,
        delay: Duration,
        seen_params: SyncMutex<Vec<RefreshParameters>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Response>) -> Arc<Self> {
            Self::with_delay(responses, Duration::ZERO)
        }

        fn with_delay(responses: Vec<Response>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                responses: SyncMutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                delay,
                seen_params: SyncMutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AllowlistFetcher for ScriptedFetcher {
        async fn fetch(&self, params: &RefreshParameters) -> Response {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_params.lock().push(params.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let mut responses = self.responses.lock();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        }
    }

    fn ok(domains: &[&str]) -> Response {
        Ok(domains.iter().map(|d| d.to_string()).collect())
    }

    async fn cache_with(
        fetcher: Arc<ScriptedFetcher>,
    ) -> (VerifiedDomainCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = VerifiedDomainCache::with_clock(
            fetcher,
            RefreshParameters::default(),
            clock.clone(),
        )
        .await
        .unwrap();
        (cache, clock)
    }

    #[tokio::test]
    async fn test_construct_serves_initial_domains_in_order() {
        let fetcher = ScriptedFetcher::new(vec![ok(&["a.example", "b.example"])]);
        let (cache, _clock) = cache_with(fetcher.clone()).await;

        let domains = cache.get_domains().await;
        assert_eq!(domains.as_slice(), &["a.example", "b.example"]);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_construct_fails_on_timeout() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::Timeout { seconds: 10 })]);
        let err = VerifiedDomainCache::new(fetcher, RefreshParameters::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AllowlistError::UpstreamUnavailable(FetchError::Timeout { seconds: 10 })
        ));
    }

    #[tokio::test]
    async fn test_construct_fails_on_status() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::Status { status: 503 })]);
        let err = VerifiedDomainCache::new(fetcher, RefreshParameters::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::UpstreamUnavailable));
    }

    #[tokio::test]
    async fn test_construct_fails_on_missing_domains() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::MissingDomains)]);
        let err = VerifiedDomainCache::new(fetcher, RefreshParameters::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AllowlistError::UpstreamMalformedResponse(FetchError::MissingDomains)
        ));
    }

    #[tokio::test]
    async fn test_from_config_sends_configured_parameters() {
        let fetcher = ScriptedFetcher::new(vec![ok(&["a.example"])]);
        let config = AllowlistConfig {
            endorsements: 4,
            guarantors: 3,
            return_limit: 10,
            ..Default::default()
        };
        let cache = VerifiedDomainCache::from_config(&config, fetcher.clone())
            .await
            .unwrap();

        let seen = fetcher.seen_params.lock().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].endorsements, 4);
        assert_eq!(seen[0].guarantors, 3);
        assert_eq!(seen[0].limit, 10);
        assert_eq!(cache.params(), &seen[0]);
    }

    #[tokio::test]
    async fn test_fresh_read_does_not_fetch() {
        let fetcher = ScriptedFetcher::new(vec![ok(&["a.example"])]);
        let (cache, clock) = cache_with(fetcher.clone()).await;

        clock.advance_secs(599);
        assert!(!cache.is_stale());
        cache.get_domains().await;
        cache.get_domains().await;

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_read_fetches_once() {
        let fetcher = ScriptedFetcher::new(vec![ok(&["a.example"]), ok(&["b.example", "c.example"])]);
        let (cache, clock) = cache_with(fetcher.clone()).await;
        let first_refresh = cache.last_refreshed_at();

        clock.advance_secs(600);
        assert!(cache.is_stale());

        let domains = cache.get_domains().await;
        assert_eq!(domains.as_slice(), &["b.example", "c.example"]);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!((cache.last_refreshed_at() - first_refresh).num_seconds(), 600);

        // Fresh again
        cache.get_domains().await;
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_get_snapshot_returns_refreshed_pair() {
        let fetcher = ScriptedFetcher::new(vec![
            ok(&["a.example"]),
            ok(&["b.example"]),
            Err(FetchError::Status { status: 503 }),
        ]);
        let (cache, clock) = cache_with(fetcher.clone()).await;
        let initial = cache.last_refreshed_at();

        clock.advance_secs(600);
        let snapshot = cache.get_snapshot().await;
        assert_eq!(snapshot.allowlist.as_slice(), &["b.example"]);
        assert_eq!((snapshot.refreshed_at - initial).num_seconds(), 600);
        assert_eq!(snapshot, cache.snapshot());

        // A failed refresh yields the previous pair unchanged
        clock.advance_secs(600);
        let stale = cache.get_snapshot().await;
        assert_eq!(stale, snapshot);
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_previous_allowlist() {
        let fetcher = ScriptedFetcher::new(vec![
            ok(&["a.example", "b.example"]),
            Err(FetchError::Status { status: 502 }),
        ]);
        let (cache, clock) = cache_with(fetcher.clone()).await;
        let refreshed_at = cache.last_refreshed_at();

        clock.advance_secs(900);
        let domains = cache.get_domains().await;

        assert_eq!(domains.as_slice(), &["a.example", "b.example"]);
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.last_refreshed_at(), refreshed_at);
        assert_eq!(cache.stats().failed_refreshes, 1);
        assert_eq!(cache.stats().refreshes, 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_timestamp_so_next_read_retries() {
        let fetcher = ScriptedFetcher::new(vec![
            ok(&["a.example"]),
            Err(FetchError::Timeout { seconds: 10 }),
            ok(&["b.example"]),
        ]);
        let (cache, clock) = cache_with(fetcher.clone()).await;

        clock.advance_secs(600);
        assert_eq!(cache.get_domains().await.as_slice(), &["a.example"]);
        assert!(cache.is_stale());

        // Staleness is still measured from the initial fetch
        let domains = cache.get_domains().await;
        assert_eq!(domains.as_slice(), &["b.example"]);
        assert_eq!(fetcher.calls(), 3);
        assert!(!cache.is_stale());
    }

    #[tokio::test]
    async fn test_clock_moving_backwards_counts_as_fresh() {
        let fetcher = ScriptedFetcher::new(vec![ok(&["a.example"])]);
        let (cache, clock) = cache_with(fetcher.clone()).await;

        clock.advance_secs(-3600);
        cache.get_domains().await;

        assert!(!cache.is_stale());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_stale_reads_share_one_fetch() {
        let fetcher = ScriptedFetcher::with_delay(
            vec![ok(&["a.example"]), ok(&["b.example"])],
            Duration::from_millis(50),
        );
        let (cache, clock) = cache_with(fetcher.clone()).await;

        clock.advance_secs(600);
        let results = join_all((0..16).map(|_| cache.get_domains())).await;

        assert_eq!(fetcher.calls(), 2);
        assert!(results.iter().all(|d| d.as_slice() == ["b.example"]));
    }

    #[tokio::test]
    async fn test_concurrent_stale_reads_share_one_failure() {
        let fetcher = ScriptedFetcher::with_delay(
            vec![ok(&["a.example"]), Err(FetchError::Transport("reset".into()))],
            Duration::from_millis(50),
        );
        let (cache, clock) = cache_with(fetcher.clone()).await;

        clock.advance_secs(600);
        let results = join_all((0..16).map(|_| cache.get_domains())).await;

        assert_eq!(fetcher.calls(), 2);
        assert!(results.iter().all(|d| d.as_slice() == ["a.example"]));
        assert_eq!(cache.stats().failed_refreshes, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stale_reads_across_threads() {
        let fetcher = ScriptedFetcher::with_delay(
            vec![ok(&["a.example"]), ok(&["b.example"])],
            Duration::from_millis(50),
        );
        let (cache, clock) = cache_with(fetcher.clone()).await;

        clock.advance_secs(600);
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_domains().await })
            })
            .collect();

        for handle in handles {
            let domains = handle.await.unwrap();
            assert_eq!(domains.as_slice(), &["b.example"]);
        }
        assert_eq!(fetcher.calls(), 2);
    }

    /// Fetcher whose single domain encodes the clock reading at fetch time.
    struct ClockEchoFetcher {
        clock: Arc<ManualClock>,
    }

    #[async_trait]
    impl AllowlistFetcher for ClockEchoFetcher {
        async fn fetch(&self, _params: &RefreshParameters) -> Response {
            tokio::task::yield_now().await;
            Ok(vec![format!("{}.example", self.clock.now().timestamp())])
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_snapshots_are_never_torn() {
        let clock = Arc::new(ManualClock::default());
        let fetcher = Arc::new(ClockEchoFetcher { clock: clock.clone() });
        let cache = VerifiedDomainCache::with_clock(
            fetcher,
            RefreshParameters::default(),
            clock.clone(),
        )
        .await
        .unwrap();

        let writer = {
            let cache = cache.clone();
            let clock = clock.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    clock.advance_secs(1);
                    cache.refresh().await.unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    for _ in 0..500 {
                        let snapshot = cache.snapshot();
                        let expected = format!("{}.example", snapshot.refreshed_at.timestamp());
                        assert_eq!(snapshot.allowlist.as_slice(), &[expected]);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(cache.stats().refreshes, 201);
    }

    #[tokio::test]
    async fn test_dropped_reader_does_not_cancel_refresh() {
        let fetcher = ScriptedFetcher::with_delay(
            vec![ok(&["a.example"]), ok(&["b.example"])],
            Duration::from_millis(100),
        );
        let (cache, clock) = cache_with(fetcher.clone()).await;

        clock.advance_secs(600);
        let timed_out = tokio::time::timeout(Duration::from_millis(10), cache.get_domains()).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(cache.snapshot().allowlist.as_slice(), &["b.example"]);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_forced_refresh() {
        let fetcher = ScriptedFetcher::new(vec![
            ok(&["a.example"]),
            ok(&["b.example"]),
            Err(FetchError::InvalidBody("not json".into())),
        ]);
        let (cache, clock) = cache_with(fetcher.clone()).await;

        clock.advance_secs(5);
        cache.refresh().await.unwrap();
        assert_eq!(cache.snapshot().allowlist.as_slice(), &["b.example"]);
        let refreshed_at = cache.last_refreshed_at();

        clock.advance_secs(5);
        let err = cache.refresh().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamMalformedResponse);
        assert_eq!(cache.snapshot().allowlist.as_slice(), &["b.example"]);
        assert_eq!(cache.last_refreshed_at(), refreshed_at);
    }

    #[tokio::test]
    async fn test_stats() {
        let fetcher = ScriptedFetcher::new(vec![ok(&["a.example", "b.example", "a.example"])]);
        let (cache, clock) = cache_with(fetcher).await;

        clock.advance_secs(120);
        let stats = cache.stats();
        assert_eq!(stats.domains, 2);
        assert_eq!(stats.refreshes, 1);
        assert_eq!(stats.failed_refreshes, 0);
        assert_eq!(stats.age_seconds, 120);
        assert!(!stats.stale);
    }
}
