//! Unit tests for [`AddressResolver`].

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rstest::{fixture, rstest};
use teamroute_core::test_support::StubGeocoder;
use teamroute_core::{
    AddressKey, CacheError, Coordinate, GeocodeCache, GeocodeError, GeocodeMatch, Geocoder,
    ImportOutcome, MemoryGeocodeCache,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::*;

fn point(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).expect("valid coordinate")
}

#[fixture]
fn geocoder() -> StubGeocoder {
    StubGeocoder::new()
        .with_match("SW1A 1AA", point(51.501, -0.1416))
        .with_match("EC1A 1BB", point(51.520, -0.0977))
        .with_match("M1 1AE", point(53.477, -2.2309))
        .with_error(
            "BROKEN 1",
            GeocodeError::NetworkError {
                url: "http://nominatim.test/search".to_owned(),
                message: "connection reset".to_owned(),
            },
        )
}

/// Records the instant of every call that reaches it.
struct TimedGeocoder<'a> {
    inner: &'a StubGeocoder,
    calls: StdMutex<Vec<Instant>>,
}

impl<'a> TimedGeocoder<'a> {
    fn new(inner: &'a StubGeocoder) -> Self {
        Self {
            inner,
            calls: StdMutex::new(Vec::new()),
        }
    }

    fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }

    fn first_call(&self) -> Option<Instant> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .first()
            .copied()
    }
}

#[async_trait]
impl Geocoder for TimedGeocoder<'_> {
    async fn search(&self, address: &str) -> Result<Option<GeocodeMatch>, GeocodeError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());
        self.inner.search(address).await
    }
}

/// Takes `latency` to answer and records when each call starts and ends.
struct SlowGeocoder<'a> {
    inner: &'a StubGeocoder,
    latency: Duration,
    spans: StdMutex<Vec<(Instant, Instant)>>,
}

impl<'a> SlowGeocoder<'a> {
    fn new(inner: &'a StubGeocoder, latency: Duration) -> Self {
        Self {
            inner,
            latency,
            spans: StdMutex::new(Vec::new()),
        }
    }

    /// Idle time between the end of each call and the start of the next.
    fn idle_gaps(&self) -> Vec<Duration> {
        let spans = self.spans.lock().unwrap_or_else(PoisonError::into_inner);
        spans.windows(2).map(|pair| pair[1].0 - pair[0].1).collect()
    }
}

#[async_trait]
impl Geocoder for SlowGeocoder<'_> {
    async fn search(&self, address: &str) -> Result<Option<GeocodeMatch>, GeocodeError> {
        let started = Instant::now();
        tokio::time::sleep(self.latency).await;
        let result = self.inner.search(address).await;
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((started, Instant::now()));
        result
    }
}

/// A cache whose backend is always unavailable.
struct BrokenCache;

impl GeocodeCache for BrokenCache {
    fn get(&self, _key: &AddressKey) -> Result<Option<GeocodeMatch>, CacheError> {
        Err(CacheError::new("read entry", "disk unavailable"))
    }

    fn put(&self, _key: &AddressKey, _entry: &GeocodeMatch) -> Result<(), CacheError> {
        Err(CacheError::new("write entry", "disk unavailable"))
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn first_call_is_not_delayed_and_later_calls_are_spaced(geocoder: StubGeocoder) {
    let timed = TimedGeocoder::new(&geocoder);
    let resolver = AddressResolver::new(&timed, MemoryGeocodeCache::new());
    let started = Instant::now();

    let report = resolver
        .resolve_all(
            &["SW1A 1AA", "EC1A 1BB", "M1 1AE"],
            &CancellationToken::new(),
            |_| {},
        )
        .await;

    assert_eq!(report.resolved_count(), 3);
    assert_eq!(timed.first_call(), Some(started));
    let gaps = timed.gaps();
    assert_eq!(gaps.len(), 2);
    assert!(gaps.iter().all(|gap| *gap >= DEFAULT_MIN_INTERVAL), "{gaps:?}");
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn spacing_is_measured_from_the_end_of_a_slow_call(geocoder: StubGeocoder) {
    let slow = SlowGeocoder::new(&geocoder, Duration::from_secs(1));
    let resolver = AddressResolver::new(&slow, MemoryGeocodeCache::new());

    let report = resolver
        .resolve_all(
            &["SW1A 1AA", "BROKEN 1", "EC1A 1BB"],
            &CancellationToken::new(),
            |_| {},
        )
        .await;

    assert_eq!(report.resolved_count(), 2);
    assert_eq!(report.failed_count(), 1);
    let gaps = slow.idle_gaps();
    assert_eq!(gaps.len(), 2);
    assert!(gaps.iter().all(|gap| *gap >= DEFAULT_MIN_INTERVAL), "{gaps:?}");
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cache_hits_skip_the_delay(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new());
    resolver.resolve("SW1A 1AA").await.expect("resolves");
    let started = Instant::now();

    let hit = resolver.resolve("sw1a1aa").await.expect("cached");

    assert!(hit.from_cache);
    assert_eq!(Instant::now(), started);
    assert_eq!(geocoder.calls(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn equal_keys_make_one_external_call(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new());

    let report = resolver
        .resolve_all(
            &["SW1A 1AA", "sw1a 1aa", " SW1A1AA ", "EC1A 1BB"],
            &CancellationToken::new(),
            |_| {},
        )
        .await;

    assert_eq!(geocoder.queries(), ["SW1A 1AA", "EC1A 1BB"]);
    assert_eq!(report.total(), 2);
    let addresses: Vec<&str> = report.resolved().map(|r| r.address.as_str()).collect();
    assert_eq!(addresses, ["SW1A 1AA", "EC1A 1BB"]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn concurrent_lookups_coalesce(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new());

    let (first, second) = tokio::join!(resolver.resolve("SW1A 1AA"), resolver.resolve("sw1a1aa"));

    let first = first.expect("first resolves");
    let second = second.expect("second resolves");
    assert_eq!(first.coordinate, second.coordinate);
    assert!(first.from_cache != second.from_cache);
    assert_eq!(geocoder.calls(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failures_are_distinct_and_not_cached(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new());

    let missing = resolver.resolve("ZZ99 9ZZ").await.expect_err("no match");
    let broken = resolver.resolve("BROKEN 1").await.expect_err("provider error");
    let retried = resolver.resolve("ZZ99 9ZZ").await.expect_err("still no match");

    assert_eq!(
        missing,
        ResolveError::NotFound {
            address: "ZZ99 9ZZ".to_owned()
        }
    );
    assert!(matches!(broken, ResolveError::Provider { .. }));
    assert_eq!(retried, missing);
    assert_eq!(geocoder.calls(), 3);
    assert!(resolver.cache().is_empty());
}

#[rstest]
#[tokio::test]
async fn blank_addresses_fail_without_lookup(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new());

    assert_eq!(
        resolver.resolve(" \t ").await,
        Err(ResolveError::EmptyAddress)
    );
    assert_eq!(geocoder.calls(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn report_separates_successes_and_failures(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new());
    let mut progress = Vec::new();

    let report = resolver
        .resolve_all(
            &["SW1A 1AA", "", "ZZ99 9ZZ", "EC1A 1BB"],
            &CancellationToken::new(),
            |step| progress.push(step),
        )
        .await;

    assert_eq!(report.total(), 3);
    assert_eq!(report.resolved_count(), 2);
    let failed: Vec<(&str, &ResolveError)> = report
        .failures()
        .map(|failure| (failure.address.as_str(), &failure.error))
        .collect();
    assert_eq!(
        failed,
        [
            ("", &ResolveError::EmptyAddress),
            (
                "ZZ99 9ZZ",
                &ResolveError::NotFound {
                    address: "ZZ99 9ZZ".to_owned()
                }
            ),
        ]
    );
    assert_eq!(report.outcome(), ImportOutcome::Partial);
    assert!(!report.is_cancelled());
    let steps: Vec<(usize, usize)> = progress.iter().map(|p| (p.current, p.total)).collect();
    assert_eq!(steps, [(1, 3), (2, 3), (3, 3)]);

    let jobs = report.jobs();
    let ids: Vec<&str> = jobs.iter().map(|job| job.id.as_str()).collect();
    assert_eq!(ids, ["job1", "job2", "job3", "job4"]);
    assert!(jobs.first().is_some_and(|job| job.is_resolved()));
    assert!(jobs.get(2).is_some_and(|job| !job.is_resolved()));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn nothing_resolved_is_reported(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new());

    let report = resolver
        .resolve_all(&["ZZ99 9ZZ"], &CancellationToken::new(), |_| {})
        .await;

    assert_eq!(report.outcome(), ImportOutcome::NoneResolved);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cancelling_between_items_stops_further_calls(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new());
    let cancel = CancellationToken::new();

    let report = resolver
        .resolve_all(&["SW1A 1AA", "EC1A 1BB", "M1 1AE"], &cancel, |_| cancel.cancel())
        .await;

    assert!(report.is_cancelled());
    assert_eq!(report.resolved_count(), 1);
    assert_eq!(report.failed_count(), 0);
    assert_eq!(geocoder.calls(), 1);
    assert_eq!(resolver.cache().len(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cancelling_during_the_throttle_wait_aborts_promptly(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });
    let started = Instant::now();

    let report = resolver
        .resolve_all(&["SW1A 1AA", "EC1A 1BB"], &cancel, |_| {})
        .await;

    assert!(report.is_cancelled());
    assert_eq!(geocoder.calls(), 1);
    assert!(Instant::now() - started < DEFAULT_MIN_INTERVAL);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cancelled_before_start_makes_no_calls(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = resolver.resolve_all(&["SW1A 1AA"], &cancel, |_| {}).await;

    assert!(report.is_cancelled());
    assert_eq!(report.resolved_count(), 0);
    assert_eq!(geocoder.calls(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cache_failures_degrade_to_lookups(geocoder: StubGeocoder) {
    let resolver = AddressResolver::new(&geocoder, BrokenCache);

    let first = resolver.resolve("SW1A 1AA").await.expect("resolves");
    let second = resolver.resolve("SW1A 1AA").await.expect("resolves again");

    assert!(!first.from_cache);
    assert!(!second.from_cache);
    assert_eq!(geocoder.calls(), 2);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn shared_cache_is_reused_across_resolvers(geocoder: StubGeocoder) {
    let cache = Arc::new(MemoryGeocodeCache::new());
    let first = AddressResolver::new(&geocoder, Arc::clone(&cache));
    first.resolve("SW1A 1AA").await.expect("resolves");

    let second = AddressResolver::new(&geocoder, Arc::clone(&cache));
    let hit = second.resolve("SW1A 1AA").await.expect("cached");

    assert!(hit.from_cache);
    assert_eq!(geocoder.calls(), 1);
}

#[rstest]
fn min_interval_is_configurable() {
    let config = ResolverConfig::default().with_min_interval(Duration::from_millis(250));

    assert_eq!(config.min_interval, Duration::from_millis(250));
    assert_eq!(ResolverConfig::default().min_interval, DEFAULT_MIN_INTERVAL);
}
