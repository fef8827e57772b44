//! Cached, throttled, cancellable address resolution.
//!
//! [`AddressResolver`] sits between the planner and a [`Geocoder`]:
//!
//! - addresses are keyed by [`AddressKey`], so spelling variants that differ
//!   only in case or spacing share one cache entry and one external call;
//! - a call that reaches the geocoder starts at least
//!   [`ResolverConfig::min_interval`] after the previous call finished, while
//!   cache hits are never delayed;
//! - every external call passes through a single async gate and the cache is
//!   re-read once the gate is held, so concurrent lookups of the same key
//!   coalesce into one call;
//! - failures are never cached.

use std::collections::HashSet;
use std::convert::Infallible;
use std::future::{Future, pending};
use std::pin::pin;
use std::time::Duration;

use teamroute_core::{
    AddressKey, Coordinate, GeocodeCache, GeocodeError, GeocodeMatch, Geocoder, ImportOutcome, Job,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Minimum spacing between external geocoder calls (Nominatim allows one
/// request per second).
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1100);

/// Tuning for [`AddressResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Minimum delay between the starts of two external calls.
    pub min_interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

impl ResolverConfig {
    /// Set the minimum inter-call delay.
    #[must_use]
    pub const fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }
}

/// A successfully resolved address.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAddress {
    /// Address as supplied.
    pub address: String,
    /// Normalised cache key.
    pub key: AddressKey,
    /// Resolved position.
    pub coordinate: Coordinate,
    /// Geocoder display name, if any.
    pub display_name: Option<String>,
    /// Whether the answer came from the cache.
    pub from_cache: bool,
}

impl ResolvedAddress {
    fn from_match(address: &str, key: AddressKey, found: GeocodeMatch, from_cache: bool) -> Self {
        Self {
            address: address.to_owned(),
            key,
            coordinate: found.coordinate,
            display_name: found.display_name,
            from_cache,
        }
    }

    /// Convert into a resolved [`Job`] with the given id.
    #[must_use]
    pub fn into_job(self, id: impl Into<String>) -> Job {
        Job {
            display_name: self.display_name,
            ..Job::resolved(id, self.address, self.coordinate)
        }
    }
}

/// Why a single address did not resolve.
///
/// Every variant is terminal for the item; resubmit to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The address is blank once whitespace is removed.
    #[error("address is empty")]
    EmptyAddress,
    /// The geocoder answered but found nothing.
    #[error("no match found for {address:?}")]
    NotFound {
        /// Address as supplied.
        address: String,
    },
    /// The geocoder could not be reached or answered badly.
    #[error("geocoding {address:?} failed: {source}")]
    Provider {
        /// Address as supplied.
        address: String,
        /// Transport or decoding failure.
        #[source]
        source: GeocodeError,
    },
}

/// A failed item of [`AddressResolver::resolve_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveFailure {
    /// Address as supplied.
    pub address: String,
    /// Cause.
    pub error: ResolveError,
}

/// Progress reported after each distinct address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveProgress {
    /// Distinct addresses processed so far.
    pub current: usize,
    /// Distinct non-empty addresses in the request.
    pub total: usize,
}

/// Outcome of [`AddressResolver::resolve_all`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolveAllReport {
    outcomes: Vec<Result<ResolvedAddress, ResolveFailure>>,
    total: usize,
    cancelled: bool,
}

impl ResolveAllReport {
    /// Successful resolutions in input order.
    pub fn resolved(&self) -> impl Iterator<Item = &ResolvedAddress> {
        self.outcomes.iter().filter_map(|outcome| outcome.as_ref().ok())
    }

    /// Failed addresses in input order.
    pub fn failures(&self) -> impl Iterator<Item = &ResolveFailure> {
        self.outcomes.iter().filter_map(|outcome| outcome.as_ref().err())
    }

    /// Number of successes.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.resolved().count()
    }

    /// Number of failures.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Distinct non-empty addresses requested.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Whether the run stopped early; finished items are kept.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Classify the run.
    #[must_use]
    pub fn outcome(&self) -> ImportOutcome {
        ImportOutcome::from_counts(self.resolved_count(), self.failed_count())
    }

    /// Jobs for every processed address, numbered `job1`, `job2`, … in
    /// input order. Failures become unresolved jobs.
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.outcomes
            .iter()
            .enumerate()
            .map(|(index, outcome)| {
                let id = format!("job{}", index + 1);
                match outcome {
                    Ok(resolved) => resolved.clone().into_job(id),
                    Err(failure) => Job::unresolved(id, failure.address.clone()),
                }
            })
            .collect()
    }
}

enum Step<I> {
    Done(Result<ResolvedAddress, ResolveError>),
    Interrupted(I),
}

/// Resolves addresses through a cache and a rate-limited geocoder.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use teamroute_core::{Coordinate, MemoryGeocodeCache};
/// use teamroute_core::test_support::StubGeocoder;
/// use teamroute_data::geocoding::{AddressResolver, ResolverConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let geocoder = StubGeocoder::new().with_match("SW1A 1AA", Coordinate::new(51.501, -0.1416)?);
/// let resolver = AddressResolver::new(&geocoder, MemoryGeocodeCache::new())
///     .with_config(ResolverConfig::default().with_min_interval(Duration::ZERO));
///
/// let first = resolver.resolve("sw1a 1aa").await?;
/// let again = resolver.resolve("SW1A1AA").await?;
/// assert!(!first.from_cache);
/// assert!(again.from_cache);
/// assert_eq!(geocoder.calls(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AddressResolver<G, C> {
    geocoder: G,
    cache: C,
    config: ResolverConfig,
    last_call: Mutex<Option<Instant>>,
}

impl<G, C> AddressResolver<G, C>
where
    G: Geocoder,
    C: GeocodeCache,
{
    /// Resolver with the default [`ResolverConfig`].
    pub fn new(geocoder: G, cache: C) -> Self {
        Self {
            geocoder,
            cache,
            config: ResolverConfig::default(),
            last_call: Mutex::new(None),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// Resolve one address.
    ///
    /// # Errors
    ///
    /// [`ResolveError::EmptyAddress`] for blank input,
    /// [`ResolveError::NotFound`] when the geocoder has no match and
    /// [`ResolveError::Provider`] when the call itself fails.
    pub async fn resolve(&self, address: &str) -> Result<ResolvedAddress, ResolveError> {
        let key = AddressKey::normalise(address).ok_or(ResolveError::EmptyAddress)?;
        match self.resolve_key(address, key, pending::<Infallible>()).await {
            Step::Done(result) => result,
            Step::Interrupted(never) => match never {},
        }
    }

    /// Resolve a list of addresses one at a time, in input order.
    ///
    /// Repeated addresses (by normalised key) are resolved once; the first
    /// spelling is kept. Blank addresses are reported as failures but are not
    /// counted in [`ResolveProgress::total`]. `on_progress` is invoked after
    /// each distinct address. Cancelling `cancel` stops the run before the
    /// next external call and marks the report as cancelled.
    pub async fn resolve_all<S, F>(
        &self,
        addresses: &[S],
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> ResolveAllReport
    where
        S: AsRef<str>,
        F: FnMut(ResolveProgress),
    {
        let mut seen = HashSet::new();
        let planned: Vec<(&str, Option<AddressKey>)> = addresses
            .iter()
            .map(AsRef::as_ref)
            .filter_map(|address| match AddressKey::normalise(address) {
                None => Some((address, None)),
                Some(key) => seen.insert(key.clone()).then_some((address, Some(key))),
            })
            .collect();
        let total = planned.iter().filter(|(_, key)| key.is_some()).count();

        let mut report = ResolveAllReport {
            total,
            ..ResolveAllReport::default()
        };
        let mut current = 0;
        for (address, key) in planned {
            let Some(key) = key else {
                report.outcomes.push(Err(ResolveFailure {
                    address: address.to_owned(),
                    error: ResolveError::EmptyAddress,
                }));
                continue;
            };
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let result = match self.resolve_key(address, key, cancel.cancelled()).await {
                Step::Done(result) => result,
                Step::Interrupted(()) => {
                    report.cancelled = true;
                    break;
                }
            };
            if let Err(error) = &result {
                log::warn!("{error}");
            }
            report.outcomes.push(result.map_err(|error| ResolveFailure {
                address: address.to_owned(),
                error,
            }));
            current += 1;
            on_progress(ResolveProgress { current, total });
        }

        log::info!(
            "resolved {} of {total} addresses ({} failed{})",
            report.resolved_count(),
            report.failed_count(),
            if report.cancelled { ", cancelled" } else { "" }
        );
        report
    }

    /// Resolve `key`, abandoning the attempt as soon as `interrupt` completes.
    async fn resolve_key<I>(
        &self,
        address: &str,
        key: AddressKey,
        interrupt: impl Future<Output = I>,
    ) -> Step<I> {
        if let Some(found) = self.cached(&key) {
            log::debug!("cache hit for {key}");
            return Step::Done(Ok(ResolvedAddress::from_match(address, key, found, true)));
        }

        let mut interrupt = pin!(interrupt);
        let mut last_call = tokio::select! {
            biased;
            reason = &mut interrupt => return Step::Interrupted(reason),
            guard = self.last_call.lock() => guard,
        };

        // Another caller may have resolved this key while we waited.
        if let Some(found) = self.cached(&key) {
            log::debug!("cache hit for {key} after waiting");
            return Step::Done(Ok(ResolvedAddress::from_match(address, key, found, true)));
        }

        if let Some(previous) = *last_call {
            tokio::select! {
                biased;
                reason = &mut interrupt => return Step::Interrupted(reason),
                () = sleep_until(previous + self.config.min_interval) => {}
            }
        }

        log::debug!("geocoding {key}");
        let searched = tokio::select! {
            biased;
            reason = &mut interrupt => {
                *last_call = Some(Instant::now());
                return Step::Interrupted(reason);
            }
            searched = self.geocoder.search(address.trim()) => searched,
        };
        // Spacing runs from the end of one call to the start of the next.
        *last_call = Some(Instant::now());
        drop(last_call);

        Step::Done(match searched {
            Ok(Some(found)) => {
                if let Err(err) = self.cache.put(&key, &found) {
                    log::warn!("{err}; {key} will be looked up again next run");
                }
                Ok(ResolvedAddress::from_match(address, key, found, false))
            }
            Ok(None) => Err(ResolveError::NotFound {
                address: address.to_owned(),
            }),
            Err(source) => Err(ResolveError::Provider {
                address: address.to_owned(),
                source,
            }),
        })
    }

    fn cached(&self, key: &AddressKey) -> Option<GeocodeMatch> {
        match self.cache.get(key) {
            Ok(found) => found,
            Err(err) => {
                log::warn!("{err}; treating {key} as a cache miss");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests;
