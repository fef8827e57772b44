//! Route sequencing for day batches.
//!
//! A batch is driven as `home → job 1 → … → job n → home`, keeping the
//! proximity order chosen by allocation. Visit order is never re-optimised.

use std::iter;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use geo::LineString;

use crate::{
    Allocation, Coordinate, Day, DayBatch, RouteLeg, Team, TravelTimeError, TravelTimeProvider,
    Worker,
};

/// Batches routed at once by [`RouteSequencer::sequence_all`] by default.
pub const DEFAULT_ROUTE_CONCURRENCY: usize = 4;

/// Route for one worker's day.
///
/// When a line is present there is one leg per consecutive pair of
/// [`stops`](Self::stops), i.e. `jobs + 1` legs. When the provider returned
/// no geometry both `geometry` and `legs` are empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    /// Worker driving the route.
    pub worker_id: String,
    /// Day the route belongs to.
    pub day: Day,
    /// Home, each job in order, home again.
    pub stops: Vec<Coordinate>,
    /// Road polyline (`x` = longitude, `y` = latitude).
    pub geometry: LineString<f64>,
    /// Per-leg durations and distances.
    pub legs: Vec<RouteLeg>,
}

impl RouteResult {
    /// Whether there is a line to display.
    #[must_use]
    pub fn has_route(&self) -> bool {
        !self.geometry.0.is_empty()
    }

    /// Number of job stops (excluding home at either end).
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.stops.len().saturating_sub(2)
    }

    /// Leg arriving at the job at `index`; leg 0 is home → first job.
    #[must_use]
    pub fn arrival_leg(&self, index: usize) -> Option<&RouteLeg> {
        if index >= self.job_count() {
            return None;
        }
        self.legs.get(index)
    }

    /// Final leg from the last job back home.
    #[must_use]
    pub fn return_leg(&self) -> Option<&RouteLeg> {
        self.legs.get(self.job_count())
    }

    /// Total driving time, zero when there is no route.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.legs.iter().map(|leg| leg.duration).sum()
    }
}

/// Routing outcome for one batch of [`RouteSequencer::sequence_all`].
///
/// A failed route only affects its own batch; the allocation stays valid.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedBatch {
    /// Worker owning the batch.
    pub worker_id: String,
    /// Day of the batch.
    pub day: Day,
    /// Route, or the error that prevented it.
    pub outcome: Result<RouteResult, TravelTimeError>,
}

/// Requests routes for day batches from a [`TravelTimeProvider`].
///
/// # Examples
///
/// ```
/// use teamroute_core::RouteSequencer;
/// use teamroute_core::test_support::StubTravelTimeProvider;
///
/// let provider = StubTravelTimeProvider::with_seconds(Vec::new());
/// let sequencer = RouteSequencer::new(&provider).with_concurrency(2);
/// assert_eq!(sequencer.concurrency(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RouteSequencer<P> {
    provider: P,
    concurrency: usize,
}

impl<P> RouteSequencer<P>
where
    P: TravelTimeProvider,
{
    /// Create a sequencer routing [`DEFAULT_ROUTE_CONCURRENCY`] batches at once.
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            concurrency: DEFAULT_ROUTE_CONCURRENCY,
        }
    }

    /// Route up to `concurrency` batches at once (at least one).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Configured degree of concurrency.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Route one batch starting and ending at `worker`'s home.
    ///
    /// # Errors
    ///
    /// Propagates provider failures and rejects a non-empty route whose leg
    /// count is not `jobs + 1` with [`TravelTimeError::MalformedResponse`].
    pub async fn sequence(
        &self,
        worker: &Worker,
        batch: &DayBatch,
    ) -> Result<RouteResult, TravelTimeError> {
        let stops: Vec<Coordinate> = iter::once(worker.home)
            .chain(batch.stops())
            .chain(iter::once(worker.home))
            .collect();
        let route = self.provider.route(&stops).await?;

        let (geometry, legs) = if route.is_empty() {
            log::debug!(
                "no route geometry for {} {}; batch stays allocated",
                worker.id,
                batch.day
            );
            (LineString::new(Vec::new()), Vec::new())
        } else {
            let expected = stops.len().saturating_sub(1);
            if route.legs.len() != expected {
                return Err(TravelTimeError::MalformedResponse {
                    message: format!(
                        "route for {} {} has {} legs, expected {expected}",
                        worker.id,
                        batch.day,
                        route.legs.len()
                    ),
                });
            }
            (route.geometry, route.legs)
        };

        Ok(RouteResult {
            worker_id: worker.id.clone(),
            day: batch.day,
            stops,
            geometry,
            legs,
        })
    }

    /// Route every batch of `allocation`, several at a time.
    ///
    /// Results come back in [`Allocation::batches`] order regardless of
    /// completion order. Batches whose worker is not in `team` are skipped.
    pub async fn sequence_all(&self, team: &Team, allocation: &Allocation) -> Vec<SequencedBatch> {
        let pending: Vec<(usize, &Worker, &DayBatch)> = allocation
            .batches()
            .iter()
            .enumerate()
            .filter_map(|(index, batch)| {
                let Some(worker) = team.get(&batch.worker_id) else {
                    log::warn!("skipping batch for unknown worker {}", batch.worker_id);
                    return None;
                };
                Some((index, worker, batch))
            })
            .collect();

        let mut finished: Vec<(usize, SequencedBatch)> = stream::iter(pending)
            .map(|(index, worker, batch)| async move {
                let outcome = self.sequence(worker, batch).await;
                if let Err(err) = &outcome {
                    log::warn!("route for {} {} unavailable: {err}", worker.id, batch.day);
                }
                (
                    index,
                    SequencedBatch {
                        worker_id: worker.id.clone(),
                        day: batch.day,
                        outcome,
                    },
                )
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        finished.sort_by_key(|(index, _)| *index);
        finished.into_iter().map(|(_, batch)| batch).collect()
    }
}
