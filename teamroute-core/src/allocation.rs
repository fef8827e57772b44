//! Nearest-worker assignment and day batching.
//!
//! Each resolved job goes to the worker with the strictly shortest reachable
//! travel time from home; equal times keep the worker listed first in the
//! [`Team`]. Each worker's jobs are then sorted by that travel time and cut
//! into consecutive batches of at most [`DayCapacity`] jobs, so "Day 1" holds
//! the closest work. The scheme is greedy and deterministic: it makes one
//! matrix request and does not balance load between workers.

use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use thiserror::Error;

use crate::{Coordinate, DurationMatrix, Job, Team, TravelTimeError, TravelTimeProvider};

/// Jobs per worker per day unless configured otherwise.
pub const DEFAULT_DAY_CAPACITY: usize = 10;

/// Maximum number of jobs in one day batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayCapacity(NonZeroUsize);

impl DayCapacity {
    /// Capacity of `jobs` per day; `None` for zero.
    #[must_use]
    pub const fn new(jobs: usize) -> Option<Self> {
        match NonZeroUsize::new(jobs) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// The capacity as a plain number.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for DayCapacity {
    fn default() -> Self {
        Self(NonZeroUsize::MIN.saturating_add(DEFAULT_DAY_CAPACITY - 1))
    }
}

/// One-based working day within a worker's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Day(u32);

impl Day {
    /// Day for a zero-based batch index.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(
            u32::try_from(index)
                .unwrap_or(u32::MAX)
                .saturating_add(1),
        )
    }

    /// The one-based day number.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Day {}", self.0)
    }
}

/// Outcome of allocation for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// The job belongs to a worker's day batch.
    Assigned {
        /// Id of the nearest worker.
        worker_id: String,
        /// Travel time from that worker's home.
        travel_time: Duration,
        /// Batch the job was placed in.
        day: Day,
    },
    /// No worker can reach the job.
    Unassigned,
}

impl Assignment {
    /// Assigned worker id, if any.
    #[must_use]
    pub fn worker_id(&self) -> Option<&str> {
        match self {
            Self::Assigned { worker_id, .. } => Some(worker_id),
            Self::Unassigned => None,
        }
    }

    /// Travel time from the assigned worker's home, if any.
    #[must_use]
    pub const fn travel_time(&self) -> Option<Duration> {
        match self {
            Self::Assigned { travel_time, .. } => Some(*travel_time),
            Self::Unassigned => None,
        }
    }

    /// Day batch, if any.
    #[must_use]
    pub const fn day(&self) -> Option<Day> {
        match self {
            Self::Assigned { day, .. } => Some(*day),
            Self::Unassigned => None,
        }
    }
}

/// A resolved job annotated with its assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocatedJob {
    /// The job as supplied.
    pub job: Job,
    /// Where it went.
    pub assignment: Assignment,
}

/// One worker's jobs for one day, closest first.
#[derive(Debug, Clone, PartialEq)]
pub struct DayBatch {
    /// Owning worker.
    pub worker_id: String,
    /// Day label.
    pub day: Day,
    /// Jobs in non-decreasing travel time from home.
    pub jobs: Vec<AllocatedJob>,
}

impl DayBatch {
    /// Job coordinates in visiting order.
    pub fn stops(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.jobs.iter().filter_map(|allocated| allocated.job.coordinate)
    }

    /// Number of jobs in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the batch holds no jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Result of one allocation run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Allocation {
    jobs: Vec<AllocatedJob>,
    batches: Vec<DayBatch>,
    excluded: Vec<Job>,
}

impl Allocation {
    /// Resolved jobs in input order.
    #[must_use]
    pub fn jobs(&self) -> &[AllocatedJob] {
        &self.jobs
    }

    /// Day batches grouped by worker in team order, then by day.
    #[must_use]
    pub fn batches(&self) -> &[DayBatch] {
        &self.batches
    }

    /// Batches belonging to one worker.
    pub fn batches_for<'a>(&'a self, worker_id: &'a str) -> impl Iterator<Item = &'a DayBatch> {
        self.batches
            .iter()
            .filter(move |batch| batch.worker_id == worker_id)
    }

    /// Jobs that no worker can reach.
    pub fn unassigned(&self) -> impl Iterator<Item = &AllocatedJob> {
        self.jobs
            .iter()
            .filter(|allocated| allocated.assignment == Assignment::Unassigned)
    }

    /// Jobs left out because their address never resolved.
    #[must_use]
    pub fn excluded(&self) -> &[Job] {
        &self.excluded
    }

    /// Assignment for the job with `job_id`.
    #[must_use]
    pub fn assignment_for(&self, job_id: &str) -> Option<&Assignment> {
        self.jobs
            .iter()
            .find(|allocated| allocated.job.id == job_id)
            .map(|allocated| &allocated.assignment)
    }
}

/// Errors returned by [`allocate`] and [`assign_with_matrix`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The travel-time matrix could not be fetched.
    #[error("failed to fetch travel times: {0}")]
    Routing(#[from] TravelTimeError),
    /// The matrix does not match the team and job counts.
    #[error("travel-time matrix is {actual:?}, expected {expected:?} (workers × jobs)")]
    MatrixShape {
        /// `(workers, resolved jobs)`.
        expected: (usize, usize),
        /// Shape the provider returned.
        actual: (usize, usize),
    },
}

/// Assign every resolved job in `jobs` to a worker and batch by day.
///
/// Makes a single [`TravelTimeProvider::durations`] request from the team's
/// homes to the resolved job coordinates. Unresolved jobs are returned in
/// [`Allocation::excluded`]. When nothing is resolved no request is made.
///
/// # Errors
///
/// Any provider failure or a wrongly shaped matrix fails the whole call; no
/// partial allocation is produced.
pub async fn allocate<P>(
    provider: &P,
    team: &Team,
    jobs: &[Job],
    capacity: DayCapacity,
) -> Result<Allocation, AllocationError>
where
    P: TravelTimeProvider + ?Sized,
{
    let destinations: Vec<Coordinate> = jobs.iter().filter_map(|job| job.coordinate).collect();
    if destinations.is_empty() {
        log::info!("no resolved jobs to allocate");
        return Ok(Allocation {
            excluded: jobs.to_vec(),
            ..Allocation::default()
        });
    }
    let origins: Vec<Coordinate> = team.homes().collect();
    log::debug!(
        "requesting {}x{} travel-time matrix",
        origins.len(),
        destinations.len()
    );
    let matrix = provider.durations(&origins, &destinations).await?;
    assign_with_matrix(team, jobs, &matrix, capacity)
}

/// Allocate using a matrix that has already been fetched.
///
/// `matrix` rows follow team order and its columns follow the resolved jobs
/// in `jobs`, in input order.
///
/// # Errors
///
/// Returns [`AllocationError::MatrixShape`] when the matrix is not exactly
/// workers × resolved jobs.
pub fn assign_with_matrix(
    team: &Team,
    jobs: &[Job],
    matrix: &DurationMatrix,
    capacity: DayCapacity,
) -> Result<Allocation, AllocationError> {
    let (resolved, unresolved): (Vec<&Job>, Vec<&Job>) =
        jobs.iter().partition(|job| job.is_resolved());
    let excluded: Vec<Job> = unresolved.into_iter().cloned().collect();
    if resolved.is_empty() {
        return Ok(Allocation {
            excluded,
            ..Allocation::default()
        });
    }

    let expected = (team.len(), resolved.len());
    if matrix.shape() != expected {
        return Err(AllocationError::MatrixShape {
            expected,
            actual: matrix.shape(),
        });
    }

    let nearest: Vec<Option<(usize, Duration)>> = (0..resolved.len())
        .map(|col| nearest_worker(matrix, col))
        .collect();

    let mut days: Vec<Option<Day>> = vec![None; resolved.len()];
    let mut batch_plan: Vec<(usize, Day, Vec<usize>)> = Vec::new();
    for row in 0..team.len() {
        let mut mine: Vec<(usize, Duration)> = nearest
            .iter()
            .enumerate()
            .filter_map(|(col, best)| match best {
                Some((owner, time)) if *owner == row => Some((col, *time)),
                _ => None,
            })
            .collect();
        // Stable: equal travel times keep input order.
        mine.sort_by_key(|&(_, time)| time);
        for (index, chunk) in mine.chunks(capacity.get()).enumerate() {
            let day = Day::from_index(index);
            let cols: Vec<usize> = chunk.iter().map(|&(col, _)| col).collect();
            for &col in &cols {
                if let Some(slot) = days.get_mut(col) {
                    *slot = Some(day);
                }
            }
            batch_plan.push((row, day, cols));
        }
    }

    let allocated: Vec<AllocatedJob> = resolved
        .iter()
        .zip(nearest.iter().zip(&days))
        .map(|(job, (best, day))| AllocatedJob {
            job: (*job).clone(),
            assignment: assignment(team, *best, *day),
        })
        .collect();

    let batches: Vec<DayBatch> = batch_plan
        .into_iter()
        .filter_map(|(row, day, cols)| {
            let worker = team.workers().get(row)?;
            Some(DayBatch {
                worker_id: worker.id.clone(),
                day,
                jobs: cols
                    .iter()
                    .filter_map(|&col| allocated.get(col).cloned())
                    .collect(),
            })
        })
        .collect();

    let allocation = Allocation {
        jobs: allocated,
        batches,
        excluded,
    };
    log::info!(
        "allocated {} jobs into {} day batches ({} unassigned, {} excluded)",
        allocation.jobs.len(),
        allocation.batches.len(),
        allocation.unassigned().count(),
        allocation.excluded.len()
    );
    Ok(allocation)
}

/// Row with the strictly smallest reachable time in `col`; first row wins ties.
fn nearest_worker(matrix: &DurationMatrix, col: usize) -> Option<(usize, Duration)> {
    matrix
        .column(col)
        .enumerate()
        .fold(None, |best, (row, cell)| match (best, cell) {
            (_, None) => best,
            (Some((_, best_time)), Some(time)) if time >= best_time => best,
            (_, Some(time)) => Some((row, time)),
        })
}

fn assignment(team: &Team, best: Option<(usize, Duration)>, day: Option<Day>) -> Assignment {
    match (best, day) {
        (Some((row, travel_time)), Some(batch_day)) => team.workers().get(row).map_or(
            Assignment::Unassigned,
            |worker| Assignment::Assigned {
                worker_id: worker.id.clone(),
                travel_time,
                day: batch_day,
            },
        ),
        _ => Assignment::Unassigned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Worker;
    use crate::test_support::StubTravelTimeProvider;
    use rstest::{fixture, rstest};

    #[fixture]
    fn team() -> Team {
        Team::new(vec![
            Worker::new(
                "w1",
                "Worker 1",
                Coordinate::new(51.50, -0.10).expect("valid"),
                "blue",
            ),
            Worker::new(
                "w2",
                "Worker 2",
                Coordinate::new(51.52, 0.05).expect("valid"),
                "green",
            ),
        ])
        .expect("valid team")
    }

    fn jobs(count: usize) -> Vec<Job> {
        let position = Coordinate::new(51.51, -0.02).expect("valid");
        (1..=count)
            .map(|n| Job::resolved(format!("job{n}"), format!("AB{n} 1CD"), position))
            .collect()
    }

    fn day(number: usize) -> Day {
        Day::from_index(number - 1)
    }

    #[rstest]
    fn default_capacity_is_ten() {
        assert_eq!(DayCapacity::default().get(), DEFAULT_DAY_CAPACITY);
        assert!(DayCapacity::new(0).is_none());
    }

    #[rstest]
    fn day_labels_are_one_based() {
        assert_eq!(Day::from_index(0).to_string(), "Day 1");
        assert_eq!(Day::from_index(2).number(), 3);
    }

    #[rstest]
    fn assigns_each_job_to_column_minimum(team: Team) {
        let matrix = DurationMatrix::from_seconds(vec![
            vec![Some(300.0), Some(1200.0), Some(400.0)],
            vec![Some(900.0), Some(200.0), Some(250.0)],
        ])
        .expect("valid matrix");

        let allocation = assign_with_matrix(&team, &jobs(3), &matrix, DayCapacity::default())
            .expect("allocation");

        let owners: Vec<Option<&str>> = allocation
            .jobs()
            .iter()
            .map(|allocated| allocated.assignment.worker_id())
            .collect();
        assert_eq!(owners, [Some("w1"), Some("w2"), Some("w2")]);

        let w2: Vec<&DayBatch> = allocation.batches_for("w2").collect();
        assert_eq!(w2.len(), 1);
        let ids: Vec<&str> = w2
            .first()
            .map(|batch| batch.jobs.iter().map(|a| a.job.id.as_str()).collect())
            .unwrap_or_default();
        assert_eq!(ids, ["job2", "job3"]);
    }

    #[rstest]
    fn ties_go_to_first_worker(team: Team) {
        let matrix =
            DurationMatrix::from_seconds(vec![vec![Some(500.0)], vec![Some(500.0)]]).expect("valid");
        let allocation =
            assign_with_matrix(&team, &jobs(1), &matrix, DayCapacity::default()).expect("ok");
        assert_eq!(allocation.assignment_for("job1").and_then(Assignment::worker_id), Some("w1"));
    }

    #[rstest]
    fn unreachable_column_is_unassigned(team: Team) {
        let matrix = DurationMatrix::from_seconds(vec![vec![None, Some(10.0)], vec![None, None]])
            .expect("valid");
        let allocation =
            assign_with_matrix(&team, &jobs(2), &matrix, DayCapacity::default()).expect("ok");
        let job1 = allocation.assignment_for("job1").expect("job1 present");
        assert_eq!(job1, &Assignment::Unassigned);
        assert_eq!(job1.day(), None);
        assert_eq!(allocation.unassigned().count(), 1);
    }

    #[rstest]
    fn zero_seconds_beats_unreachable(team: Team) {
        let matrix =
            DurationMatrix::from_seconds(vec![vec![None], vec![Some(0.0)]]).expect("valid");
        let allocation =
            assign_with_matrix(&team, &jobs(1), &matrix, DayCapacity::default()).expect("ok");
        let assignment = allocation.assignment_for("job1").expect("present");
        assert_eq!(assignment.worker_id(), Some("w2"));
        assert_eq!(assignment.travel_time(), Some(Duration::ZERO));
    }

    #[rstest]
    fn splits_twenty_three_jobs_into_three_days(team: Team) {
        let row: Vec<Option<f64>> = (1..=23_u32).rev().map(|n| Some(f64::from(n))).collect();
        let matrix = DurationMatrix::from_seconds(vec![row, vec![None; 23]]).expect("valid");

        let allocation =
            assign_with_matrix(&team, &jobs(23), &matrix, DayCapacity::default()).expect("ok");

        let sizes: Vec<(Day, usize)> = allocation
            .batches_for("w1")
            .map(|batch| (batch.day, batch.len()))
            .collect();
        assert_eq!(sizes, [(day(1), 10), (day(2), 10), (day(3), 3)]);
        // Job 23 is closest (1s), so it leads day 1.
        let first = allocation
            .batches()
            .first()
            .and_then(|batch| batch.jobs.first())
            .map(|allocated| allocated.job.id.as_str());
        assert_eq!(first, Some("job23"));
        assert_eq!(
            allocation.assignment_for("job1").and_then(Assignment::day),
            Some(day(3))
        );
    }

    #[rstest]
    fn equal_times_keep_input_order_within_a_day(team: Team) {
        let matrix = DurationMatrix::from_seconds(vec![
            vec![Some(60.0), Some(60.0), Some(30.0)],
            vec![None, None, None],
        ])
        .expect("valid");
        let allocation =
            assign_with_matrix(&team, &jobs(3), &matrix, DayCapacity::default()).expect("ok");
        let ids: Vec<&str> = allocation
            .batches()
            .iter()
            .flat_map(|batch| batch.jobs.iter().map(|a| a.job.id.as_str()))
            .collect();
        assert_eq!(ids, ["job3", "job1", "job2"]);
    }

    #[rstest]
    fn rejects_wrongly_shaped_matrix(team: Team) {
        let matrix = DurationMatrix::from_seconds(vec![vec![Some(1.0)]]).expect("valid");
        let err = assign_with_matrix(&team, &jobs(2), &matrix, DayCapacity::default())
            .expect_err("shape mismatch");
        assert_eq!(
            err,
            AllocationError::MatrixShape {
                expected: (2, 2),
                actual: (1, 1)
            }
        );
    }

    #[rstest]
    fn unresolved_jobs_are_excluded(team: Team) {
        let mut input = jobs(1);
        input.push(Job::unresolved("lost", "NOWHERE"));
        let matrix =
            DurationMatrix::from_seconds(vec![vec![Some(5.0)], vec![Some(6.0)]]).expect("valid");
        let allocation =
            assign_with_matrix(&team, &input, &matrix, DayCapacity::default()).expect("ok");
        assert_eq!(allocation.jobs().len(), 1);
        assert_eq!(
            allocation.excluded().iter().map(|j| j.id.as_str()).collect::<Vec<_>>(),
            ["lost"]
        );
        assert!(allocation.assignment_for("lost").is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn allocate_skips_provider_without_resolved_jobs(team: Team) {
        let provider = StubTravelTimeProvider::with_seconds(Vec::new());
        let allocation = allocate(
            &provider,
            &team,
            &[Job::unresolved("j", "??")],
            DayCapacity::default(),
        )
        .await
        .expect("empty allocation");
        assert!(allocation.jobs().is_empty());
        assert_eq!(allocation.excluded().len(), 1);
        assert_eq!(provider.matrix_calls(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn allocate_propagates_routing_failure(team: Team) {
        let provider = StubTravelTimeProvider::with_error(TravelTimeError::ParseError {
            message: "OSRM response missing durations array".into(),
        });
        let err = allocate(&provider, &team, &jobs(2), DayCapacity::default())
            .await
            .expect_err("routing failure");
        assert!(matches!(
            err,
            AllocationError::Routing(TravelTimeError::ParseError { .. })
        ));
    }
}
