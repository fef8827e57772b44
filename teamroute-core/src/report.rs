//! Flat views of an allocation for tabular export.

use std::time::Duration;

use crate::{Allocation, Assignment, Team};

/// Worker column value for jobs no worker can reach.
pub const UNASSIGNED_LABEL: &str = "Unassigned";

/// Overall result of resolving a job list.
///
/// A run with zero valid jobs is distinguishable from a partial success so
/// callers can refuse to allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ImportOutcome {
    /// Nothing resolved.
    NoneResolved,
    /// Some addresses resolved and some failed.
    Partial,
    /// Every address resolved.
    Complete,
}

impl ImportOutcome {
    /// Classify a run from its success and failure counts.
    ///
    /// # Examples
    ///
    /// ```
    /// use teamroute_core::ImportOutcome;
    ///
    /// assert_eq!(ImportOutcome::from_counts(0, 3), ImportOutcome::NoneResolved);
    /// assert_eq!(ImportOutcome::from_counts(2, 1), ImportOutcome::Partial);
    /// assert_eq!(ImportOutcome::from_counts(3, 0), ImportOutcome::Complete);
    /// ```
    #[must_use]
    pub const fn from_counts(resolved: usize, failed: usize) -> Self {
        match (resolved, failed) {
            (0, _) => Self::NoneResolved,
            (_, 0) => Self::Complete,
            _ => Self::Partial,
        }
    }

    /// Whether there is anything to allocate.
    #[must_use]
    pub const fn has_jobs(self) -> bool {
        !matches!(self, Self::NoneResolved)
    }
}

/// One row of the allocation export.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExportRow {
    /// Address as supplied.
    pub address: String,
    /// Geocoder display name, empty when unknown.
    pub display_name: String,
    /// Worker name or [`UNASSIGNED_LABEL`].
    pub worker: String,
    /// Day label such as `Day 2`, empty when unassigned.
    pub day: String,
    /// Travel time from the worker's home in whole minutes. Empty when the
    /// job is unassigned or the travel time is exactly zero.
    pub drive_minutes: Option<u64>,
}

impl ExportRow {
    /// Rows for every allocated job, in input order.
    ///
    /// Jobs assigned to a worker missing from `team` fall back to the
    /// worker id.
    #[must_use]
    pub fn from_allocation(team: &Team, allocation: &Allocation) -> Vec<Self> {
        allocation
            .jobs()
            .iter()
            .map(|allocated| {
                let job = &allocated.job;
                let (worker, day, drive_minutes) = match &allocated.assignment {
                    Assignment::Assigned {
                        worker_id,
                        travel_time,
                        day,
                    } => (
                        team.get(worker_id)
                            .map_or_else(|| worker_id.clone(), |w| w.name.clone()),
                        day.to_string(),
                        drive_minutes(*travel_time),
                    ),
                    Assignment::Unassigned => (UNASSIGNED_LABEL.to_owned(), String::new(), None),
                };
                Self {
                    address: job.raw_address.clone(),
                    display_name: job.display_name.clone().unwrap_or_default(),
                    worker,
                    day,
                    drive_minutes,
                }
            })
            .collect()
    }
}

/// A job at the worker's home leaves the cell blank.
fn drive_minutes(travel_time: Duration) -> Option<u64> {
    (!travel_time.is_zero()).then(|| whole_minutes(travel_time))
}

#[expect(
    clippy::integer_division,
    reason = "round-half-up to whole minutes is intended"
)]
fn whole_minutes(duration: Duration) -> u64 {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    millis.saturating_add(30_000) / 60_000
}
