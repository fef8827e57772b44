//! Core domain types and algorithms for the teamroute planner.
//!
//! The crate allocates address-based jobs to a team of mobile workers. Each
//! job goes to the worker with the shortest travel time from home, and each
//! worker's jobs are cut into capacity-bounded day batches that are then
//! routed as round trips from home.
//!
//! External services sit behind the [`Geocoder`], [`GeocodeCache`] and
//! [`TravelTimeProvider`] traits; concrete HTTP and SQLite adapters live in
//! `teamroute-data`. Everything here is deterministic given the provider's
//! answers.

mod allocation;
mod coordinate;
mod geocode;
mod job;
mod report;
mod sequence;
mod team;
mod travel_time;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use allocation::{
    AllocatedJob, Allocation, AllocationError, Assignment, DEFAULT_DAY_CAPACITY, Day, DayBatch,
    DayCapacity, allocate, assign_with_matrix,
};
pub use coordinate::{Coordinate, CoordinateError};
pub use geocode::{
    AddressKey, CacheError, GeocodeCache, GeocodeError, GeocodeMatch, Geocoder,
    MemoryGeocodeCache,
};
pub use job::Job;
pub use report::{ExportRow, ImportOutcome, UNASSIGNED_LABEL};
pub use sequence::{DEFAULT_ROUTE_CONCURRENCY, RouteResult, RouteSequencer, SequencedBatch};
pub use team::{Team, TeamError, Worker};
pub use travel_time::{DurationMatrix, RouteGeometry, RouteLeg, TravelTimeError, TravelTimeProvider};
