//! Facade crate for the teamroute field-team planner.
//!
//! This crate re-exports the core domain types and algorithms, and exposes the
//! HTTP providers, SQLite cache and address resolver behind the
//! `http-providers` feature.

#![forbid(unsafe_code)]

pub use teamroute_core::{
    AddressKey, AllocatedJob, Allocation, AllocationError, Assignment, CacheError, Coordinate,
    CoordinateError, Day, DayBatch, DayCapacity, DurationMatrix, ExportRow, GeocodeCache,
    GeocodeError, GeocodeMatch, Geocoder, ImportOutcome, Job, MemoryGeocodeCache, RouteGeometry,
    RouteLeg, RouteResult, RouteSequencer, SequencedBatch, Team, TeamError, TravelTimeError,
    TravelTimeProvider, Worker, allocate, assign_with_matrix,
};

#[cfg(feature = "http-providers")]
pub use teamroute_data::{
    cache::SqliteGeocodeCache,
    geocoding::{AddressResolver, NominatimGeocoder, ResolveAllReport, ResolveError},
    routing::OsrmTravelTimeProvider,
};
