//! External service adapters for the teamroute planner.
//!
//! Responsibilities:
//! - Implement the `teamroute-core` provider traits over HTTP (OSRM for
//!   travel times and routes, Nominatim for geocoding).
//! - Persist geocoding results in SQLite so repeated runs stay offline.
//! - Orchestrate address resolution: throttling, de-duplication and
//!   cooperative cancellation.
//!
//! Boundaries:
//! - Allocation and sequencing rules live in `teamroute-core`.
//! - All network I/O is async; SQLite calls are short and run inline.

pub mod cache;
pub mod geocoding;
pub mod routing;
