//! Compute travel times and routes between coordinates.
//!
//! The [`TravelTimeProvider`] trait abstracts the two routing calls the
//! planner needs: a rectangular [`DurationMatrix`] between two point sets and
//! the [`RouteGeometry`] of an ordered stop sequence. Both are asynchronous so
//! adapters can perform network I/O without blocking.
//!
//! Unreachable matrix cells are `None` and never confused with a zero
//! duration.

mod error;
mod matrix;
mod provider;
mod route;

pub use error::TravelTimeError;
pub use matrix::DurationMatrix;
pub use provider::TravelTimeProvider;
pub use route::{RouteGeometry, RouteLeg};
