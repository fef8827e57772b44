//! Travel-time provider trait.

use async_trait::async_trait;

use crate::Coordinate;

use super::{DurationMatrix, RouteGeometry, TravelTimeError};

/// Fetch driving times and routes from a routing backend.
///
/// Implementations must honour the shape contracts:
///
/// - [`durations`](Self::durations) returns an `origins.len() ×
///   destinations.len()` matrix from a single batched request, with `None`
///   for cells that have no path, and fails with
///   [`TravelTimeError::EmptyInput`] when either slice is empty.
/// - [`route`](Self::route) returns an empty [`RouteGeometry`] without any
///   external call for fewer than two stops, and `stops.len() - 1` legs
///   otherwise.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use teamroute_core::{
///     Coordinate, DurationMatrix, RouteGeometry, TravelTimeError, TravelTimeProvider,
/// };
///
/// struct MinuteProvider;
///
/// #[async_trait]
/// impl TravelTimeProvider for MinuteProvider {
///     async fn durations(
///         &self,
///         origins: &[Coordinate],
///         destinations: &[Coordinate],
///     ) -> Result<DurationMatrix, TravelTimeError> {
///         if origins.is_empty() || destinations.is_empty() {
///             return Err(TravelTimeError::EmptyInput);
///         }
///         DurationMatrix::from_rows(vec![
///             vec![Some(Duration::from_secs(60)); destinations.len()];
///             origins.len()
///         ])
///     }
///
///     async fn route(&self, _stops: &[Coordinate]) -> Result<RouteGeometry, TravelTimeError> {
///         Ok(RouteGeometry::empty())
///     }
/// }
/// ```
#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    /// Return the travel-time matrix from every origin to every destination.
    async fn durations(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<DurationMatrix, TravelTimeError>;

    /// Return the route through `stops` in the given order.
    async fn route(&self, stops: &[Coordinate]) -> Result<RouteGeometry, TravelTimeError>;
}

#[async_trait]
impl<T> TravelTimeProvider for &T
where
    T: TravelTimeProvider + ?Sized,
{
    async fn durations(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<DurationMatrix, TravelTimeError> {
        (**self).durations(origins, destinations).await
    }

    async fn route(&self, stops: &[Coordinate]) -> Result<RouteGeometry, TravelTimeError> {
        (**self).route(stops).await
    }
}
