//! Deterministic test doubles for the provider and geocoder contracts.
//!
//! Neither double performs I/O. Both count their calls so tests can assert
//! how often the "external" service was reached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use geo::LineString;

use crate::{
    AddressKey, Coordinate, DurationMatrix, GeocodeError, GeocodeMatch, Geocoder, RouteGeometry,
    RouteLeg, TravelTimeError, TravelTimeProvider,
};

/// Stub [`TravelTimeProvider`] returning a pre-configured matrix.
///
/// Routes are synthesised from the stops: the polyline joins them in order
/// and every leg takes [`StubTravelTimeProvider::DEFAULT_LEG`] unless
/// overridden.
///
/// # Examples
///
/// ```
/// use teamroute_core::test_support::StubTravelTimeProvider;
///
/// let provider = StubTravelTimeProvider::with_seconds(vec![vec![Some(300.0), None]]);
/// assert_eq!(provider.matrix_calls(), 0);
/// ```
#[derive(Debug)]
pub struct StubTravelTimeProvider {
    matrix: Result<DurationMatrix, TravelTimeError>,
    route: RouteBehaviour,
    leg: Duration,
    matrix_calls: AtomicUsize,
    route_calls: AtomicUsize,
}

#[derive(Debug, Clone)]
enum RouteBehaviour {
    Synthesise,
    Empty,
    Fail(TravelTimeError),
    DropLastLeg,
}

impl StubTravelTimeProvider {
    /// Leg duration used for synthesised routes.
    pub const DEFAULT_LEG: Duration = Duration::from_secs(60);

    /// Distance reported for every synthesised leg.
    pub const LEG_DISTANCE_METERS: f64 = 1_000.0;

    fn new(matrix: Result<DurationMatrix, TravelTimeError>) -> Self {
        Self {
            matrix,
            route: RouteBehaviour::Synthesise,
            leg: Self::DEFAULT_LEG,
            matrix_calls: AtomicUsize::new(0),
            route_calls: AtomicUsize::new(0),
        }
    }

    /// Return `matrix` for any non-empty request.
    #[must_use]
    pub fn with_matrix(matrix: DurationMatrix) -> Self {
        Self::new(Ok(matrix))
    }

    /// Return a matrix built from raw seconds (`None` = unreachable).
    ///
    /// Ragged rows make every matrix request fail, which mimics a malformed
    /// service response.
    #[must_use]
    pub fn with_seconds(rows: Vec<Vec<Option<f64>>>) -> Self {
        Self::new(DurationMatrix::from_seconds(rows))
    }

    /// Fail every non-empty matrix request with `error`.
    #[must_use]
    pub fn with_error(error: TravelTimeError) -> Self {
        Self::new(Err(error))
    }

    /// Use `leg` for every synthesised route leg.
    #[must_use]
    pub fn with_leg_duration(mut self, leg: Duration) -> Self {
        self.leg = leg;
        self
    }

    /// Fail every route request with `error`.
    #[must_use]
    pub fn with_route_error(mut self, error: TravelTimeError) -> Self {
        self.route = RouteBehaviour::Fail(error);
        self
    }

    /// Return an empty geometry for every route request.
    #[must_use]
    pub fn with_empty_routes(mut self) -> Self {
        self.route = RouteBehaviour::Empty;
        self
    }

    /// Return one leg fewer than the stops require.
    #[must_use]
    pub fn with_short_routes(mut self) -> Self {
        self.route = RouteBehaviour::DropLastLeg;
        self
    }

    /// Number of matrix requests that reached the stub.
    #[must_use]
    pub fn matrix_calls(&self) -> usize {
        self.matrix_calls.load(Ordering::SeqCst)
    }

    /// Number of route requests with at least two stops.
    #[must_use]
    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    fn synthesise(&self, stops: &[Coordinate]) -> RouteGeometry {
        let geometry: LineString<f64> = stops.iter().map(|stop| stop.to_coord()).collect();
        let legs = stops
            .windows(2)
            .map(|_| RouteLeg {
                duration: self.leg,
                distance_meters: Self::LEG_DISTANCE_METERS,
            })
            .collect();
        RouteGeometry { geometry, legs }
    }
}

#[async_trait]
impl TravelTimeProvider for StubTravelTimeProvider {
    async fn durations(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<DurationMatrix, TravelTimeError> {
        if origins.is_empty() || destinations.is_empty() {
            return Err(TravelTimeError::EmptyInput);
        }
        self.matrix_calls.fetch_add(1, Ordering::SeqCst);
        self.matrix.clone()
    }

    async fn route(&self, stops: &[Coordinate]) -> Result<RouteGeometry, TravelTimeError> {
        if stops.len() < 2 {
            return Ok(RouteGeometry::empty());
        }
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        match &self.route {
            RouteBehaviour::Synthesise => Ok(self.synthesise(stops)),
            RouteBehaviour::Empty => Ok(RouteGeometry::empty()),
            RouteBehaviour::Fail(error) => Err(error.clone()),
            RouteBehaviour::DropLastLeg => {
                let mut route = self.synthesise(stops);
                route.legs.pop();
                Ok(route)
            }
        }
    }
}

/// Stub [`Geocoder`] answering from a fixed table.
///
/// Lookups are keyed by [`AddressKey`], so case and spacing do not matter.
/// Unknown addresses resolve to `Ok(None)`.
#[derive(Debug, Default)]
pub struct StubGeocoder {
    answers: HashMap<AddressKey, Result<GeocodeMatch, GeocodeError>>,
    queries: Mutex<Vec<String>>,
}

impl StubGeocoder {
    /// Create a geocoder that knows no addresses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `address` with `coordinate`.
    #[must_use]
    pub fn with_match(mut self, address: &str, coordinate: Coordinate) -> Self {
        if let Some(key) = AddressKey::normalise(address) {
            let display_name = format!("{address}, United Kingdom");
            self.answers.insert(
                key,
                Ok(GeocodeMatch::new(coordinate).with_display_name(display_name)),
            );
        }
        self
    }

    /// Fail lookups of `address` with `error`.
    #[must_use]
    pub fn with_error(mut self, address: &str, error: GeocodeError) -> Self {
        if let Some(key) = AddressKey::normalise(address) {
            self.answers.insert(key, Err(error));
        }
        self
    }

    /// Number of lookups that reached the stub.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Addresses looked up, in call order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn search(&self, address: &str) -> Result<Option<GeocodeMatch>, GeocodeError> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(address.to_owned());
        let Some(key) = AddressKey::normalise(address) else {
            return Ok(None);
        };
        match self.answers.get(&key) {
            Some(Ok(found)) => Ok(Some(found.clone())),
            Some(Err(error)) => Err(error.clone()),
            None => Ok(None),
        }
    }
}
