//! [`TravelTimeProvider`] backed by OSRM's Table and Route services.
//!
//! A matrix request sends origins then destinations as one coordinate list
//! and selects them with `sources` and `destinations` indices. A route
//! request asks for the full GeoJSON overview so the polyline can be drawn.

use std::time::Duration;

use async_trait::async_trait;
use geo::{Coord, LineString};
use reqwest::Client;
use serde::de::DeserializeOwned;
use teamroute_core::{
    Coordinate, DurationMatrix, RouteGeometry, RouteLeg, TravelTimeError, TravelTimeProvider,
};
use thiserror::Error;

use super::osrm::{RouteResponse, TableResponse};

/// Default user agent for OSRM requests.
pub const DEFAULT_USER_AGENT: &str = "teamroute/0.1";

/// Public OSRM demo server.
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

/// Routing profile used unless configured otherwise.
pub const DEFAULT_PROFILE: &str = "driving";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Error building an [`OsrmTravelTimeProvider`].
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Configuration for [`OsrmTravelTimeProvider`].
#[derive(Debug, Clone)]
pub struct OsrmConfig {
    /// Service root, e.g. `"http://localhost:5000"`.
    pub base_url: String,
    /// Routing profile segment of the URL.
    pub profile: String,
    /// Connect and request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OSRM_URL.to_owned(),
            profile: DEFAULT_PROFILE.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl OsrmConfig {
    /// Configuration for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the routing profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// OSRM-backed travel times and routes.
///
/// Null, negative or non-finite matrix cells become unreachable. Service
/// failures are reported as-is; there is no straight-line fallback.
#[derive(Debug, Clone)]
pub struct OsrmTravelTimeProvider {
    client: Client,
    config: OsrmConfig,
}

impl OsrmTravelTimeProvider {
    /// Provider for `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(OsrmConfig::new(base_url))
    }

    /// Provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_config(config: OsrmConfig) -> Result<Self, ProviderBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        Ok(Self { client, config })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn service_url(&self, service: &str, points: impl Iterator<Item = Coordinate>) -> String {
        let coords = points
            .map(|point| format!("{},{}", point.longitude(), point.latitude()))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/{service}/v1/{}/{coords}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile
        )
    }

    fn table_url(&self, origins: &[Coordinate], destinations: &[Coordinate]) -> String {
        let all = origins.iter().chain(destinations).copied();
        let sources = index_list(0..origins.len());
        let targets = index_list(origins.len()..origins.len() + destinations.len());
        format!(
            "{}?sources={sources}&destinations={targets}",
            self.service_url("table", all)
        )
    }

    fn route_url(&self, stops: &[Coordinate]) -> String {
        format!(
            "{}?overview=full&geometries=geojson",
            self.service_url("route", stops.iter().copied())
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TravelTimeError> {
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        response
            .json()
            .await
            .map_err(|err| TravelTimeError::ParseError {
                message: err.to_string(),
            })
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> TravelTimeError {
        if error.is_timeout() {
            return TravelTimeError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return TravelTimeError::HttpError {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        TravelTimeError::NetworkError {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

fn index_list(indices: std::ops::Range<usize>) -> String {
    indices
        .map(|index| index.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Turn a Table response into a matrix of the requested shape.
fn convert_table(
    response: TableResponse,
    expected: (usize, usize),
) -> Result<DurationMatrix, TravelTimeError> {
    if !response.is_ok() {
        return Err(TravelTimeError::ServiceError {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }
    let durations = response
        .durations
        .ok_or_else(|| TravelTimeError::MalformedResponse {
            message: "OSRM table response missing durations".to_owned(),
        })?;
    let matrix = DurationMatrix::from_seconds(durations)?;
    if matrix.shape() != expected {
        return Err(TravelTimeError::MalformedResponse {
            message: format!(
                "OSRM table is {:?}, expected {expected:?}",
                matrix.shape()
            ),
        });
    }
    Ok(matrix)
}

/// Turn a Route response into geometry and legs for `stop_count` stops.
fn convert_route(
    response: RouteResponse,
    stop_count: usize,
) -> Result<RouteGeometry, TravelTimeError> {
    if !response.is_ok() {
        return Err(TravelTimeError::ServiceError {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }
    let Some(route) = response.routes.into_iter().next() else {
        return Ok(RouteGeometry::empty());
    };
    let points: Vec<Coord<f64>> = route
        .geometry
        .map(|line| {
            line.coordinates
                .into_iter()
                .map(|[x, y]| Coord { x, y })
                .collect()
        })
        .unwrap_or_default();
    if points.is_empty() {
        return Ok(RouteGeometry::empty());
    }

    let expected = stop_count.saturating_sub(1);
    if route.legs.len() != expected {
        return Err(TravelTimeError::MalformedResponse {
            message: format!(
                "OSRM route has {} legs for {stop_count} stops",
                route.legs.len()
            ),
        });
    }
    let legs = route
        .legs
        .into_iter()
        .enumerate()
        .map(|(index, leg)| {
            let duration = Duration::try_from_secs_f64(leg.duration).map_err(|_| {
                TravelTimeError::MalformedResponse {
                    message: format!("leg {index} has invalid duration {}", leg.duration),
                }
            })?;
            Ok(RouteLeg {
                duration,
                distance_meters: leg.distance,
            })
        })
        .collect::<Result<Vec<_>, TravelTimeError>>()?;

    Ok(RouteGeometry {
        geometry: LineString::new(points),
        legs,
    })
}

#[async_trait]
impl TravelTimeProvider for OsrmTravelTimeProvider {
    async fn durations(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<DurationMatrix, TravelTimeError> {
        if origins.is_empty() || destinations.is_empty() {
            return Err(TravelTimeError::EmptyInput);
        }
        let url = self.table_url(origins, destinations);
        let response: TableResponse = self.get_json(&url).await?;
        convert_table(response, (origins.len(), destinations.len()))
    }

    async fn route(&self, stops: &[Coordinate]) -> Result<RouteGeometry, TravelTimeError> {
        if stops.len() < 2 {
            return Ok(RouteGeometry::empty());
        }
        let url = self.route_url(stops);
        let response: RouteResponse = self.get_json(&url).await?;
        convert_route(response, stops.len())
    }
}
