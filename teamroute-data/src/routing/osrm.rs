//! OSRM response bodies for the Table and Route services.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#table-service> and
//! <http://project-osrm.org/docs/v5.24.0/api/#route-service>.

use serde::Deserialize;

/// Status code OSRM reports for a successful request.
pub const OK_CODE: &str = "Ok";

/// Table service response.
#[derive(Debug, Deserialize)]
pub struct TableResponse {
    /// Status code, e.g. `Ok`, `InvalidQuery` or `NoTable`.
    pub code: String,
    /// Error detail when `code` is not `Ok`.
    pub message: Option<String>,
    /// Seconds from each source to each destination; `null` when no path.
    pub durations: Option<Vec<Vec<Option<f64>>>>,
}

impl TableResponse {
    /// Whether the service reported success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == OK_CODE
    }
}

/// Route service response.
#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    /// Status code, e.g. `Ok` or `NoRoute`.
    pub code: String,
    /// Error detail when `code` is not `Ok`.
    pub message: Option<String>,
    /// Alternatives, best first. Absent on failure.
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl RouteResponse {
    /// Whether the service reported success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == OK_CODE
    }
}

/// One route alternative.
#[derive(Debug, Deserialize)]
pub struct Route {
    /// GeoJSON line string, requested with `geometries=geojson`.
    pub geometry: Option<GeoJsonLine>,
    /// One leg per consecutive pair of waypoints.
    #[serde(default)]
    pub legs: Vec<Leg>,
}

/// GeoJSON `LineString` geometry.
#[derive(Debug, Deserialize)]
pub struct GeoJsonLine {
    /// `[longitude, latitude]` pairs.
    #[serde(default)]
    pub coordinates: Vec<[f64; 2]>,
}

/// Travel between two waypoints.
#[derive(Debug, Deserialize)]
pub struct Leg {
    /// Seconds.
    pub duration: f64,
    /// Metres.
    pub distance: f64,
}
