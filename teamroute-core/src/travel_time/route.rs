//! Route geometry and per-leg breakdown for an ordered stop sequence.

use std::time::Duration;

use geo::LineString;

/// Travel between two consecutive stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteLeg {
    /// Driving time for the leg.
    pub duration: Duration,
    /// Driving distance for the leg in metres.
    pub distance_meters: f64,
}

/// Polyline and legs returned by [`crate::TravelTimeProvider::route`].
///
/// For `n >= 2` stops a provider returns `n - 1` legs; for fewer stops the
/// geometry is empty and there are no legs.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    /// Ordered polyline (`x` = longitude, `y` = latitude).
    pub geometry: LineString<f64>,
    /// One leg per consecutive pair of stops.
    pub legs: Vec<RouteLeg>,
}

impl RouteGeometry {
    /// A route with no line and no legs.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            geometry: LineString::new(Vec::new()),
            legs: Vec::new(),
        }
    }

    /// Whether there is no line to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }

    /// Sum of all leg durations.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.legs.iter().map(|leg| leg.duration).sum()
    }
}
