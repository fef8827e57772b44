//! Validated WGS84 positions.

use geo::Coord;
use thiserror::Error;

/// A latitude/longitude pair that is known to lie on the globe.
///
/// Both components are finite, latitude is within `[-90, 90]` and longitude
/// within `[-180, 180]`. Conversions to [`geo::Coord`] place the longitude on
/// the `x` axis and the latitude on the `y` axis, matching the GeoJSON order
/// used by routing services.
///
/// # Examples
///
/// ```
/// use teamroute_core::Coordinate;
///
/// # fn main() -> Result<(), teamroute_core::CoordinateError> {
/// let home = Coordinate::new(51.50, -0.10)?;
/// assert_eq!(home.latitude(), 51.50);
/// assert_eq!(home.to_coord().x, -0.10);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawCoordinate")
)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

/// Errors returned by [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    /// One of the components was NaN or infinite.
    #[error("coordinate components must be finite")]
    NonFinite,
    /// Latitude fell outside `[-90, 90]`.
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    /// Longitude fell outside `[-180, 180]`.
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

impl Coordinate {
    /// Validate and construct a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] when either component is not finite or is
    /// out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Convert into a `geo` coordinate (`x` = longitude, `y` = latitude).
    #[must_use]
    pub const fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

impl TryFrom<Coord<f64>> for Coordinate {
    type Error = CoordinateError;

    fn try_from(coord: Coord<f64>) -> Result<Self, Self::Error> {
        Self::new(coord.y, coord.x)
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(value: Coordinate) -> Self {
        value.to_coord()
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}
