//! Fixtures shared by the CLI unit tests.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use teamroute_core::test_support::{StubGeocoder, StubTravelTimeProvider};
use teamroute_core::{Coordinate, DayCapacity, Geocoder, TravelTimeProvider};
use tempfile::TempDir;

use crate::CliError;
use crate::plan::PlanConfig;
use crate::services::{GeocodingConfig, RoutingConfig, ServiceBuilder};

pub(super) const TEAM_JSON: &str = r##"[
    {"id": "w1", "name": "Alice", "home": "SW1A 1AA", "color": "#3b82f6"},
    {"id": "w2", "name": "Bob", "home": "M1 1AE"}
]"##;

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write fixture");
}

pub(super) fn point(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).expect("valid coordinate")
}

/// A geocoder that knows both homes and three job postcodes.
pub(super) fn known_geocoder() -> StubGeocoder {
    StubGeocoder::new()
        .with_match("SW1A 1AA", point(51.501, -0.1416))
        .with_match("M1 1AE", point(53.477, -2.2309))
        .with_match("EC1A 1BB", point(51.520, -0.0977))
        .with_match("M2 5PD", point(53.481, -2.2451))
        .with_match("SE1 7PB", point(51.503, -0.1195))
}

/// Services backed by in-process stubs.
pub(super) struct StubServices {
    pub(super) geocoder: StubGeocoder,
    pub(super) provider: StubTravelTimeProvider,
}

impl StubServices {
    pub(super) fn new(geocoder: StubGeocoder, provider: StubTravelTimeProvider) -> Self {
        Self { geocoder, provider }
    }
}

impl ServiceBuilder for StubServices {
    fn geocoder(&self, _config: &GeocodingConfig) -> Result<Box<dyn Geocoder + '_>, CliError> {
        Ok(Box::new(&self.geocoder))
    }

    fn travel_time(
        &self,
        _config: &RoutingConfig,
    ) -> Result<Box<dyn TravelTimeProvider + '_>, CliError> {
        Ok(Box::new(&self.provider))
    }
}

/// Temporary directory holding the team, jobs and cache files.
pub(super) struct Workspace {
    _dir: TempDir,
    pub(super) root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join(name);
        write_utf8(&path, contents.as_bytes());
        path
    }

    pub(super) fn geocoding(&self) -> GeocodingConfig {
        GeocodingConfig {
            cache_db: self.root.join("cache/geocode-cache.db"),
            nominatim_url: "http://nominatim.test".to_owned(),
            country: "United Kingdom".to_owned(),
            min_interval: Duration::ZERO,
        }
    }

    pub(super) fn plan_config(&self, team: &str, jobs: &str) -> PlanConfig {
        PlanConfig {
            team: self.write("team.json", team),
            jobs: self.write("jobs.txt", jobs),
            geocoding: self.geocoding(),
            routing: RoutingConfig::from_options(None, None),
            capacity: DayCapacity::default(),
            route_concurrency: 2,
            skip_routes: false,
        }
    }
}
