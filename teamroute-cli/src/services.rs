//! Construction of the external services a command talks to.

use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Serialize;
use teamroute_core::{Geocoder, TravelTimeProvider};
use teamroute_data::cache::SqliteGeocodeCache;
use teamroute_data::geocoding::{
    AddressResolver, DEFAULT_COUNTRY, DEFAULT_MIN_INTERVAL, DEFAULT_NOMINATIM_URL,
    NominatimConfig, NominatimGeocoder, ResolverConfig,
};
use teamroute_data::routing::{
    DEFAULT_OSRM_URL, DEFAULT_PROFILE, OsrmConfig, OsrmTravelTimeProvider,
};

use crate::{CliError, DEFAULT_CACHE_DB};

/// Resolved geocoding settings shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GeocodingConfig {
    pub(crate) cache_db: Utf8PathBuf,
    pub(crate) nominatim_url: String,
    pub(crate) country: String,
    pub(crate) min_interval: Duration,
}

impl GeocodingConfig {
    pub(crate) fn from_options(
        cache_db: Option<Utf8PathBuf>,
        nominatim_url: Option<String>,
        country: Option<String>,
        min_interval_ms: Option<u64>,
    ) -> Self {
        Self {
            cache_db: cache_db.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_DB)),
            nominatim_url: nominatim_url.unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_owned()),
            country: country.unwrap_or_else(|| DEFAULT_COUNTRY.to_owned()),
            min_interval: min_interval_ms.map_or(DEFAULT_MIN_INTERVAL, Duration::from_millis),
        }
    }

    /// Open the cache and wrap `geocoder` in a throttled resolver.
    pub(crate) fn open_resolver<G: Geocoder>(
        &self,
        geocoder: G,
    ) -> Result<AddressResolver<G, SqliteGeocodeCache>, CliError> {
        let cache = SqliteGeocodeCache::open(&self.cache_db)?;
        Ok(AddressResolver::new(geocoder, cache)
            .with_config(ResolverConfig::default().with_min_interval(self.min_interval)))
    }
}

/// Resolved routing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RoutingConfig {
    pub(crate) osrm_url: String,
    pub(crate) profile: String,
}

impl RoutingConfig {
    pub(crate) fn from_options(osrm_url: Option<String>, profile: Option<String>) -> Self {
        Self {
            osrm_url: osrm_url.unwrap_or_else(|| DEFAULT_OSRM_URL.to_owned()),
            profile: profile.unwrap_or_else(|| DEFAULT_PROFILE.to_owned()),
        }
    }
}

/// Builds the geocoder and travel-time provider for a command invocation.
pub(crate) trait ServiceBuilder {
    fn geocoder(&self, config: &GeocodingConfig) -> Result<Box<dyn Geocoder + '_>, CliError>;

    fn travel_time(
        &self,
        config: &RoutingConfig,
    ) -> Result<Box<dyn TravelTimeProvider + '_>, CliError>;
}

/// Nominatim and OSRM over HTTP.
pub(crate) struct HttpServiceBuilder;

impl ServiceBuilder for HttpServiceBuilder {
    fn geocoder(&self, config: &GeocodingConfig) -> Result<Box<dyn Geocoder + '_>, CliError> {
        let geocoder = NominatimGeocoder::with_config(
            NominatimConfig::new(config.nominatim_url.as_str()).with_country(config.country.as_str()),
        )
        .map_err(|source| CliError::BuildGeocoder {
            base_url: config.nominatim_url.clone(),
            source,
        })?;
        Ok(Box::new(geocoder))
    }

    fn travel_time(
        &self,
        config: &RoutingConfig,
    ) -> Result<Box<dyn TravelTimeProvider + '_>, CliError> {
        let provider = OsrmTravelTimeProvider::with_config(
            OsrmConfig::new(config.osrm_url.as_str()).with_profile(config.profile.as_str()),
        )
        .map_err(|source| CliError::BuildTravelTimeProvider {
            base_url: config.osrm_url.clone(),
            source,
        })?;
        Ok(Box::new(provider))
    }
}

/// Write `value` as pretty JSON followed by a newline.
pub(crate) fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}
