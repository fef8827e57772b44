//! [`Geocoder`] backed by a Nominatim search endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use teamroute_core::{Coordinate, GeocodeError, GeocodeMatch, Geocoder};
use thiserror::Error;
use url::Url;

use crate::routing::DEFAULT_USER_AGENT;

/// Public Nominatim instance.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Country appended to every query unless configured otherwise.
pub const DEFAULT_COUNTRY: &str = "United Kingdom";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Error building a [`NominatimGeocoder`].
#[derive(Debug, Error)]
pub enum GeocoderBuildError {
    /// The base URL does not parse.
    #[error("invalid geocoder URL {url}: {source}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Configuration for [`NominatimGeocoder`].
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Service root; `/search` is appended.
    pub base_url: String,
    /// Country suffix narrowing every query.
    pub country: String,
    /// Connect and request timeout.
    pub timeout: Duration,
    /// User agent; Nominatim's usage policy requires an identifying one.
    pub user_agent: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_owned(),
            country: DEFAULT_COUNTRY.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl NominatimConfig {
    /// Configuration for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the country suffix.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
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

/// One entry of a Nominatim `format=json` result list.
#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

/// Nominatim free-text search returning the first match.
///
/// The geocoder itself neither caches nor throttles; wrap it in an
/// [`AddressResolver`](crate::geocoding::AddressResolver) for that.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    search_url: Url,
    config: NominatimConfig,
}

impl NominatimGeocoder {
    /// Geocoder with explicit configuration.
    ///
    /// # Errors
    ///
    /// Fails when the base URL is invalid or the HTTP client cannot be built.
    pub fn with_config(config: NominatimConfig) -> Result<Self, GeocoderBuildError> {
        let root = format!("{}/search", config.base_url.trim_end_matches('/'));
        let search_url = Url::parse(&root).map_err(|source| GeocoderBuildError::InvalidUrl {
            url: root.clone(),
            source,
        })?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(GeocoderBuildError::HttpClient)?;
        Ok(Self {
            client,
            search_url,
            config,
        })
    }

    /// Geocoder with default settings.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new() -> Result<Self, GeocoderBuildError> {
        Self::with_config(NominatimConfig::default())
    }

    fn query_url(&self, address: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("{address}, {}", self.config.country))
            .append_pair("format", "json")
            .append_pair("limit", "1");
        url
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> GeocodeError {
        if error.is_timeout() {
            return GeocodeError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return GeocodeError::HttpError {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        GeocodeError::NetworkError {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

fn convert_results(results: Vec<SearchResult>) -> Result<Option<GeocodeMatch>, GeocodeError> {
    let Some(first) = results.into_iter().next() else {
        return Ok(None);
    };
    let parse = |field: &str, value: &str| {
        value.trim().parse::<f64>().map_err(|err| GeocodeError::ParseError {
            message: format!("{field} {value:?}: {err}"),
        })
    };
    let latitude = parse("lat", &first.lat)?;
    let longitude = parse("lon", &first.lon)?;
    let coordinate =
        Coordinate::new(latitude, longitude).map_err(|err| GeocodeError::ParseError {
            message: err.to_string(),
        })?;
    Ok(Some(GeocodeMatch {
        coordinate,
        display_name: first.display_name,
    }))
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn search(&self, address: &str) -> Result<Option<GeocodeMatch>, GeocodeError> {
        let url = self.query_url(address);
        log::debug!("geocoding {address:?} via {}", self.search_url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url.as_str()))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url.as_str()))?;
        let results: Vec<SearchResult> =
            response
                .json()
                .await
                .map_err(|err| GeocodeError::ParseError {
                    message: err.to_string(),
                })?;
        convert_results(results)
    }
}
