//! `geocode` command: resolve one address through the durable cache.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::services::{GeocodingConfig, HttpServiceBuilder, ServiceBuilder, write_json};
use crate::{
    ARG_ADDRESS, ARG_CACHE_DB, ARG_COUNTRY, ARG_MIN_INTERVAL_MS, ARG_NOMINATIM_URL, CliError,
    ENV_GEOCODE_ADDRESS,
};

/// CLI arguments for the `geocode` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Resolve a single address or postcode. Answers are read from \
                 and written to the same cache database `plan` uses.",
    about = "Resolve one address to a coordinate"
)]
#[ortho_config(prefix = "TEAMROUTE")]
pub(crate) struct GeocodeArgs {
    /// Address or postcode to resolve.
    #[arg(value_name = "address")]
    #[serde(default)]
    pub(crate) address: Option<String>,
    /// SQLite geocode cache (default `geocode-cache.db`).
    #[arg(long = ARG_CACHE_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) cache_db: Option<Utf8PathBuf>,
    /// Base URL of the Nominatim service.
    #[arg(long = ARG_NOMINATIM_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) nominatim_url: Option<String>,
    /// Country appended to the query.
    #[arg(long = ARG_COUNTRY, value_name = "name")]
    #[serde(default)]
    pub(crate) country: Option<String>,
    /// Minimum spacing between geocoder calls in milliseconds.
    #[arg(long = ARG_MIN_INTERVAL_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) min_interval_ms: Option<u64>,
}

impl GeocodeArgs {
    fn into_config(self) -> Result<GeocodeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        GeocodeConfig::try_from(merged)
    }
}

/// Resolved `geocode` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GeocodeConfig {
    pub(crate) address: String,
    pub(crate) geocoding: GeocodingConfig,
}

impl TryFrom<GeocodeArgs> for GeocodeConfig {
    type Error = CliError;

    fn try_from(args: GeocodeArgs) -> Result<Self, Self::Error> {
        let address = args
            .address
            .filter(|address| !address.trim().is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_ADDRESS,
                env: ENV_GEOCODE_ADDRESS,
            })?;
        Ok(Self {
            address,
            geocoding: GeocodingConfig::from_options(
                args.cache_db,
                args.nominatim_url,
                args.country,
                args.min_interval_ms,
            ),
        })
    }
}

#[derive(Debug, Serialize)]
struct GeocodeOutput {
    address: String,
    latitude: f64,
    longitude: f64,
    display_name: Option<String>,
    from_cache: bool,
}

pub(crate) async fn run_geocode(
    args: GeocodeArgs,
    cancel: &CancellationToken,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    run_geocode_with(&config, &HttpServiceBuilder, cancel, writer).await
}

pub(crate) async fn run_geocode_with(
    config: &GeocodeConfig,
    services: &dyn ServiceBuilder,
    cancel: &CancellationToken,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let geocoder = services.geocoder(&config.geocoding)?;
    let resolver = config.geocoding.open_resolver(&*geocoder)?;
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(CliError::Cancelled),
        result = resolver.resolve(&config.address) => result,
    };
    let resolved = result.map_err(CliError::Resolve)?;
    log::debug!(
        "resolved {:?} (cached: {})",
        resolved.address,
        resolved.from_cache
    );
    write_json(
        writer,
        &GeocodeOutput {
            latitude: resolved.coordinate.latitude(),
            longitude: resolved.coordinate.longitude(),
            address: resolved.address,
            display_name: resolved.display_name,
            from_cache: resolved.from_cache,
        },
    )
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<GeocodeConfig, CliError> {
    let merged = GeocodeArgs::merge_from_layers(layers).map_err(CliError::from)?;
    GeocodeConfig::try_from(merged)
}
