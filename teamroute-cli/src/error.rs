//! Error types emitted by the teamroute CLI.
//!
//! Every command returns `Result<_, CliError>`; `main` prints the message and
//! exits non-zero.

use std::sync::Arc;

use camino::Utf8PathBuf;
use teamroute_core::{AllocationError, TeamError};
use teamroute_data::cache::SqliteCacheError;
use teamroute_data::geocoding::{GeocoderBuildError, ResolveError};
use teamroute_data::routing::ProviderBuildError;
use thiserror::Error;

/// Errors emitted by the teamroute CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable name.
        env: &'static str,
    },
    /// An option holds an unusable value.
    #[error("invalid --{field}: {reason}")]
    InvalidArgument {
        /// Flag name.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A referenced input path does not exist or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Reading an input file failed.
    #[error("failed to read {path:?}: {source}")]
    ReadInput {
        /// Input path.
        path: Utf8PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The team file is not valid JSON.
    #[error("failed to parse team file {path:?}: {source}")]
    ParseTeam {
        /// Team file path.
        path: Utf8PathBuf,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The roster breaks a team invariant.
    #[error("invalid team: {0}")]
    InvalidTeam(#[from] TeamError),
    /// A worker's home address did not resolve.
    #[error("home of worker {worker:?} did not resolve: {source}")]
    ResolveHome {
        /// Worker id.
        worker: String,
        /// Resolution failure.
        #[source]
        source: ResolveError,
    },
    /// An address passed to `geocode` did not resolve.
    #[error(transparent)]
    Resolve(ResolveError),
    /// None of the job addresses resolved.
    #[error("none of the {failed} job addresses resolved; nothing to allocate")]
    NoJobsResolved {
        /// Number of failed addresses.
        failed: usize,
    },
    /// The run was interrupted.
    #[error("interrupted")]
    Cancelled,
    /// Opening the geocode cache failed.
    #[error(transparent)]
    OpenCache(#[from] SqliteCacheError),
    /// Constructing the geocoder failed.
    #[error("failed to build geocoder for {base_url:?}: {source}")]
    BuildGeocoder {
        /// Configured service URL.
        base_url: String,
        /// Builder error.
        #[source]
        source: GeocoderBuildError,
    },
    /// Constructing the travel time provider failed.
    #[error("failed to build travel time provider for {base_url:?}: {source}")]
    BuildTravelTimeProvider {
        /// Configured service URL.
        base_url: String,
        /// Builder error.
        #[source]
        source: ProviderBuildError,
    },
    /// Allocation failed as a whole.
    #[error("allocation failed: {0}")]
    Allocate(#[from] AllocationError),
    /// Starting the async runtime failed.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
