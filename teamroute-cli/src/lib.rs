//! Command-line interface for the teamroute planner.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

mod error;
mod geocode;
mod plan;
mod services;

pub use error::CliError;

use geocode::GeocodeArgs;
use plan::PlanArgs;

pub(crate) const ARG_TEAM: &str = "team";
pub(crate) const ARG_JOBS: &str = "jobs";
pub(crate) const ARG_CACHE_DB: &str = "cache-db";
pub(crate) const ARG_OSRM_URL: &str = "osrm-url";
pub(crate) const ARG_PROFILE: &str = "profile";
pub(crate) const ARG_NOMINATIM_URL: &str = "nominatim-url";
pub(crate) const ARG_COUNTRY: &str = "country";
pub(crate) const ARG_CAPACITY: &str = "capacity";
pub(crate) const ARG_MIN_INTERVAL_MS: &str = "min-interval-ms";
pub(crate) const ARG_ROUTE_CONCURRENCY: &str = "route-concurrency";
pub(crate) const ARG_SKIP_ROUTES: &str = "skip-routes";
pub(crate) const ARG_ADDRESS: &str = "address";
pub(crate) const ENV_PLAN_TEAM: &str = "TEAMROUTE_CMDS_PLAN_TEAM";
pub(crate) const ENV_PLAN_JOBS: &str = "TEAMROUTE_CMDS_PLAN_JOBS";
pub(crate) const ENV_GEOCODE_ADDRESS: &str = "TEAMROUTE_CMDS_GEOCODE_ADDRESS";

/// Default location of the geocode cache database.
pub const DEFAULT_CACHE_DB: &str = "geocode-cache.db";

/// Run the teamroute CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns the first configuration, I/O, geocoding or routing failure.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received; stopping before the next lookup");
            trigger.cancel();
        }
    });
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Plan(args) => runtime.block_on(plan::run_plan(args, &cancel, &mut stdout)),
        Command::Geocode(args) => {
            runtime.block_on(geocode::run_geocode(args, &cancel, &mut stdout))
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "teamroute",
    about = "Allocate address-based jobs to a field team and plan daily routes",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a roster and job list, allocate jobs and route each day.
    Plan(PlanArgs),
    /// Resolve a single address through the cache.
    Geocode(GeocodeArgs),
}

#[cfg(test)]
mod tests;
