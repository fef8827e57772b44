//! `plan` command: resolve, allocate and route a job list for a team.

use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use teamroute_core::{
    Allocation, DEFAULT_DAY_CAPACITY, DEFAULT_ROUTE_CONCURRENCY, DayCapacity, ExportRow,
    GeocodeCache, Geocoder, ImportOutcome, RouteSequencer, SequencedBatch, Team, TeamError,
    Worker, allocate,
};
use teamroute_data::geocoding::{AddressResolver, ResolveAllReport};
use tokio_util::sync::CancellationToken;

use crate::services::{
    GeocodingConfig, HttpServiceBuilder, RoutingConfig, ServiceBuilder, write_json,
};
use crate::{
    ARG_CACHE_DB, ARG_CAPACITY, ARG_COUNTRY, ARG_JOBS, ARG_MIN_INTERVAL_MS, ARG_NOMINATIM_URL,
    ARG_OSRM_URL, ARG_PROFILE, ARG_ROUTE_CONCURRENCY, ARG_SKIP_ROUTES, ARG_TEAM, CliError,
    ENV_PLAN_JOBS, ENV_PLAN_TEAM,
};

/// CLI arguments for the `plan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Resolve every worker's home and every job address, assign \
                 each job to the worker with the shortest drive, split each \
                 worker's jobs into daily batches and request a round-trip \
                 route per batch. The plan is printed as JSON.",
    about = "Allocate jobs to a team and plan daily routes"
)]
#[ortho_config(prefix = "TEAMROUTE")]
pub(crate) struct PlanArgs {
    /// JSON roster: `[{"id", "name", "home", "color"}]`.
    #[arg(long = ARG_TEAM, value_name = "path")]
    #[serde(default)]
    pub(crate) team: Option<Utf8PathBuf>,
    /// Job addresses separated by newlines or commas.
    #[arg(long = ARG_JOBS, value_name = "path")]
    #[serde(default)]
    pub(crate) jobs: Option<Utf8PathBuf>,
    /// SQLite geocode cache (default `geocode-cache.db`).
    #[arg(long = ARG_CACHE_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) cache_db: Option<Utf8PathBuf>,
    /// Base URL of the OSRM service.
    #[arg(long = ARG_OSRM_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) osrm_url: Option<String>,
    /// OSRM routing profile.
    #[arg(long = ARG_PROFILE, value_name = "name")]
    #[serde(default)]
    pub(crate) profile: Option<String>,
    /// Base URL of the Nominatim service.
    #[arg(long = ARG_NOMINATIM_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) nominatim_url: Option<String>,
    /// Country appended to every geocoder query.
    #[arg(long = ARG_COUNTRY, value_name = "name")]
    #[serde(default)]
    pub(crate) country: Option<String>,
    /// Maximum jobs per worker per day.
    #[arg(long = ARG_CAPACITY, value_name = "jobs")]
    #[serde(default)]
    pub(crate) capacity: Option<usize>,
    /// Minimum spacing between geocoder calls in milliseconds.
    #[arg(long = ARG_MIN_INTERVAL_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) min_interval_ms: Option<u64>,
    /// Route requests in flight at once.
    #[arg(long = ARG_ROUTE_CONCURRENCY, value_name = "n")]
    #[serde(default)]
    pub(crate) route_concurrency: Option<usize>,
    /// Allocate only; do not request routes.
    #[arg(long = ARG_SKIP_ROUTES, num_args = 0..=1, default_missing_value = "true")]
    #[serde(default)]
    pub(crate) skip_routes: Option<bool>,
}

impl PlanArgs {
    fn into_config(self) -> Result<PlanConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PlanConfig::try_from(merged)
    }
}

/// Resolved `plan` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlanConfig {
    pub(crate) team: Utf8PathBuf,
    pub(crate) jobs: Utf8PathBuf,
    pub(crate) geocoding: GeocodingConfig,
    pub(crate) routing: RoutingConfig,
    pub(crate) capacity: DayCapacity,
    pub(crate) route_concurrency: usize,
    pub(crate) skip_routes: bool,
}

impl PlanConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.team, ARG_TEAM)?;
        require_existing(&self.jobs, ARG_JOBS)?;
        Ok(())
    }
}

fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match teamroute_fs::is_regular_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl TryFrom<PlanArgs> for PlanConfig {
    type Error = CliError;

    fn try_from(args: PlanArgs) -> Result<Self, Self::Error> {
        let team = args.team.ok_or(CliError::MissingArgument {
            field: ARG_TEAM,
            env: ENV_PLAN_TEAM,
        })?;
        let jobs = args.jobs.ok_or(CliError::MissingArgument {
            field: ARG_JOBS,
            env: ENV_PLAN_JOBS,
        })?;
        let capacity = DayCapacity::new(args.capacity.unwrap_or(DEFAULT_DAY_CAPACITY)).ok_or(
            CliError::InvalidArgument {
                field: ARG_CAPACITY,
                reason: "must be at least 1",
            },
        )?;
        let route_concurrency = args.route_concurrency.unwrap_or(DEFAULT_ROUTE_CONCURRENCY);
        if route_concurrency == 0 {
            return Err(CliError::InvalidArgument {
                field: ARG_ROUTE_CONCURRENCY,
                reason: "must be at least 1",
            });
        }
        Ok(Self {
            team,
            jobs,
            geocoding: GeocodingConfig::from_options(
                args.cache_db,
                args.nominatim_url,
                args.country,
                args.min_interval_ms,
            ),
            routing: RoutingConfig::from_options(args.osrm_url, args.profile),
            capacity,
            route_concurrency,
            skip_routes: args.skip_routes.unwrap_or(false),
        })
    }
}

/// One roster entry as written in the team file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct TeamEntry {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) home: String,
    #[serde(default)]
    pub(crate) color: String,
}

pub(crate) fn load_team_entries(path: &Utf8Path) -> Result<Vec<TeamEntry>, CliError> {
    let text = teamroute_fs::read_text_file(path).map_err(|source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::ParseTeam {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn load_job_addresses(path: &Utf8Path) -> Result<Vec<String>, CliError> {
    let text = teamroute_fs::read_text_file(path).map_err(|source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(split_addresses(&text))
}

/// Split on newlines and commas, dropping blank entries.
pub(crate) fn split_addresses(text: &str) -> Vec<String> {
    text.split(['\n', ','])
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_owned)
        .collect()
}

async fn resolve_team<G, C>(
    resolver: &AddressResolver<G, C>,
    entries: Vec<TeamEntry>,
    cancel: &CancellationToken,
) -> Result<Team, CliError>
where
    G: Geocoder,
    C: GeocodeCache,
{
    if entries.is_empty() {
        return Err(TeamError::Empty.into());
    }
    let mut workers = Vec::with_capacity(entries.len());
    for entry in entries {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CliError::Cancelled),
            result = resolver.resolve(&entry.home) => result,
        };
        let home = result.map_err(|source| CliError::ResolveHome {
            worker: entry.id.clone(),
            source,
        })?;
        workers.push(Worker::new(entry.id, entry.name, home.coordinate, entry.color));
    }
    Ok(Team::new(workers)?)
}

/// JSON document written by `plan`.
#[derive(Debug, Serialize)]
pub(crate) struct PlanOutput {
    pub(crate) import: ImportSummary,
    pub(crate) assignments: Vec<ExportRow>,
    pub(crate) routes: Vec<RouteSummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportSummary {
    pub(crate) requested: usize,
    pub(crate) resolved: usize,
    pub(crate) failed: Vec<FailedAddress>,
    pub(crate) outcome: ImportOutcome,
}

#[derive(Debug, Serialize)]
pub(crate) struct FailedAddress {
    pub(crate) address: String,
    pub(crate) reason: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RouteSummary {
    pub(crate) worker: String,
    pub(crate) day: String,
    pub(crate) legs_seconds: Vec<u64>,
    pub(crate) polyline_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl RouteSummary {
    fn from_batch(batch: &SequencedBatch) -> Self {
        let (legs_seconds, polyline_points, error) = match &batch.outcome {
            Ok(route) => (
                route
                    .legs
                    .iter()
                    .map(|leg| whole_seconds(leg.duration))
                    .collect(),
                route.geometry.0.len(),
                None,
            ),
            Err(err) => (Vec::new(), 0, Some(err.to_string())),
        };
        Self {
            worker: batch.worker_id.clone(),
            day: batch.day.to_string(),
            legs_seconds,
            polyline_points,
            error,
        }
    }
}

fn whole_seconds(duration: Duration) -> u64 {
    duration.saturating_add(Duration::from_millis(500)).as_secs()
}

impl PlanOutput {
    fn new(
        requested: usize,
        report: &ResolveAllReport,
        team: &Team,
        allocation: &Allocation,
        routes: &[SequencedBatch],
    ) -> Self {
        Self {
            import: ImportSummary {
                requested,
                resolved: report.resolved_count(),
                failed: report
                    .failures()
                    .map(|failure| FailedAddress {
                        address: failure.address.clone(),
                        reason: failure.error.to_string(),
                    })
                    .collect(),
                outcome: report.outcome(),
            },
            assignments: ExportRow::from_allocation(team, allocation),
            routes: routes.iter().map(RouteSummary::from_batch).collect(),
        }
    }
}

pub(crate) async fn run_plan(
    args: PlanArgs,
    cancel: &CancellationToken,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    run_plan_with(&config, &HttpServiceBuilder, cancel, writer).await
}

pub(crate) async fn run_plan_with(
    config: &PlanConfig,
    services: &dyn ServiceBuilder,
    cancel: &CancellationToken,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let output = execute_plan(config, services, cancel).await?;
    write_json(writer, &output)
}

async fn execute_plan(
    config: &PlanConfig,
    services: &dyn ServiceBuilder,
    cancel: &CancellationToken,
) -> Result<PlanOutput, CliError> {
    let entries = load_team_entries(&config.team)?;
    let addresses = load_job_addresses(&config.jobs)?;
    let geocoder = services.geocoder(&config.geocoding)?;
    let provider = services.travel_time(&config.routing)?;
    let resolver = config.geocoding.open_resolver(&*geocoder)?;

    let team = resolve_team(&resolver, entries, cancel).await?;
    log::info!(
        "resolved {} worker homes; resolving {} job addresses",
        team.len(),
        addresses.len()
    );

    let report = resolver
        .resolve_all(&addresses, cancel, |step| {
            log::info!("geocoded {}/{}", step.current, step.total);
        })
        .await;
    if report.is_cancelled() {
        return Err(CliError::Cancelled);
    }
    for failure in report.failures() {
        log::warn!("skipping {:?}: {}", failure.address, failure.error);
    }
    if !report.outcome().has_jobs() {
        return Err(CliError::NoJobsResolved {
            failed: report.failed_count(),
        });
    }

    let jobs = report.jobs();
    let allocation = allocate(&*provider, &team, &jobs, config.capacity).await?;

    let routes = if config.skip_routes {
        Vec::new()
    } else {
        RouteSequencer::new(&*provider)
            .with_concurrency(config.route_concurrency)
            .sequence_all(&team, &allocation)
            .await
    };

    Ok(PlanOutput::new(
        addresses.len(),
        &report,
        &team,
        &allocation,
        &routes,
    ))
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<PlanConfig, CliError> {
    let merged = PlanArgs::merge_from_layers(layers).map_err(CliError::from)?;
    PlanConfig::try_from(merged)
}
