//! HTTP travel-time provider for OSRM routing services.
//!
//! [`OsrmTravelTimeProvider`] implements
//! [`teamroute_core::TravelTimeProvider`]: the Table service supplies the
//! homes × jobs duration matrix and the Route service supplies the polyline
//! and legs of each day's round trip.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use teamroute_core::{Coordinate, TravelTimeProvider};
//! use teamroute_data::routing::{OsrmConfig, OsrmTravelTimeProvider};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OsrmConfig::new("http://localhost:5000")
//!     .with_timeout(Duration::from_secs(60))
//!     .with_user_agent("my-app/1.0");
//! let provider = OsrmTravelTimeProvider::with_config(config)?;
//!
//! let homes = [Coordinate::new(51.50, -0.10)?];
//! let jobs = [Coordinate::new(51.51, -0.09)?, Coordinate::new(51.53, 0.06)?];
//! let matrix = provider.durations(&homes, &jobs).await?;
//! println!("first job: {:?}", matrix.get(0, 0));
//! # Ok(())
//! # }
//! ```

mod osrm;
mod provider;

pub use provider::{
    DEFAULT_OSRM_URL, DEFAULT_PROFILE, DEFAULT_USER_AGENT, OsrmConfig, OsrmTravelTimeProvider,
    ProviderBuildError,
};
