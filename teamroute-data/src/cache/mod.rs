//! Durable geocode cache backends.
#![forbid(unsafe_code)]

mod sqlite;

pub use sqlite::{SCHEMA_VERSION, SqliteCacheError, SqliteGeocodeCache};
