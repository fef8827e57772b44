//! Durable [`GeocodeCache`] stored in a SQLite database.

use std::sync::{Mutex, PoisonError};

use camino::Utf8Path;
use rusqlite::{Connection, OptionalExtension, params};
use teamroute_core::{AddressKey, CacheError, Coordinate, GeocodeCache, GeocodeMatch};
use thiserror::Error;

/// Version written to `geocode_cache_schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Errors opening or initialising the cache database.
#[derive(Debug, Error)]
pub enum SqliteCacheError {
    /// The parent directory could not be created.
    #[error("failed to create cache directory for {path}: {source}")]
    CreateDir {
        /// Database path.
        path: String,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The database could not be opened.
    #[error("failed to open cache database {path}: {source}")]
    Open {
        /// Database path.
        path: String,
        /// SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// A schema statement failed.
    #[error("failed to {step}: {source}")]
    Schema {
        /// Statement being run.
        step: &'static str,
        /// SQLite error.
        #[source]
        source: rusqlite::Error,
    },
    /// The database was written by an incompatible version.
    #[error("cache schema version {found} is not supported (expected {SCHEMA_VERSION})")]
    UnsupportedVersion {
        /// Version found on disk.
        found: i64,
    },
}

/// Geocode cache persisted across runs.
///
/// One row per normalised address; writes replace existing rows. The
/// connection is shared behind a mutex so the cache can be used from any
/// task.
///
/// # Examples
///
/// ```
/// use teamroute_core::{AddressKey, Coordinate, GeocodeCache, GeocodeMatch};
/// use teamroute_data::cache::SqliteGeocodeCache;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = SqliteGeocodeCache::open_in_memory()?;
/// let key = AddressKey::normalise("sw1a 1aa").ok_or("empty")?;
/// cache.put(&key, &GeocodeMatch::new(Coordinate::new(51.501, -0.1416)?))?;
/// assert!(cache.get(&key)?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteGeocodeCache {
    connection: Mutex<Connection>,
}

impl SqliteGeocodeCache {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Fails when the directory or database cannot be created, or when the
    /// stored schema version differs from [`SCHEMA_VERSION`].
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteCacheError> {
        teamroute_fs::ensure_parent_dir(path).map_err(|source| SqliteCacheError::CreateDir {
            path: path.to_string(),
            source,
        })?;
        let connection = Connection::open(path).map_err(|source| SqliteCacheError::Open {
            path: path.to_string(),
            source,
        })?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Fails when SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, SqliteCacheError> {
        let connection =
            Connection::open_in_memory().map_err(|source| SqliteCacheError::Open {
                path: ":memory:".to_owned(),
                source,
            })?;
        Self::from_connection(connection)
    }

    fn from_connection(mut connection: Connection) -> Result<Self, SqliteCacheError> {
        initialise_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Number of cached addresses.
    ///
    /// # Errors
    ///
    /// Returns the SQLite failure wrapped as a [`CacheError`].
    pub fn len(&self) -> Result<usize, CacheError> {
        let connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM geocode_cache", [], |row| row.get(0))
            .map_err(|err| CacheError::new("count entries", err))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn initialise_schema(connection: &mut Connection) -> Result<(), SqliteCacheError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SqliteCacheError::Schema {
            step: "begin schema transaction",
            source,
        })?;
    transaction
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS geocode_cache (
                address_key TEXT PRIMARY KEY CHECK (length(address_key) > 0),
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                display_name TEXT
            ) WITHOUT ROWID;
            CREATE TABLE IF NOT EXISTS geocode_cache_schema_version (
                version INTEGER NOT NULL
            );",
        )
        .map_err(|source| SqliteCacheError::Schema {
            step: "create cache tables",
            source,
        })?;

    let found: Option<i64> = transaction
        .query_row(
            "SELECT version FROM geocode_cache_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SqliteCacheError::Schema {
            step: "read schema version",
            source,
        })?;
    match found {
        Some(SCHEMA_VERSION) => {}
        Some(found) => return Err(SqliteCacheError::UnsupportedVersion { found }),
        None => {
            transaction
                .execute(
                    "INSERT INTO geocode_cache_schema_version (version) VALUES (?1)",
                    [SCHEMA_VERSION],
                )
                .map_err(|source| SqliteCacheError::Schema {
                    step: "record schema version",
                    source,
                })?;
        }
    }

    transaction
        .commit()
        .map_err(|source| SqliteCacheError::Schema {
            step: "commit schema transaction",
            source,
        })
}

impl GeocodeCache for SqliteGeocodeCache {
    fn get(&self, key: &AddressKey) -> Result<Option<GeocodeMatch>, CacheError> {
        let connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let row: Option<(f64, f64, Option<String>)> = connection
            .query_row(
                "SELECT latitude, longitude, display_name FROM geocode_cache
                 WHERE address_key = ?1",
                [key.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|err| CacheError::new("read entry", err))?;
        let Some((latitude, longitude, display_name)) = row else {
            return Ok(None);
        };
        let coordinate = Coordinate::new(latitude, longitude)
            .map_err(|err| CacheError::new("decode entry", err))?;
        Ok(Some(GeocodeMatch {
            coordinate,
            display_name,
        }))
    }

    fn put(&self, key: &AddressKey, entry: &GeocodeMatch) -> Result<(), CacheError> {
        let connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        connection
            .execute(
                "INSERT OR REPLACE INTO geocode_cache
                 (address_key, latitude, longitude, display_name)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    key.as_str(),
                    entry.coordinate.latitude(),
                    entry.coordinate.longitude(),
                    entry.display_name,
                ],
            )
            .map_err(|err| CacheError::new("write entry", err))?;
        Ok(())
    }
}
