//! Storage for successful resolutions.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use super::{AddressKey, GeocodeMatch};

/// Errors raised by a [`GeocodeCache`] backend.
#[derive(Debug, Error)]
#[error("geocode cache failed to {operation}: {source}")]
pub struct CacheError {
    /// What the cache was doing.
    pub operation: &'static str,
    /// Backend error.
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl CacheError {
    /// Wrap a backend error.
    pub fn new(operation: &'static str, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

/// Key-value store of resolved addresses.
///
/// Only successful matches are stored. Implementations must make each
/// [`put`](Self::put) durable (for their medium) before returning.
pub trait GeocodeCache: Send + Sync {
    /// Fetch a previously stored match.
    fn get(&self, key: &AddressKey) -> Result<Option<GeocodeMatch>, CacheError>;

    /// Store a match, replacing any previous entry for `key`.
    fn put(&self, key: &AddressKey, entry: &GeocodeMatch) -> Result<(), CacheError>;
}

/// Process-local cache, used in tests and for one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryGeocodeCache {
    entries: Mutex<HashMap<AddressKey, GeocodeMatch>>,
}

impl MemoryGeocodeCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GeocodeCache for MemoryGeocodeCache {
    fn get(&self, key: &AddressKey) -> Result<Option<GeocodeMatch>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|err| CacheError::new("read entry", err.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &AddressKey, entry: &GeocodeMatch) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| CacheError::new("write entry", err.to_string()))?;
        entries.insert(key.clone(), entry.clone());
        Ok(())
    }
}

impl<T> GeocodeCache for std::sync::Arc<T>
where
    T: GeocodeCache + ?Sized,
{
    fn get(&self, key: &AddressKey) -> Result<Option<GeocodeMatch>, CacheError> {
        (**self).get(key)
    }

    fn put(&self, key: &AddressKey, entry: &GeocodeMatch) -> Result<(), CacheError> {
        (**self).put(key, entry)
    }
}
