//! Address resolution contracts.
//!
//! A [`Geocoder`] turns free text into at most one [`GeocodeMatch`]. A
//! [`GeocodeCache`] stores successful matches under a normalised
//! [`AddressKey`] so repeated lookups never reach the external service.
//! Orchestration (throttling, de-duplication, cancellation) lives with the
//! concrete adapters.

mod cache;
mod error;
mod key;

use async_trait::async_trait;

use crate::Coordinate;

pub use cache::{CacheError, GeocodeCache, MemoryGeocodeCache};
pub use error::GeocodeError;
pub use key::AddressKey;

/// The first match a geocoder found for an address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    /// Resolved position.
    pub coordinate: Coordinate,
    /// Full place name reported by the service.
    pub display_name: Option<String>,
}

impl GeocodeMatch {
    /// Construct a match without a display name.
    #[must_use]
    pub const fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            display_name: None,
        }
    }

    /// Attach the service's display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Resolve a free-text address with an external service.
///
/// `Ok(None)` means the service answered but found nothing; transport and
/// decoding problems are errors. Callers must keep the two apart: a miss is
/// fixed by correcting the input, an error may clear on its own.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up `address` and return the first match, if any.
    async fn search(&self, address: &str) -> Result<Option<GeocodeMatch>, GeocodeError>;
}

#[async_trait]
impl<T> Geocoder for &T
where
    T: Geocoder + ?Sized,
{
    async fn search(&self, address: &str) -> Result<Option<GeocodeMatch>, GeocodeError> {
        (**self).search(address).await
    }
}
