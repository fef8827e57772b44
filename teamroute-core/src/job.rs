//! Jobs awaiting allocation.

use crate::Coordinate;

/// A job site identified by a raw address.
///
/// The coordinate is `None` until the address resolves. Unresolved jobs are
/// left out of allocation entirely; they are never given a default position.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Identifier unique within one run.
    pub id: String,
    /// Address or postcode as supplied by the caller.
    pub raw_address: String,
    /// Human-readable match returned by the geocoder, if any.
    pub display_name: Option<String>,
    /// Resolved position.
    pub coordinate: Option<Coordinate>,
}

impl Job {
    /// Construct a job whose address resolved to `coordinate`.
    pub fn resolved(
        id: impl Into<String>,
        raw_address: impl Into<String>,
        coordinate: Coordinate,
    ) -> Self {
        Self {
            id: id.into(),
            raw_address: raw_address.into(),
            display_name: None,
            coordinate: Some(coordinate),
        }
    }

    /// Construct a job whose address failed to resolve.
    pub fn unresolved(id: impl Into<String>, raw_address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw_address: raw_address.into(),
            display_name: None,
            coordinate: None,
        }
    }

    /// Attach the geocoder's display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Whether the job can take part in allocation.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.coordinate.is_some()
    }
}
