//! Address resolution against Nominatim.
//!
//! [`NominatimGeocoder`] performs single free-text searches and
//! [`AddressResolver`] layers caching, throttling, de-duplication and
//! cancellation on top of any [`teamroute_core::Geocoder`].

mod nominatim;
mod resolver;

pub use nominatim::{
    DEFAULT_COUNTRY, DEFAULT_NOMINATIM_URL, GeocoderBuildError, NominatimConfig, NominatimGeocoder,
};
pub use resolver::{
    AddressResolver, DEFAULT_MIN_INTERVAL, ResolveAllReport, ResolveError, ResolveFailure,
    ResolveProgress, ResolvedAddress, ResolverConfig,
};
