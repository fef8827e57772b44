use thiserror::Error;

/// Transport and decoding failures from a [`super::Geocoder`].
///
/// "No match" is not an error; see [`super::Geocoder::search`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// The request did not complete within the configured timeout.
    #[error("geocoding request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The service answered with a non-success HTTP status.
    #[error("geocoding request to {url} failed with HTTP {status}: {message}")]
    HttpError {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },
    /// The request failed before a response arrived.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Request URL.
        url: String,
        /// Error detail.
        message: String,
    },
    /// The response body could not be decoded into a coordinate.
    #[error("failed to parse geocoding response: {message}")]
    ParseError {
        /// Decoder detail.
        message: String,
    },
}
