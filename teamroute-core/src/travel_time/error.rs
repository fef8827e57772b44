use thiserror::Error;

/// Errors from [`crate::TravelTimeProvider`] calls.
///
/// Any of these aborts the step that requested it. There is no fallback to a
/// straight-line metric.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TravelTimeError {
    /// No origins or destinations were supplied.
    #[error("at least one origin and one destination are required")]
    EmptyInput,
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The service answered with a non-success HTTP status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
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
    /// The service returned a non-`Ok` status code.
    #[error("routing service returned {code}: {message}")]
    ServiceError {
        /// Service status code, e.g. `NoRoute`.
        code: String,
        /// Service message.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse routing response: {message}")]
    ParseError {
        /// Decoder detail.
        message: String,
    },
    /// The response decoded but broke a structural contract.
    #[error("malformed routing response: {message}")]
    MalformedResponse {
        /// Which contract was broken.
        message: String,
    },
}
