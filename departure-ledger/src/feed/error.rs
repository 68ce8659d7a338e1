//! Departure feed error types.

use std::time::Duration;

/// Errors from a departure feed.
///
/// Every variant is per request: the collector logs it against the station
/// it was polling and carries on with the rest of the cycle.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed (network error, connection reset, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Rate limited by the feed
    #[error("rate limited by departure feed")]
    RateLimited,

    /// No answer within the per-request deadline
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The feed has no station with this identifier
    #[error("unknown station: {0}")]
    UnknownStation(String),
}
