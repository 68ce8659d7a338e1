//! Domain error types.
//!
//! These errors describe observations that cannot become a valid
//! [`DepartureEvent`](super::DepartureEvent). They are distinct from feed and
//! storage errors: a malformed observation is rejected on its own and never
//! aborts the batch it arrived in.

/// Reasons an observed departure is rejected as malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// The feed did not report a scheduled departure time
    #[error("missing scheduled time")]
    MissingScheduledTime,

    /// The observation has no station name to key it by
    #[error("missing station name")]
    MissingStationName,
}
