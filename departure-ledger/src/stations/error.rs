//! Station directory error types.

/// Errors that can occur while resolving the stations to poll.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// No band produced a single station
    #[error("no stations resolved in {bands} distance band(s)")]
    NoStations { bands: usize },
}
