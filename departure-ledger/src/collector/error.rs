//! Collector startup error types.

use crate::config::ConfigError;
use crate::feed::FeedError;
use crate::stations::DirectoryError;
use crate::store::StoreError;

/// Errors that stop the collector before its first cycle.
///
/// Once the loop runs, failures are per station or per write and are
/// logged rather than returned.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("feed client error: {0}")]
    Feed(#[from] FeedError),

    #[error("station directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
