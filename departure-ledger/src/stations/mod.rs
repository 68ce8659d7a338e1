//! Station directory.
//!
//! Resolves the fixed set of stations to poll as distance bands around a
//! center point, asked of the departure feed once at startup.

mod directory;
mod error;

pub use directory::{Band, bands, stations_in_bands};
pub use error::DirectoryError;
