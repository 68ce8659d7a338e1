//! The collection loop.
//!
//! A [`Collector`] moves through explicit phases:
//!
//! ```text
//! Idle -> Polling -> Persisting -> Sleeping -> Idle ...
//!                                      \-> Stopped (on shutdown)
//! ```
//!
//! Time comes from an injected [`Clock`] so the loop can be driven in
//! tests without waiting, and shutdown arrives over a `watch` channel.

mod clock;
mod config;
mod error;
mod recovery;
mod runner;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CollectorConfig;
pub use error::CollectorError;
pub use recovery::{RecoveryReport, recover_ledger};
pub use runner::{Collector, CycleReport, Phase};
