//! Departure ledger.
//!
//! Polls a transit departure feed for every station around a center point
//! and files each departure exactly once, even though the feed re-reports
//! it on every poll until it leaves the query window. Accepted departures
//! are written as one snapshot per cycle, and offline reports rank routes
//! by delay and cancellations.

pub mod analysis;
pub mod collector;
pub mod config;
pub mod domain;
pub mod feed;
pub mod ledger;
pub mod stations;
pub mod store;
