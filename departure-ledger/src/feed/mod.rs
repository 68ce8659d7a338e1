//! Departure feed capability.
//!
//! The collector never talks to a transit API directly; it is handed a
//! [`DepartureFeed`]. Two implementations live here:
//! - [`RestFeedClient`]: HTTP client for a HAFAS REST bridge
//!   (`/locations/nearby`, `/stops/{id}/departures`)
//! - [`StaticFeed`]: scripted in-memory feed for tests and dry runs
//!
//! Characteristics of the feed that the rest of the crate relies on:
//! - the same upcoming departure is re-reported on every poll until it
//!   leaves the query window
//! - delay information is only kept for a short time after departure, so
//!   windows reach into the past rather than the future

mod client;
mod convert;
mod error;
mod mock;
mod types;

use std::collections::BTreeSet;
use std::future::Future;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{GeoPoint, Station, TransportKind};

pub use client::{FeedConfig, RestFeedClient};
pub use convert::convert_departure;
pub use error::FeedError;
pub use mock::StaticFeed;
pub use types::{DepartureDto, DeparturesResponse, LineDto, LocationDto, StopDto};

/// A departure exactly as the feed reported it.
///
/// Nothing here is validated yet; [`convert_departure`] turns it into a
/// [`DepartureEvent`](crate::domain::DepartureEvent) or rejects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDeparture {
    pub line_name: Option<String>,
    pub destination: Option<String>,
    pub station_name: String,
    pub scheduled_time: Option<DateTime<FixedOffset>>,
    pub cancelled: bool,
    /// Delay in seconds, when the feed knows it.
    pub delay_seconds: Option<i64>,
}

/// Set of transport kinds to request from the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductFilter(BTreeSet<TransportKind>);

impl ProductFilter {
    /// Request every product the feed offers.
    pub fn all() -> Self {
        Self(TransportKind::PRODUCTS.into_iter().collect())
    }

    pub fn only(kinds: impl IntoIterator<Item = TransportKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    pub fn contains(&self, kind: &TransportKind) -> bool {
        self.0.contains(kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Source of stations and departures.
///
/// Implementations must be safe to call concurrently from one task; the
/// collector issues several `departures` requests at once.
pub trait DepartureFeed {
    /// Stations around `location` whose walking distance lies within the
    /// given bounds (metres, inclusive).
    fn nearby(
        &self,
        location: GeoPoint,
        min_distance_m: Option<u32>,
        max_distance_m: Option<u32>,
    ) -> impl Future<Output = Result<Vec<Station>, FeedError>> + Send;

    /// Departures from `station_id` scheduled in
    /// `[window_start, window_start + window)`.
    fn departures(
        &self,
        station_id: &str,
        window_start: DateTime<Utc>,
        window: Duration,
        products: &ProductFilter,
    ) -> impl Future<Output = Result<Vec<RawDeparture>, FeedError>> + Send;
}
