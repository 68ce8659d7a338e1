//! Observed departures.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::route::RouteKey;
use super::transport::{LineCategory, TransportKind};

/// A single observed departure of a route from a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartureEvent {
    pub route_key: RouteKey,
    pub station_name: String,
    /// Category of the line label the departure was recorded under.
    pub category: LineCategory,
    /// Nominal departure time. Never changes for a given departure.
    pub scheduled_time: DateTime<FixedOffset>,
    pub is_cancelled: bool,
    /// Delay relative to schedule, zero when unknown.
    pub delay_minutes: f64,
}

impl DepartureEvent {
    /// Create an event whose category is taken from the route's line name.
    pub fn new(
        route_key: RouteKey,
        station_name: impl Into<String>,
        scheduled_time: DateTime<FixedOffset>,
        is_cancelled: bool,
        delay_minutes: f64,
    ) -> Self {
        let category = route_key.line_category();
        Self {
            route_key,
            station_name: station_name.into(),
            category,
            scheduled_time,
            is_cancelled,
            delay_minutes,
        }
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.category.kind()
    }

    /// Whether two observations report the same cancellation and delay.
    pub fn same_outcome(&self, other: &DepartureEvent) -> bool {
        self.is_cancelled == other.is_cancelled && self.delay_minutes == other.delay_minutes
    }

    /// Compact persisted form, without the route and station it is filed under.
    pub fn record(&self) -> EventRecord {
        EventRecord(
            self.category.clone(),
            self.scheduled_time,
            self.is_cancelled,
            self.delay_minutes,
        )
    }

    /// Rebuild an event from its persisted form.
    pub fn from_record(route_key: RouteKey, station_name: impl Into<String>, record: EventRecord) -> Self {
        let EventRecord(category, scheduled_time, is_cancelled, delay_minutes) = record;
        Self {
            route_key,
            station_name: station_name.into(),
            category,
            scheduled_time,
            is_cancelled,
            delay_minutes,
        }
    }
}

/// Persisted 4-tuple: `(label, scheduled_time, cancelled, delay_minutes)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord(
    pub LineCategory,
    pub DateTime<FixedOffset>,
    pub bool,
    pub f64,
);
