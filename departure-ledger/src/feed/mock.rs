//! Scripted departure feed for testing without network access.
//!
//! Holds a fixed station list and a per-station departure board that tests
//! can swap between polls, plus knobs to make individual stations fail or
//! answer slowly.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{GeoPoint, Station};

use super::error::FeedError;
use super::{DepartureFeed, ProductFilter, RawDeparture};

#[derive(Debug, Default)]
struct Script {
    boards: HashMap<String, Vec<RawDeparture>>,
    failing: HashSet<String>,
    latency: HashMap<String, StdDuration>,
    calls: Vec<String>,
    in_flight: usize,
    peak_in_flight: usize,
}

/// In-memory feed serving scripted boards.
///
/// Boards are returned whole regardless of the requested window, the way a
/// real feed re-reports the same departures until they age out.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    stations: Arc<Vec<Station>>,
    script: Arc<Mutex<Script>>,
}

impl StaticFeed {
    /// Create a feed that knows the given stations.
    pub fn new(stations: Vec<Station>) -> Self {
        Self {
            stations: Arc::new(stations),
            script: Arc::default(),
        }
    }

    /// Replace the departure board of a station.
    pub fn set_board(&self, station_id: &str, departures: Vec<RawDeparture>) {
        self.lock().boards.insert(station_id.to_string(), departures);
    }

    /// Make every request for this station fail (or succeed again).
    pub fn set_failing(&self, station_id: &str, failing: bool) {
        let mut script = self.lock();
        if failing {
            script.failing.insert(station_id.to_string());
        } else {
            script.failing.remove(station_id);
        }
    }

    /// Delay answers for this station.
    pub fn set_latency(&self, station_id: &str, latency: StdDuration) {
        self.lock().latency.insert(station_id.to_string(), latency);
    }

    /// Station ids requested so far, in request order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Most `departures` requests that were ever outstanding at once.
    pub fn peak_in_flight(&self) -> usize {
        self.lock().peak_in_flight
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // A poisoned script only means another test thread panicked
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DepartureFeed for StaticFeed {
    async fn nearby(
        &self,
        location: GeoPoint,
        min_distance_m: Option<u32>,
        max_distance_m: Option<u32>,
    ) -> Result<Vec<Station>, FeedError> {
        let min = min_distance_m.map_or(0.0, f64::from);
        let max = max_distance_m.map_or(f64::INFINITY, f64::from);

        Ok(self
            .stations
            .iter()
            .filter(|station| {
                let distance = location.distance_m(&station.location()).round();
                distance >= min && distance <= max
            })
            .cloned()
            .collect())
    }

    async fn departures(
        &self,
        station_id: &str,
        _window_start: DateTime<Utc>,
        _window: Duration,
        _products: &ProductFilter,
    ) -> Result<Vec<RawDeparture>, FeedError> {
        let (latency, result) = {
            let mut script = self.lock();
            script.calls.push(station_id.to_string());
            script.in_flight += 1;
            script.peak_in_flight = script.peak_in_flight.max(script.in_flight);

            let result = if script.failing.contains(station_id) {
                Err(FeedError::Api {
                    status: 503,
                    message: format!("scripted failure for {station_id}"),
                })
            } else if !self.stations.iter().any(|s| s.id == station_id) {
                Err(FeedError::UnknownStation(station_id.to_string()))
            } else {
                Ok(script.boards.get(station_id).cloned().unwrap_or_default())
            };

            (script.latency.get(station_id).copied(), result)
        };

        let _in_flight = InFlight(self);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        result
    }
}

/// Counts a request as finished when dropped, including on timeout.
struct InFlight<'a>(&'a StaticFeed);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().in_flight -= 1;
    }
}
