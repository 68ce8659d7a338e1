//! The deduplicating trip ledger.
//!
//! The feed re-reports an upcoming departure on every poll until it leaves
//! the query window. The ledger decides which observations are genuinely
//! new using one high-water mark per (route, station): only a strictly later
//! scheduled time is a new departure.
//!
//! The policy is monotonic. A later poll that revises the delay or
//! cancellation of an already-accepted departure is rejected like any other
//! duplicate; the rejection reports that it carried a revision so callers
//! can count it.

mod entry;
mod state;

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use tracing::{trace, warn};

use crate::domain::{DepartureEvent, DomainError, RouteKey};
use crate::feed::{RawDeparture, convert_departure};

pub use entry::LedgerEntry;
pub use state::LedgerState;

/// Default number of accepted events retained per (route, station).
pub const DEFAULT_HISTORY_LIMIT: usize = 32;

/// Outcome of offering an observation to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptResult {
    /// New departure; the event is returned for the cycle's snapshot.
    Accepted(DepartureEvent),

    /// Not later than the high-water mark. `revised` is set when a retained
    /// event with the same scheduled time reported a different outcome.
    DuplicateRejected { revised: bool },

    /// The observation could not become an event.
    Malformed(DomainError),
}

impl AcceptResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AcceptResult::Accepted(_))
    }
}

/// Accumulates accepted departures keyed by route, then station.
#[derive(Debug, Clone)]
pub struct TripLedger {
    routes: HashMap<RouteKey, HashMap<String, LedgerEntry>>,
    history_limit: usize,
}

impl Default for TripLedger {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl TripLedger {
    /// Create an empty ledger keeping `history_limit` events per pair.
    pub fn new(history_limit: usize) -> Self {
        Self {
            routes: HashMap::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Offer a validated event.
    pub fn accept(&mut self, event: DepartureEvent) -> AcceptResult {
        let stations = self.routes.entry(event.route_key.clone()).or_default();

        match stations.get_mut(&event.station_name) {
            None => {
                stations.insert(event.station_name.clone(), LedgerEntry::new(event.clone()));
                AcceptResult::Accepted(event)
            }
            Some(entry) if entry.admits(event.scheduled_time) => {
                entry.push(event.clone(), self.history_limit);
                AcceptResult::Accepted(event)
            }
            Some(entry) => {
                let revised = entry
                    .find(event.scheduled_time)
                    .is_some_and(|known| !known.same_outcome(&event));
                trace!(
                    route = %event.route_key,
                    station = %event.station_name,
                    scheduled = %event.scheduled_time,
                    revised,
                    "Duplicate departure rejected"
                );
                AcceptResult::DuplicateRejected { revised }
            }
        }
    }

    /// Offer a raw feed observation.
    ///
    /// Observations that cannot become an event are logged and reported as
    /// [`AcceptResult::Malformed`]; they never touch the ledger.
    pub fn observe(&mut self, raw: &RawDeparture) -> AcceptResult {
        match convert_departure(raw) {
            Ok(event) => self.accept(event),
            Err(e) => {
                warn!(
                    station = %raw.station_name,
                    line = ?raw.line_name,
                    destination = ?raw.destination,
                    error = %e,
                    "Malformed departure rejected"
                );
                AcceptResult::Malformed(e)
            }
        }
    }

    /// Latest accepted scheduled time for a (route, station) pair.
    pub fn high_water_mark(&self, route_key: &RouteKey, station_name: &str) -> Option<DateTime<FixedOffset>> {
        self.entry(route_key, station_name)
            .map(LedgerEntry::high_water_mark)
    }

    pub fn entry(&self, route_key: &RouteKey, station_name: &str) -> Option<&LedgerEntry> {
        self.routes.get(route_key)?.get(station_name)
    }

    /// Accept every event in order, returning how many were new.
    pub fn replay<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = DepartureEvent>,
    {
        events
            .into_iter()
            .filter(|event| self.accept(event.clone()).is_accepted())
            .count()
    }

    /// Capture the newest accepted event of every pair.
    pub fn snapshot_state(&self) -> LedgerState {
        let routes = self
            .routes
            .iter()
            .filter(|(_, stations)| !stations.is_empty())
            .map(|(route, stations)| {
                let latest = stations
                    .iter()
                    .map(|(station, entry)| (station.clone(), entry.latest().record()))
                    .collect();
                (route.clone(), latest)
            })
            .collect();

        LedgerState {
            cycle: None,
            routes,
        }
    }

    /// Replace the ledger contents with a checkpointed state.
    ///
    /// Each pair restarts with its checkpointed event as the only history
    /// and its scheduled time as the high-water mark.
    pub fn restore_state(&mut self, state: LedgerState) {
        self.routes = state
            .routes
            .into_iter()
            .map(|(route, stations)| {
                let entries = stations
                    .into_iter()
                    .map(|(station, record)| {
                        let event = DepartureEvent::from_record(route.clone(), station.clone(), record);
                        (station, LedgerEntry::new(event))
                    })
                    .collect();
                (route, entries)
            })
            .collect();
    }

    /// Number of (route, station) pairs with a high-water mark.
    pub fn pair_count(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn route_count(&self) -> usize {
        self.routes.values().filter(|s| !s.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.pair_count() == 0
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn event(minutes: i64, station: &str) -> DepartureEvent {
        let base = DateTime::parse_from_rfc3339("2024-11-04T00:00:00+01:00").unwrap();
        DepartureEvent::new(
            RouteKey::derive(Some("S1"), Some("Airport")),
            station,
            base + Duration::minutes(minutes),
            false,
            0.0,
        )
    }

    proptest! {
        /// Two observations with the same key and time: exactly one is accepted,
        /// whichever arrives first
        #[test]
        fn equal_times_accept_once(
            t in 0i64..10_000,
            prior in proptest::collection::vec(0i64..10_000, 0..10),
            cancelled_first in any::<bool>(),
        ) {
            let mut ledger = TripLedger::default();
            ledger.replay(prior.iter().filter(|p| **p < t).map(|p| event(*p, "Central")));

            let mut a = event(t, "Central");
            let mut b = event(t, "Central");
            a.is_cancelled = cancelled_first;
            b.delay_minutes = 4.0;

            let first = ledger.accept(a).is_accepted();
            let second = ledger.accept(b).is_accepted();
            prop_assert!(first);
            prop_assert!(!second);
        }

        /// Strictly increasing times are all accepted; the mark is the maximum
        #[test]
        fn increasing_times_all_accepted(times in proptest::collection::btree_set(0i64..100_000, 1..50)) {
            let mut ledger = TripLedger::new(8);
            let max = *times.iter().max().unwrap();
            let accepted = ledger.replay(times.iter().map(|t| event(*t, "Central")));
            prop_assert_eq!(accepted, times.len());
            prop_assert_eq!(
                ledger.high_water_mark(&RouteKey::derive(Some("S1"), Some("Airport")), "Central"),
                Some(event(max, "Central").scheduled_time)
            );
        }

        /// Stored history is strictly increasing for any arrival order
        #[test]
        fn history_strictly_increasing(times in proptest::collection::vec(0i64..500, 0..60)) {
            let mut ledger = TripLedger::new(16);
            ledger.replay(times.iter().map(|t| event(*t, "Central")));
            if let Some(entry) = ledger.entry(&RouteKey::derive(Some("S1"), Some("Airport")), "Central") {
                let stored: Vec<_> = entry.history().map(|e| e.scheduled_time).collect();
                prop_assert!(stored.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(entry.len() <= 16);
            }
        }

        /// Replaying the same stream after a restore accepts nothing
        #[test]
        fn restore_is_idempotent(times in proptest::collection::vec(0i64..500, 1..40)) {
            let events: Vec<_> = times.iter().map(|t| event(*t, "Central")).collect();
            let mut ledger = TripLedger::default();
            ledger.replay(events.clone());

            let mut restored = TripLedger::default();
            restored.restore_state(ledger.snapshot_state());
            prop_assert_eq!(restored.replay(events), 0);
        }
    }
}
