//! Per (route, station) ledger entry.

use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset};

use crate::domain::DepartureEvent;

/// Accepted departures of one route at one station.
///
/// Scheduled times in `history` are strictly increasing, and the
/// high-water mark always equals the newest one. Only the most recent
/// `limit` events are kept; the mark survives trimming.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    history: VecDeque<DepartureEvent>,
    high_water_mark: DateTime<FixedOffset>,
}

impl LedgerEntry {
    /// Start an entry from its first accepted event.
    pub fn new(event: DepartureEvent) -> Self {
        let high_water_mark = event.scheduled_time;
        Self {
            history: VecDeque::from([event]),
            high_water_mark,
        }
    }

    pub fn high_water_mark(&self) -> DateTime<FixedOffset> {
        self.high_water_mark
    }

    /// Whether an event scheduled at `time` would be new for this entry.
    pub fn admits(&self, time: DateTime<FixedOffset>) -> bool {
        time > self.high_water_mark
    }

    /// Append an event that [`admits`](Self::admits) returned true for,
    /// trimming the oldest events beyond `limit`.
    pub(super) fn push(&mut self, event: DepartureEvent, limit: usize) {
        debug_assert!(self.admits(event.scheduled_time));
        self.high_water_mark = event.scheduled_time;
        self.history.push_back(event);
        while self.history.len() > limit.max(1) {
            self.history.pop_front();
        }
    }

    /// The newest accepted event.
    pub fn latest(&self) -> &DepartureEvent {
        // history is never empty: created with one event, trimmed to >= 1
        &self.history[self.history.len() - 1]
    }

    /// Retained event with exactly this scheduled time, if any.
    pub fn find(&self, time: DateTime<FixedOffset>) -> Option<&DepartureEvent> {
        self.history
            .binary_search_by(|e| e.scheduled_time.cmp(&time))
            .ok()
            .map(|idx| &self.history[idx])
    }

    /// Retained events, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &DepartureEvent> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RouteKey;
    use chrono::Duration;

    fn event(minutes: i64) -> DepartureEvent {
        let base = DateTime::parse_from_rfc3339("2024-11-04T08:00:00+01:00").unwrap();
        DepartureEvent::new(
            RouteKey::derive(Some("S1"), Some("Airport")),
            "Central",
            base + Duration::minutes(minutes),
            false,
            0.0,
        )
    }

    #[test]
    fn new_entry_marks_first_event() {
        let entry = LedgerEntry::new(event(0));
        assert_eq!(entry.high_water_mark(), event(0).scheduled_time);
        assert_eq!(entry.len(), 1);
        assert!(!entry.is_empty());
    }

    #[test]
    fn admits_only_later_times() {
        let entry = LedgerEntry::new(event(10));
        assert!(entry.admits(event(11).scheduled_time));
        assert!(!entry.admits(event(10).scheduled_time));
        assert!(!entry.admits(event(9).scheduled_time));
    }

    #[test]
    fn push_trims_history_but_keeps_mark() {
        let mut entry = LedgerEntry::new(event(0));
        for m in 1..10 {
            entry.push(event(m), 3);
        }
        assert_eq!(entry.len(), 3);
        assert_eq!(entry.high_water_mark(), event(9).scheduled_time);
        assert_eq!(entry.latest().scheduled_time, event(9).scheduled_time);

        let times: Vec<_> = entry.history().map(|e| e.scheduled_time).collect();
        assert_eq!(
            times,
            vec![event(7).scheduled_time, event(8).scheduled_time, event(9).scheduled_time]
        );
    }

    #[test]
    fn zero_limit_still_keeps_latest() {
        let mut entry = LedgerEntry::new(event(0));
        entry.push(event(1), 0);
        assert_eq!(entry.len(), 1);
        assert_eq!(entry.latest().scheduled_time, event(1).scheduled_time);
    }

    #[test]
    fn find_by_time() {
        let mut entry = LedgerEntry::new(event(0));
        entry.push(event(5), 10);
        entry.push(event(10), 10);
        assert!(entry.find(event(5).scheduled_time).is_some());
        assert!(entry.find(event(6).scheduled_time).is_none());
    }
}
