//! Selecting the records a report is built from.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset};

use crate::domain::{DepartureEvent, LineCategory, RouteKey};

/// Keep records of allowed categories on routes with enough trips.
///
/// A route's trip count is the number of distinct scheduled times at the
/// first station it was seen at (among allowed records). Routes below
/// `min_trips` are dropped entirely.
pub fn filter_by_category_and_min_trips(
    records: &[DepartureEvent],
    allowed: &[LineCategory],
    min_trips: usize,
) -> Vec<DepartureEvent> {
    let allowed: HashSet<&LineCategory> = allowed.iter().collect();
    let is_allowed = |record: &DepartureEvent| allowed.contains(&record.category);

    let mut first_station: HashMap<&RouteKey, (&str, HashSet<DateTime<FixedOffset>>)> = HashMap::new();
    for record in records.iter().filter(|r| is_allowed(r)) {
        let (station, times) = first_station
            .entry(&record.route_key)
            .or_insert_with(|| (record.station_name.as_str(), HashSet::new()));
        if *station == record.station_name {
            times.insert(record.scheduled_time);
        }
    }

    let valid: HashSet<&RouteKey> = first_station
        .into_iter()
        .filter(|(_, (_, times))| times.len() >= min_trips)
        .map(|(route, _)| route)
        .collect();

    records
        .iter()
        .filter(|r| is_allowed(r) && valid.contains(&r.route_key))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(line: &str, station: &str, minutes: i64) -> DepartureEvent {
        DepartureEvent::new(
            RouteKey::derive(Some(line), Some("Centre")),
            station,
            DateTime::parse_from_rfc3339("2024-11-04T08:00:00+01:00").unwrap() + Duration::minutes(minutes),
            false,
            0.0,
        )
    }

    #[test]
    fn drops_disallowed_categories() {
        let records = vec![record("U6", "A", 0), record("ICE 100", "A", 0)];
        let kept = filter_by_category_and_min_trips(&records, &[LineCategory::U], 1);
        assert_eq!(kept, vec![record("U6", "A", 0)]);
    }

    #[test]
    fn counts_trips_at_first_station_only() {
        // Bus 52 has two trips at its first station and many elsewhere
        let records = vec![
            record("Bus 52", "A", 0),
            record("Bus 52", "B", 0),
            record("Bus 52", "B", 10),
            record("Bus 52", "B", 20),
            record("Bus 52", "A", 30),
            record("U6", "C", 0),
            record("U6", "C", 10),
            record("U6", "C", 20),
        ];
        let allowed = [LineCategory::Bus, LineCategory::U];

        let kept = filter_by_category_and_min_trips(&records, &allowed, 3);
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|r| r.category == LineCategory::U));

        let kept = filter_by_category_and_min_trips(&records, &allowed, 2);
        assert_eq!(kept.len(), records.len());
    }

    #[test]
    fn repeated_times_count_once() {
        let records = vec![record("U6", "C", 0), record("U6", "C", 0)];
        assert!(filter_by_category_and_min_trips(&records, &[LineCategory::U], 2).is_empty());
    }
}
