//! Per-route delay and cancellation statistics, and rankings over them.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::domain::{DepartureEvent, RouteKey};

/// Aggregates for one route across all its stations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStats {
    pub route: RouteKey,
    /// Distinct scheduled times at the first station the route was seen at.
    pub unique_trips: usize,
    /// Non-cancelled records.
    pub stops: usize,
    /// Mean delay over `stops`, if there were any.
    pub mean_delay: Option<f64>,
    /// Stops delayed by more than the threshold.
    pub delayed: usize,
    pub delay_percentage: f64,
    pub cancellations: usize,
    pub stations: usize,
    pub cancellations_per_station: f64,
}

#[derive(Default)]
struct Accumulator<'a> {
    first_station: Option<&'a str>,
    trips: HashSet<chrono::DateTime<chrono::FixedOffset>>,
    stations: HashSet<&'a str>,
    stops: usize,
    delay_sum: f64,
    delayed: usize,
    cancellations: usize,
}

/// Statistics for every route in `records`, ordered by route key.
///
/// A stop counts as delayed when its delay exceeds `delay_threshold_mins`.
pub fn route_stats(records: &[DepartureEvent], delay_threshold_mins: f64) -> Vec<RouteStats> {
    let mut routes: BTreeMap<&RouteKey, Accumulator<'_>> = BTreeMap::new();

    for record in records {
        let acc = routes.entry(&record.route_key).or_default();
        let station = record.station_name.as_str();

        let first = *acc.first_station.get_or_insert(station);
        if first == station {
            acc.trips.insert(record.scheduled_time);
        }
        acc.stations.insert(station);

        if record.is_cancelled {
            acc.cancellations += 1;
            continue;
        }
        acc.stops += 1;
        acc.delay_sum += record.delay_minutes;
        if record.delay_minutes > delay_threshold_mins {
            acc.delayed += 1;
        }
    }

    routes
        .into_iter()
        .map(|(route, acc)| {
            let stops = acc.stops as f64;
            RouteStats {
                route: route.clone(),
                unique_trips: acc.trips.len(),
                stops: acc.stops,
                mean_delay: (acc.stops > 0).then(|| acc.delay_sum / stops),
                delayed: acc.delayed,
                delay_percentage: if acc.stops > 0 {
                    acc.delayed as f64 / stops * 100.0
                } else {
                    0.0
                },
                cancellations: acc.cancellations,
                stations: acc.stations.len(),
                cancellations_per_station: acc.cancellations as f64 / acc.stations.len().max(1) as f64,
            }
        })
        .collect()
}

/// Top routes by each measure, highest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rankings {
    pub by_mean_delay: Vec<RouteStats>,
    /// Only routes with at least one delayed stop.
    pub by_delay_count: Vec<RouteStats>,
    pub by_delay_percentage: Vec<RouteStats>,
    /// Only routes with at least one cancellation.
    pub by_cancellation_rate: Vec<RouteStats>,
}

impl Rankings {
    /// Rank routes with at least `min_trips` unique trips, keeping `top_n`
    /// of each.
    pub fn compute(stats: &[RouteStats], min_trips: usize, top_n: usize) -> Self {
        let eligible: Vec<&RouteStats> = stats.iter().filter(|s| s.unique_trips >= min_trips).collect();

        Self {
            by_mean_delay: top(&eligible, top_n, |s| s.mean_delay),
            by_delay_count: top(&eligible, top_n, |s| (s.delayed > 0).then_some(s.delayed as f64)),
            by_delay_percentage: top(&eligible, top_n, |s| (s.stops > 0).then_some(s.delay_percentage)),
            by_cancellation_rate: top(&eligible, top_n, |s| {
                (s.cancellations > 0).then_some(s.cancellations_per_station)
            }),
        }
    }
}

/// Routes with a value for `metric`, sorted by it descending then by route.
fn top(stats: &[&RouteStats], n: usize, metric: impl Fn(&RouteStats) -> Option<f64>) -> Vec<RouteStats> {
    let mut ranked: Vec<(f64, &RouteStats)> = stats
        .iter()
        .filter_map(|&s| metric(s).map(|value| (value, s)))
        .collect();

    ranked.sort_by(|(a, ra), (b, rb)| match b.total_cmp(a) {
        Ordering::Equal => ra.route.cmp(&rb.route),
        other => other,
    });

    ranked.into_iter().take(n).map(|(_, s)| s.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    fn record(line: &str, station: &str, minutes: i64, cancelled: bool, delay: f64) -> DepartureEvent {
        DepartureEvent::new(
            RouteKey::derive(Some(line), Some("Centre")),
            station,
            DateTime::parse_from_rfc3339("2024-11-04T08:00:00+01:00").unwrap() + Duration::minutes(minutes),
            cancelled,
            delay,
        )
    }

    fn route(line: &str) -> RouteKey {
        RouteKey::derive(Some(line), Some("Centre"))
    }

    #[test]
    fn aggregates_one_route() {
        let records = vec![
            record("U6", "A", 0, false, 0.0),
            record("U6", "A", 10, false, 4.0),
            record("U6", "B", 2, false, 2.0),
            record("U6", "B", 12, true, 0.0),
        ];
        let stats = route_stats(&records, 1.0);
        assert_eq!(stats.len(), 1);

        let s = &stats[0];
        assert_eq!(s.route, route("U6"));
        assert_eq!(s.unique_trips, 2);
        assert_eq!(s.stops, 3);
        assert_eq!(s.mean_delay, Some(2.0));
        assert_eq!(s.delayed, 2);
        assert!((s.delay_percentage - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.cancellations, 1);
        assert_eq!(s.stations, 2);
        assert_eq!(s.cancellations_per_station, 0.5);
    }

    #[test]
    fn fully_cancelled_route_has_no_mean() {
        let stats = route_stats(&[record("Bus 52", "A", 0, true, 0.0)], 1.0);
        assert_eq!(stats[0].mean_delay, None);
        assert_eq!(stats[0].delay_percentage, 0.0);
        assert_eq!(stats[0].unique_trips, 1);
    }

    #[test]
    fn delay_at_threshold_is_not_delayed() {
        let stats = route_stats(&[record("U6", "A", 0, false, 1.0)], 1.0);
        assert_eq!(stats[0].delayed, 0);
    }

    #[test]
    fn rankings_order_and_filter() {
        let mut records = Vec::new();
        for m in 0..3 {
            records.push(record("U6", "A", m * 10, false, 5.0));
            records.push(record("U3", "A", m * 10, false, 0.0));
            records.push(record("Bus 52", "A", m * 10, m == 0, 2.0));
        }
        // below min_trips
        records.push(record("STR 19", "A", 0, false, 30.0));

        let stats = route_stats(&records, 1.0);
        let rankings = Rankings::compute(&stats, 3, 10);

        let names = |list: &[RouteStats]| list.iter().map(|s| s.route.line().to_string()).collect::<Vec<_>>();
        assert_eq!(names(&rankings.by_mean_delay), vec!["U6", "Bus 52", "U3"]);
        assert_eq!(names(&rankings.by_delay_count), vec!["U6", "Bus 52"]);
        assert_eq!(names(&rankings.by_delay_percentage), vec!["Bus 52", "U6", "U3"]);
        assert_eq!(names(&rankings.by_cancellation_rate), vec!["Bus 52"]);

        let top_one = Rankings::compute(&stats, 3, 1);
        assert_eq!(names(&top_one.by_mean_delay), vec!["U6"]);
    }
}
