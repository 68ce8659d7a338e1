//! Delay by time of day and day of week, per line category.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike};
use serde::Serialize;

use crate::domain::{DepartureEvent, LineCategory};

pub const HOURS: usize = 24;
pub const WEEKDAYS: usize = 7;

/// Weekday labels, Monday first.
pub const WEEKDAY_NAMES: [&str; WEEKDAYS] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn value(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Mean delay for each hour of the day; `None` where nothing departed.
pub type HourlyDelay = [Option<f64>; HOURS];

/// Mean delay indexed by `[hour][weekday]`, Monday = 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayHeatmap {
    pub cells: [[Option<f64>; WEEKDAYS]; HOURS],
}

impl DelayHeatmap {
    pub fn get(&self, hour: usize, weekday: usize) -> Option<f64> {
        self.cells.get(hour)?.get(weekday).copied().flatten()
    }
}

/// Mean delay per hour of scheduled local time, for each category.
///
/// Cancelled departures are left out.
pub fn hourly_delay(records: &[DepartureEvent]) -> BTreeMap<LineCategory, HourlyDelay> {
    let mut acc: BTreeMap<&LineCategory, [Mean; HOURS]> = BTreeMap::new();

    for record in records.iter().filter(|r| !r.is_cancelled) {
        let hour = record.scheduled_time.hour() as usize;
        acc.entry(&record.category).or_insert([Mean::default(); HOURS])[hour].add(record.delay_minutes);
    }

    acc.into_iter()
        .map(|(category, hours)| (category.clone(), hours.map(Mean::value)))
        .collect()
}

/// Mean delay per (hour, weekday) of scheduled local time, for each
/// category. Cancelled departures are left out.
pub fn delay_heatmap(records: &[DepartureEvent]) -> BTreeMap<LineCategory, DelayHeatmap> {
    let mut acc: BTreeMap<&LineCategory, [[Mean; WEEKDAYS]; HOURS]> = BTreeMap::new();

    for record in records.iter().filter(|r| !r.is_cancelled) {
        let time = record.scheduled_time;
        let hour = time.hour() as usize;
        let weekday = time.weekday().num_days_from_monday() as usize;
        acc.entry(&record.category)
            .or_insert([[Mean::default(); WEEKDAYS]; HOURS])[hour][weekday]
            .add(record.delay_minutes);
    }

    acc.into_iter()
        .map(|(category, grid)| {
            let cells = grid.map(|row| row.map(Mean::value));
            (category.clone(), DelayHeatmap { cells })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RouteKey;
    use chrono::DateTime;

    fn record(line: &str, time: &str, cancelled: bool, delay: f64) -> DepartureEvent {
        DepartureEvent::new(
            RouteKey::derive(Some(line), Some("Centre")),
            "A",
            DateTime::parse_from_rfc3339(time).unwrap(),
            cancelled,
            delay,
        )
    }

    #[test]
    fn hourly_uses_local_hour_and_skips_cancelled() {
        let records = vec![
            // Monday 4 Nov 2024
            record("U6", "2024-11-04T08:10:00+01:00", false, 2.0),
            record("U6", "2024-11-04T08:50:00+01:00", false, 4.0),
            record("U6", "2024-11-04T08:55:00+01:00", true, 60.0),
            record("U6", "2024-11-04T17:00:00+01:00", false, 1.0),
            record("Bus 52", "2024-11-04T08:00:00+01:00", false, 10.0),
        ];
        let hourly = hourly_delay(&records);

        let u = &hourly[&LineCategory::U];
        assert_eq!(u[8], Some(3.0));
        assert_eq!(u[17], Some(1.0));
        assert_eq!(u[9], None);
        assert_eq!(hourly[&LineCategory::Bus][8], Some(10.0));
        assert_eq!(hourly.len(), 2);
    }

    #[test]
    fn heatmap_by_hour_and_weekday() {
        let records = vec![
            record("STR 19", "2024-11-04T08:00:00+01:00", false, 2.0),
            record("STR 19", "2024-11-11T08:30:00+01:00", false, 4.0),
            record("STR 19", "2024-11-10T23:30:00+01:00", false, 1.0),
        ];
        let heatmap = delay_heatmap(&records);
        let grid = &heatmap[&LineCategory::Str];

        assert_eq!(grid.get(8, 0), Some(3.0));
        assert_eq!(grid.get(23, 6), Some(1.0));
        assert_eq!(grid.get(8, 1), None);
        assert_eq!(grid.get(99, 0), None);
    }
}
