//! Plain-text tables and bar charts for the reports.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::domain::LineCategory;

use super::route_stats::{Rankings, RouteStats};
use super::time_stats::{DelayHeatmap, HourlyDelay, WEEKDAY_NAMES};

/// Width of the longest bar, in characters.
const BAR_WIDTH: usize = 40;

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.clamp(1, BAR_WIDTH))
}

/// One ranked table: label, value, bar and trip count per row.
fn render_ranking(
    out: &mut String,
    title: &str,
    rows: &[RouteStats],
    value: impl Fn(&RouteStats) -> f64,
    unit: &str,
) {
    let _ = writeln!(out, "{title}");
    if rows.is_empty() {
        let _ = writeln!(out, "  (no data)");
        let _ = writeln!(out);
        return;
    }

    let labels: Vec<String> = rows.iter().map(|s| s.route.to_string()).collect();
    let width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let max = rows.iter().map(&value).fold(0.0_f64, f64::max);

    for (label, stats) in labels.iter().zip(rows) {
        let v = value(stats);
        let _ = writeln!(
            out,
            "  {label:<width$}  {v:>8.2}{unit}  {bar:<bar_width$}  {trips} trips",
            bar = bar(v, max),
            bar_width = BAR_WIDTH,
            trips = stats.unique_trips,
        );
    }
    let _ = writeln!(out);
}

/// All four route rankings.
pub fn render_rankings(rankings: &Rankings, top_n: usize) -> String {
    let mut out = String::new();
    render_ranking(
        &mut out,
        &format!("Average delay by route (top {top_n})"),
        &rankings.by_mean_delay,
        |s| s.mean_delay.unwrap_or(0.0),
        " min",
    );
    render_ranking(
        &mut out,
        &format!("Number of delays by route (top {top_n})"),
        &rankings.by_delay_count,
        |s| s.delayed as f64,
        "",
    );
    render_ranking(
        &mut out,
        &format!("Percentage of delayed stops by route (top {top_n})"),
        &rankings.by_delay_percentage,
        |s| s.delay_percentage,
        " %",
    );
    render_ranking(
        &mut out,
        &format!("Cancellations per station by route (top {top_n})"),
        &rankings.by_cancellation_rate,
        |s| s.cancellations_per_station,
        "",
    );
    out
}

/// Mean delay per hour as a bar chart, one chart per category.
pub fn render_hourly(hourly: &BTreeMap<LineCategory, HourlyDelay>) -> String {
    let mut out = String::new();
    for (category, hours) in hourly {
        let _ = writeln!(out, "{category}: average delay by hour of day (min)");
        let max = hours.iter().flatten().copied().fold(0.0_f64, f64::max);
        for (hour, mean) in hours.iter().enumerate() {
            match mean {
                Some(m) => {
                    let _ = writeln!(out, "  {hour:02}  {m:>6.2}  {}", bar(*m, max));
                }
                None => {
                    let _ = writeln!(out, "  {hour:02}       -");
                }
            }
        }
        let _ = writeln!(out);
    }
    out
}

/// Mean delay per hour (rows) and weekday (columns), one table per category.
pub fn render_heatmap(heatmaps: &BTreeMap<LineCategory, DelayHeatmap>) -> String {
    let mut out = String::new();
    for (category, heatmap) in heatmaps {
        let _ = writeln!(out, "{category}: average delay by hour and weekday (min)");
        let _ = write!(out, "  hr ");
        for day in WEEKDAY_NAMES {
            let _ = write!(out, " {day:>6}");
        }
        let _ = writeln!(out);

        for (hour, row) in heatmap.cells.iter().enumerate() {
            if row.iter().all(Option::is_none) {
                continue;
            }
            let _ = write!(out, "  {hour:02} ");
            for cell in row {
                match cell {
                    Some(m) => {
                        let _ = write!(out, " {m:>6.1}");
                    }
                    None => {
                        let _ = write!(out, " {:>6}", "-");
                    }
                }
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::time_stats::{delay_heatmap, hourly_delay};
    use crate::analysis::route_stats::route_stats;
    use crate::domain::{DepartureEvent, RouteKey};
    use chrono::DateTime;

    fn record(line: &str, time: &str, delay: f64) -> DepartureEvent {
        DepartureEvent::new(
            RouteKey::derive(Some(line), Some("Centre")),
            "A",
            DateTime::parse_from_rfc3339(time).unwrap(),
            false,
            delay,
        )
    }

    #[test]
    fn bar_scales_to_width() {
        assert_eq!(bar(10.0, 10.0).len(), BAR_WIDTH);
        assert_eq!(bar(5.0, 10.0).len(), BAR_WIDTH / 2);
        assert_eq!(bar(0.01, 10.0).len(), 1);
        assert_eq!(bar(0.0, 10.0), "");
        assert_eq!(bar(3.0, 0.0), "");
    }

    #[test]
    fn rankings_table_lists_routes() {
        let records = vec![
            record("U6", "2024-11-04T08:00:00+01:00", 4.0),
            record("U3", "2024-11-04T08:00:00+01:00", 2.0),
        ];
        let rankings = Rankings::compute(&route_stats(&records, 1.0), 1, 20);
        let text = render_rankings(&rankings, 20);

        assert!(text.contains("Average delay by route (top 20)"));
        assert!(text.contains("subway/U6 nach Centre"));
        assert!(text.contains("4.00 min"));
        assert!(text.contains("1 trips"));
        assert!(text.contains("Cancellations per station by route (top 20)\n  (no data)"));

        let u6 = text.find("subway/U6").unwrap();
        let u3 = text.find("subway/U3").unwrap();
        assert!(u6 < u3);
    }

    #[test]
    fn hourly_and_heatmap_render_rows() {
        let records = vec![record("U6", "2024-11-04T08:00:00+01:00", 3.0)];

        let hourly = render_hourly(&hourly_delay(&records));
        assert!(hourly.starts_with("U: average delay by hour of day"));
        assert!(hourly.contains("  08    3.00  #"));
        assert!(hourly.contains("  09       -"));

        let heatmap = render_heatmap(&delay_heatmap(&records));
        assert!(heatmap.contains("Mon"));
        assert!(heatmap.contains("  08     3.0"));
        assert!(!heatmap.contains("  09 "));
    }
}
