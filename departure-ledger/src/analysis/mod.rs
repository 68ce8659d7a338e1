//! Offline reports over the recorded snapshots.
//!
//! Everything here is a pure function over a slice of standardized
//! records: load, filter, then aggregate. Nothing is shared between
//! reports.

mod filter;
mod load;
mod render;
mod route_stats;
mod time_stats;

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::info;

use crate::config::AnalysisSettings;
use crate::domain::LineCategory;

pub use filter::filter_by_category_and_min_trips;
pub use load::{load_corpus, load_or_standardize};
pub use render::{render_heatmap, render_hourly, render_rankings};
pub use route_stats::{Rankings, RouteStats, route_stats};
pub use time_stats::{
    DelayHeatmap, HOURS, HourlyDelay, WEEKDAY_NAMES, WEEKDAYS, delay_heatmap, hourly_delay,
};

/// Every report for one corpus.
#[derive(Debug, Clone)]
pub struct Report {
    pub total_records: usize,
    pub filtered_records: usize,
    pub rankings: Rankings,
    pub hourly: BTreeMap<LineCategory, HourlyDelay>,
    pub heatmaps: BTreeMap<LineCategory, DelayHeatmap>,
    top_n: usize,
}

impl Report {
    /// Load the corpus (through the standardized cache) and build the reports.
    pub fn build(settings: &AnalysisSettings, dirs: &[PathBuf]) -> Self {
        let records = load_or_standardize(dirs, &settings.standardized_cache);
        let filtered = filter_by_category_and_min_trips(
            &records,
            &settings.allowed_categories,
            settings.min_trips,
        );
        info!(
            total = records.len(),
            kept = filtered.len(),
            "Filtered records by category and trip count"
        );

        let stats = route_stats(&filtered, settings.delay_threshold_mins);
        Self {
            total_records: records.len(),
            filtered_records: filtered.len(),
            rankings: Rankings::compute(&stats, settings.min_trips, settings.top_n),
            hourly: hourly_delay(&filtered),
            heatmaps: delay_heatmap(&filtered),
            top_n: settings.top_n,
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "{} records, {} after filtering\n\n",
            self.total_records, self.filtered_records
        );
        out.push_str(&render_rankings(&self.rankings, self.top_n));
        out.push_str(&render_hourly(&self.hourly));
        out.push_str(&render_heatmap(&self.heatmaps));
        out
    }
}
