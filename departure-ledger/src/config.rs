//! Application configuration, read from a YAML file.
//!
//! Every field has a default, so an empty or missing file gives a working
//! collector for the default area.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use serde::Deserialize;

use crate::collector::CollectorConfig;
use crate::domain::{GeoPoint, LineCategory};
use crate::feed::FeedConfig;
use crate::ledger::DEFAULT_HISTORY_LIMIT;

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "COLLECTOR_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Point the distance bands are centred on
    #[serde(default = "AppConfig::default_center")]
    pub center: GeoPoint,
    /// Ascending outer radii of the station bands, in metres
    #[serde(default = "AppConfig::default_band_edges_m")]
    pub band_edges_m: Vec<u32>,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub collector: CollectorSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            center: Self::default_center(),
            band_edges_m: Self::default_band_edges_m(),
            feed: FeedConfig::default(),
            collector: CollectorSettings::default(),
            storage: StorageSettings::default(),
            analysis: AnalysisSettings::default(),
        }
    }
}

impl AppConfig {
    fn default_center() -> GeoPoint {
        GeoPoint::new(48.140364, 11.558744)
    }
    fn default_band_edges_m() -> Vec<u32> {
        vec![5000, 8000, 11000, 13000]
    }
}

/// Polling cadence
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorSettings {
    /// Seconds between cycles (default: 600)
    #[serde(default = "CollectorSettings::default_interval_secs")]
    pub interval_secs: u64,
    /// Furthest a query window reaches into the past, in minutes (default: 15)
    #[serde(default = "CollectorSettings::default_max_window_mins")]
    pub max_window_mins: i64,
    /// Events kept in memory per (route, station)
    #[serde(default = "CollectorSettings::default_history_limit")]
    pub history_limit: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            max_window_mins: Self::default_max_window_mins(),
            history_limit: Self::default_history_limit(),
        }
    }
}

impl CollectorSettings {
    fn default_interval_secs() -> u64 {
        600
    }
    fn default_max_window_mins() -> i64 {
        15
    }
    fn default_history_limit() -> usize {
        DEFAULT_HISTORY_LIMIT
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory holding snapshots and the checkpoint
    #[serde(default = "StorageSettings::default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
        }
    }
}

impl StorageSettings {
    fn default_data_dir() -> PathBuf {
        PathBuf::from("saved_trips")
    }
}

/// Offline report settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSettings {
    /// Snapshot directories to read; empty means the storage directory
    #[serde(default)]
    pub data_dirs: Vec<PathBuf>,
    /// Where standardized records are cached between runs
    #[serde(default = "AnalysisSettings::default_standardized_cache")]
    pub standardized_cache: PathBuf,
    /// Line categories included in the reports
    #[serde(default = "AnalysisSettings::default_allowed_categories")]
    pub allowed_categories: Vec<LineCategory>,
    /// Routes with fewer distinct trips are dropped
    #[serde(default = "AnalysisSettings::default_min_trips")]
    pub min_trips: usize,
    /// Delays above this many minutes count as delayed
    #[serde(default = "AnalysisSettings::default_delay_threshold_mins")]
    pub delay_threshold_mins: f64,
    /// Rows per ranking
    #[serde(default = "AnalysisSettings::default_top_n")]
    pub top_n: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            data_dirs: Vec::new(),
            standardized_cache: Self::default_standardized_cache(),
            allowed_categories: Self::default_allowed_categories(),
            min_trips: Self::default_min_trips(),
            delay_threshold_mins: Self::default_delay_threshold_mins(),
            top_n: Self::default_top_n(),
        }
    }
}

impl AnalysisSettings {
    fn default_standardized_cache() -> PathBuf {
        PathBuf::from("standardized_data.json")
    }
    fn default_allowed_categories() -> Vec<LineCategory> {
        vec![LineCategory::Str, LineCategory::Bus, LineCategory::U]
    }
    fn default_min_trips() -> usize {
        3
    }
    fn default_delay_threshold_mins() -> f64 {
        1.0
    }
    fn default_top_n() -> usize {
        20
    }
}

impl AppConfig {
    /// Read a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.as_ref().display())))?;

        Self::parse(&content)
    }

    /// Read the config at `path`, or at `$COLLECTOR_CONFIG` when no path is
    /// given. A file that does not exist yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => PathBuf::from(path),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject values the collector cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.band_edges_m.is_empty() {
            return Err(ConfigError::Invalid("band_edges_m must not be empty".into()));
        }
        if self.band_edges_m.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::Invalid(
                "band_edges_m must be strictly ascending".into(),
            ));
        }
        if self.collector.interval_secs == 0 {
            return Err(ConfigError::Invalid("collector.interval_secs must be positive".into()));
        }
        if self.collector.max_window_mins <= 0 {
            return Err(ConfigError::Invalid("collector.max_window_mins must be positive".into()));
        }
        if self.feed.max_concurrent == 0 {
            return Err(ConfigError::Invalid("feed.max_concurrent must be positive".into()));
        }
        if self.feed.timeout_secs == 0 {
            return Err(ConfigError::Invalid("feed.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Loop parameters drawn from the collector and feed sections.
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig::default()
            .with_interval(StdDuration::from_secs(self.collector.interval_secs))
            .with_max_window(chrono::Duration::minutes(self.collector.max_window_mins))
            .with_request_timeout(self.feed.timeout())
            .with_max_concurrent_requests(self.feed.max_concurrent)
            .with_history_limit(self.collector.history_limit)
            .with_products(self.feed.products.clone())
    }

    /// Directories the analysis reads, falling back to the storage directory.
    pub fn analysis_dirs(&self) -> Vec<PathBuf> {
        if self.analysis.data_dirs.is_empty() {
            vec![self.storage.data_dir.clone()]
        } else {
            self.analysis.data_dirs.clone()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(String),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}
