//! HAFAS REST bridge HTTP client.
//!
//! Provides async methods for the nearby-stations and departures endpoints
//! of a HAFAS REST bridge. Handles concurrency limiting and conversion to
//! raw departures.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::domain::{GeoPoint, Station, TransportKind};

use super::convert::{convert_board, convert_location};
use super::error::FeedError;
use super::types::{DeparturesResponse, LocationDto};
use super::{DepartureFeed, ProductFilter, RawDeparture};

/// Default base URL of the REST bridge.
const DEFAULT_BASE_URL: &str = "https://v6.db.transport.rest";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Upper bound on stations returned by one nearby query.
const NEARBY_RESULTS: u32 = 1000;

/// Configuration for the REST feed client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the REST bridge
    pub base_url: String,
    /// Maximum concurrent requests
    #[serde(alias = "max_concurrent_requests")]
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Products to request departures for
    pub products: ProductFilter,
}

impl FeedConfig {
    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.timeout_secs)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
            products: ProductFilter::default(),
        }
    }
}

/// REST bridge client.
///
/// Uses a semaphore to limit concurrent requests and avoid rate limiting.
#[derive(Debug, Clone)]
pub struct RestFeedClient {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl RestFeedClient {
    /// Create a new client with the given configuration.
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }

    /// GET a JSON document, mapping status codes to feed errors.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FeedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FeedError::Api {
                status: 0,
                message: "Semaphore closed".to_string(),
            })?;

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FeedError::UnknownStation(url.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| FeedError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }
}

/// Query flags for the bridge's product parameters.
fn product_params(products: &ProductFilter) -> Vec<(&'static str, String)> {
    let flag = |kinds: &[TransportKind]| kinds.iter().any(|k| products.contains(k)).to_string();

    vec![
        ("nationalExpress", flag(&[TransportKind::LongDistanceExpress])),
        ("national", flag(&[TransportKind::LongDistanceExpress])),
        ("regionalExpress", flag(&[TransportKind::RegionalExpress])),
        ("regional", flag(&[TransportKind::Regional])),
        ("suburban", flag(&[TransportKind::SuburbanRail])),
        ("bus", flag(&[TransportKind::Bus, TransportKind::NightBus])),
        ("ferry", "false".to_string()),
        ("subway", flag(&[TransportKind::Subway])),
        ("tram", flag(&[TransportKind::Tram])),
        ("taxi", "false".to_string()),
    ]
}

impl DepartureFeed for RestFeedClient {
    async fn nearby(
        &self,
        location: GeoPoint,
        min_distance_m: Option<u32>,
        max_distance_m: Option<u32>,
    ) -> Result<Vec<Station>, FeedError> {
        let url = format!("{}/locations/nearby", self.base_url);

        let mut query = vec![
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("results", NEARBY_RESULTS.to_string()),
            ("stops", "true".to_string()),
            ("poi", "false".to_string()),
            ("linesOfStops", "false".to_string()),
        ];
        if let Some(max) = max_distance_m {
            query.push(("distance", max.to_string()));
        }

        let locations: Vec<LocationDto> = self.get_json(&url, &query).await?;

        // The bridge has no lower bound parameter; filter on reported distance
        let stations = locations
            .iter()
            .filter(|dto| match (min_distance_m, dto.distance) {
                (Some(min), Some(distance)) => distance >= min,
                _ => true,
            })
            .filter_map(convert_location)
            .collect();

        Ok(stations)
    }

    async fn departures(
        &self,
        station_id: &str,
        window_start: DateTime<Utc>,
        window: Duration,
        products: &ProductFilter,
    ) -> Result<Vec<RawDeparture>, FeedError> {
        let url = format!("{}/stops/{}/departures", self.base_url, station_id);

        let mut query = vec![
            ("when", window_start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("duration", window_minutes(window).to_string()),
            ("remarks", "false".to_string()),
        ];
        query.extend(product_params(products));

        let response: DeparturesResponse = self.get_json(&url, &query).await?;

        Ok(convert_board(&response, station_id))
    }
}

/// Query duration in whole minutes, rounded up so no part of the window
/// goes unrequested.
fn window_minutes(window: Duration) -> i64 {
    ((window.num_seconds() + 59) / 60).max(1)
}
