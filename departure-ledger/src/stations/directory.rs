//! Distance-banded station lookup.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::domain::{GeoPoint, Station};
use crate::feed::DepartureFeed;

use super::error::DirectoryError;

/// A ring around the center point, in metres (both bounds inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub min_m: Option<u32>,
    pub max_m: u32,
}

/// Split ascending outer radii into non-overlapping bands.
///
/// `[5000, 8000]` becomes `..=5000` and `5001..=8000`.
pub fn bands(edges_m: &[u32]) -> Vec<Band> {
    let mut previous: Option<u32> = None;
    edges_m
        .iter()
        .map(|&max_m| {
            let band = Band {
                min_m: previous.map(|p| p + 1),
                max_m,
            };
            previous = Some(max_m);
            band
        })
        .collect()
}

/// Resolve every station within the outermost band edge.
///
/// Bands are queried innermost first. The feed's bands can overlap at their
/// edges, so a station id already seen in an inner band is dropped. A band
/// that fails to load is logged and skipped; only an empty overall result is
/// an error.
pub async fn stations_in_bands<F: DepartureFeed>(
    feed: &F,
    center: GeoPoint,
    band_edges_m: &[u32],
) -> Result<Vec<Station>, DirectoryError> {
    let mut seen = HashSet::new();
    let mut stations = Vec::new();

    for band in bands(band_edges_m) {
        match feed.nearby(center, band.min_m, Some(band.max_m)).await {
            Ok(found) => {
                let before = stations.len();
                for station in found {
                    if seen.insert(station.id.clone()) {
                        stations.push(station);
                    }
                }
                info!(
                    min_m = ?band.min_m,
                    max_m = band.max_m,
                    added = stations.len() - before,
                    "Resolved station band"
                );
            }
            Err(e) => {
                warn!(
                    min_m = ?band.min_m,
                    max_m = band.max_m,
                    error = %e,
                    "Failed to resolve station band, skipping"
                );
            }
        }
    }

    if stations.is_empty() {
        return Err(DirectoryError::NoStations {
            bands: band_edges_m.len(),
        });
    }

    Ok(stations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedError, ProductFilter, RawDeparture, StaticFeed};
    use chrono::{DateTime, Duration, Utc};

    fn center() -> GeoPoint {
        GeoPoint::new(48.140364, 11.558744)
    }

    #[test]
    fn band_edges() {
        let b = bands(&[5000, 8000, 11000, 13000]);
        assert_eq!(
            b,
            vec![
                Band {
                    min_m: None,
                    max_m: 5000
                },
                Band {
                    min_m: Some(5001),
                    max_m: 8000
                },
                Band {
                    min_m: Some(8001),
                    max_m: 11000
                },
                Band {
                    min_m: Some(11001),
                    max_m: 13000
                },
            ]
        );
        assert!(bands(&[]).is_empty());
    }

    #[tokio::test]
    async fn collects_all_bands_in_order() {
        let feed = StaticFeed::new(vec![
            Station::new("far", "Pasing", GeoPoint::new(48.1497, 11.4616)),
            Station::new("near", "Hauptbahnhof", GeoPoint::new(48.1402, 11.5583)),
        ]);

        let stations = stations_in_bands(&feed, center(), &[5000, 8000]).await.unwrap();
        let ids: Vec<_> = stations.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
    }

    /// Feed whose bands overlap: every query returns the same stations.
    struct OverlappingFeed(Vec<Station>);

    impl DepartureFeed for OverlappingFeed {
        async fn nearby(
            &self,
            _location: GeoPoint,
            _min: Option<u32>,
            _max: Option<u32>,
        ) -> Result<Vec<Station>, FeedError> {
            Ok(self.0.clone())
        }

        async fn departures(
            &self,
            _station_id: &str,
            _window_start: DateTime<Utc>,
            _window: Duration,
            _products: &ProductFilter,
        ) -> Result<Vec<RawDeparture>, FeedError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn deduplicates_across_bands() {
        let feed = OverlappingFeed(vec![
            Station::new("a", "A", center()),
            Station::new("b", "B", center()),
        ]);

        let stations = stations_in_bands(&feed, center(), &[5000, 8000, 11000]).await.unwrap();
        assert_eq!(stations.len(), 2);
    }

    #[tokio::test]
    async fn empty_result_is_an_error() {
        let feed = StaticFeed::new(vec![]);
        let err = stations_in_bands(&feed, center(), &[5000]).await.unwrap_err();
        assert!(matches!(err, DirectoryError::NoStations { bands: 1 }));
    }
}
