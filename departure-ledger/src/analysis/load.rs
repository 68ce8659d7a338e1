//! Loading the recorded corpus.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::DepartureEvent;
use crate::store::{SnapshotStore, StoreError, write_atomic};

/// Every readable event in every snapshot directory, in directory order.
///
/// Missing or unreadable directories are skipped with a warning, as are
/// corrupt snapshots inside them. The checkpoint is never read.
pub fn load_corpus(dirs: &[PathBuf]) -> Vec<DepartureEvent> {
    let mut events = Vec::new();

    for dir in dirs {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Snapshot directory does not exist, skipping");
            continue;
        }
        match SnapshotStore::at(dir).read_all() {
            Ok(batch) => {
                info!(dir = %dir.display(), events = batch.len(), "Loaded snapshots");
                events.extend(batch);
            }
            Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to list snapshots, skipping"),
        }
    }

    events
}

/// Standardized events from `cache`, or from the corpus when there is no
/// usable cache yet.
///
/// A freshly loaded corpus is written to `cache` for the next run. A cache
/// that cannot be read or written is logged and otherwise ignored.
pub fn load_or_standardize(dirs: &[PathBuf], cache: &Path) -> Vec<DepartureEvent> {
    if cache.is_file() {
        match read_cache(cache) {
            Ok(events) => {
                info!(path = %cache.display(), events = events.len(), "Loaded standardized cache");
                return events;
            }
            Err(e) => warn!(path = %cache.display(), error = %e, "Unreadable standardized cache, rebuilding"),
        }
    }

    let events = load_corpus(dirs);

    if let Some(parent) = cache.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(path = %parent.display(), error = %e, "Failed to create cache directory");
    }
    match write_atomic(cache, &events) {
        Ok(()) => info!(path = %cache.display(), events = events.len(), "Standardized cache written"),
        Err(e) => warn!(path = %cache.display(), error = %e, "Failed to write standardized cache"),
    }

    events
}

fn read_cache(path: &Path) -> Result<Vec<DepartureEvent>, StoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| StoreError::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RouteKey;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn event(minutes: i64) -> DepartureEvent {
        DepartureEvent::new(
            RouteKey::derive(Some("U6"), Some("Klinikum")),
            "Marienplatz",
            DateTime::parse_from_rfc3339("2024-11-04T08:00:00+01:00").unwrap() + Duration::minutes(minutes),
            false,
            0.5,
        )
    }

    #[test]
    fn corpus_concatenates_directories() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        let cycle = Utc.with_ymd_and_hms(2024, 11, 4, 7, 0, 0).unwrap();

        SnapshotStore::new(a.path()).unwrap().write_snapshot(cycle, &[event(0)]).unwrap();
        let store_b = SnapshotStore::new(b.path()).unwrap();
        store_b.write_snapshot(cycle, &[event(5)]).unwrap();
        store_b
            .write_ledger_checkpoint(&crate::ledger::LedgerState::default())
            .unwrap();

        let dirs = vec![
            a.path().to_path_buf(),
            a.path().join("missing"),
            b.path().to_path_buf(),
        ];
        let events = load_corpus(&dirs);
        assert_eq!(events, vec![event(0), event(5)]);
    }

    #[test]
    fn cache_is_written_then_preferred() {
        let data = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        let cache = cache_dir.path().join("reports").join("standardized.json");
        let cycle = Utc.with_ymd_and_hms(2024, 11, 4, 7, 0, 0).unwrap();

        let store = SnapshotStore::new(data.path()).unwrap();
        store.write_snapshot(cycle, &[event(0)]).unwrap();

        let dirs = vec![data.path().to_path_buf()];
        assert_eq!(load_or_standardize(&dirs, &cache), vec![event(0)]);
        assert!(cache.is_file());

        // New data is ignored while the cache exists
        store.write_snapshot(cycle + Duration::minutes(10), &[event(10)]).unwrap();
        assert_eq!(load_or_standardize(&dirs, &cache), vec![event(0)]);

        std::fs::remove_file(&cache).unwrap();
        assert_eq!(load_or_standardize(&dirs, &cache).len(), 2);
    }

    #[test]
    fn corrupt_cache_is_rebuilt() {
        let data = tempdir().unwrap();
        let cache = data.path().join("standardized.json");
        std::fs::write(&cache, "not json").unwrap();

        let store = SnapshotStore::new(data.path()).unwrap();
        store
            .write_snapshot(Utc.with_ymd_and_hms(2024, 11, 4, 7, 0, 0).unwrap(), &[event(0)])
            .unwrap();

        assert!(matches!(read_cache(&cache), Err(StoreError::Json { .. })));
        assert_eq!(load_or_standardize(&[data.path().to_path_buf()], &cache), vec![event(0)]);
    }

    #[test]
    fn missing_cache_is_an_io_error() {
        let data = tempdir().unwrap();
        let cache = data.path().join("absent.json");
        match read_cache(&cache) {
            Err(StoreError::Io { path, .. }) => assert_eq!(path, cache),
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
