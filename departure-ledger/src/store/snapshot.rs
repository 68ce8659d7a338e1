//! Directory-backed snapshot and checkpoint files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::StoreError;
use super::record::RawRecord;
use crate::domain::{DepartureEvent, EventRecord, RouteKey};
use crate::ledger::LedgerState;

/// Name of the ledger checkpoint inside the store directory.
pub const CHECKPOINT_FILE: &str = "checkpoint.json";

const SNAPSHOT_PREFIX: &str = "snapshot_";
const SNAPSHOT_TIME_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Older collectors named their batches `saved_trips_<y>_<m>_<d>_<h>_<min>`
/// without padding.
const LEGACY_PREFIX: &str = "saved_trips_";
const LEGACY_TIME_FORMAT: &str = "%Y_%m_%d_%H_%M";

/// A snapshot file found in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotHandle {
    /// Cycle the snapshot was written for.
    pub cycle: DateTime<Utc>,
    pub path: PathBuf,
}

impl SnapshotHandle {
    /// Recognise a snapshot by its file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(".json")?;

        let naive = if let Some(ts) = stem.strip_prefix(SNAPSHOT_PREFIX) {
            NaiveDateTime::parse_from_str(ts, SNAPSHOT_TIME_FORMAT).ok()?
        } else if let Some(ts) = stem.strip_prefix(LEGACY_PREFIX) {
            NaiveDateTime::parse_from_str(ts, LEGACY_TIME_FORMAT).ok()?
        } else {
            return None;
        };

        Some(Self {
            cycle: naive.and_utc(),
            path: path.to_path_buf(),
        })
    }
}

/// File name of the snapshot for `cycle`.
pub fn snapshot_file_name(cycle: DateTime<Utc>) -> String {
    format!("{SNAPSHOT_PREFIX}{}.json", cycle.format(SNAPSHOT_TIME_FORMAT))
}

/// On-disk layout: route key, then station name, then records.
type SnapshotLayout = BTreeMap<RouteKey, BTreeMap<String, Vec<EventRecord>>>;

/// Snapshot files plus the ledger checkpoint, all in one directory.
///
/// Every write goes to a temporary file that is then renamed over the
/// target, so a reader never sees a half-written file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store, creating its directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Open a store for reading without touching the filesystem.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the events accepted in one cycle.
    ///
    /// Writing the same cycle again replaces the earlier file.
    pub fn write_snapshot(
        &self,
        cycle: DateTime<Utc>,
        events: &[DepartureEvent],
    ) -> Result<SnapshotHandle, StoreError> {
        let mut layout = SnapshotLayout::new();
        for event in events {
            layout
                .entry(event.route_key.clone())
                .or_default()
                .entry(event.station_name.clone())
                .or_default()
                .push(event.record());
        }

        let path = self.dir.join(snapshot_file_name(cycle));
        write_atomic(&path, &layout)?;
        debug!(path = %path.display(), events = events.len(), "Snapshot written");

        Ok(SnapshotHandle {
            // file names have second resolution
            cycle: SnapshotHandle::from_path(&path).map_or(cycle, |h| h.cycle),
            path,
        })
    }

    /// Replace the checkpoint with `state`.
    pub fn write_ledger_checkpoint(&self, state: &LedgerState) -> Result<(), StoreError> {
        write_atomic(&self.checkpoint_path(), state)
    }

    /// Read the checkpoint, if one has been written.
    pub fn read_ledger_checkpoint(&self) -> Result<Option<LedgerState>, StoreError> {
        let path = self.checkpoint_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::json(&path, e))
    }

    /// All snapshots in the directory, oldest first.
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotHandle>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let mut handles = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&self.dir, e))?.path();
            match SnapshotHandle::from_path(&path) {
                Some(handle) => handles.push(handle),
                None => debug!(path = %path.display(), "Skipping non-snapshot file"),
            }
        }

        handles.sort();
        Ok(handles)
    }

    /// Read one snapshot.
    ///
    /// Records in an unrecognised shape, or filed under a route key that
    /// does not parse, are skipped with a warning.
    pub fn read_snapshot(&self, handle: &SnapshotHandle) -> Result<Vec<DepartureEvent>, StoreError> {
        let path = &handle.path;
        let contents = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| StoreError::json(path, e))?;

        let corrupt = |reason: &str| StoreError::Corrupt {
            path: path.clone(),
            reason: reason.to_string(),
        };

        let routes = value.as_object().ok_or_else(|| corrupt("expected an object of routes"))?;

        let mut events = Vec::new();
        let mut skipped = 0usize;

        for (key, stations) in routes {
            let stations = stations
                .as_object()
                .ok_or_else(|| corrupt("expected an object of stations"))?;

            let route_key = match key.parse::<RouteKey>() {
                Ok(route_key) => route_key,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping route with unreadable key");
                    skipped += stations
                        .values()
                        .map(|records| records.as_array().map_or(1, Vec::len))
                        .sum::<usize>();
                    continue;
                }
            };

            for (station, records) in stations {
                let records = records
                    .as_array()
                    .ok_or_else(|| corrupt("expected an array of records"))?;

                for record in records {
                    match RawRecord::parse(record) {
                        Ok(raw) => events.push(raw.into_event(route_key.clone(), station.as_str())),
                        Err(e) => {
                            debug!(route = %route_key, station = %station, error = %e, "Unreadable record");
                            skipped += 1;
                        }
                    }
                }
            }
        }

        if skipped > 0 {
            warn!(path = %path.display(), skipped, kept = events.len(), "Skipped unreadable records");
        }

        Ok(events)
    }

    /// Every readable event in the store, oldest snapshot first.
    ///
    /// Snapshots that cannot be read at all are skipped with a warning.
    pub fn read_all(&self) -> Result<Vec<DepartureEvent>, StoreError> {
        let mut events = Vec::new();
        for handle in self.list_snapshots()? {
            match self.read_snapshot(&handle) {
                Ok(batch) => events.extend(batch),
                Err(e) => warn!(error = %e, "Skipping unreadable snapshot"),
            }
        }
        Ok(events)
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_FILE)
    }
}

pub(crate) fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(path, e))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};
    use tempfile::tempdir;

    fn cycle() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 4, 7, 20, 0).unwrap()
    }

    fn at(minutes: i64) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-11-04T08:00:00+01:00").unwrap() + Duration::minutes(minutes)
    }

    fn event(line: &str, station: &str, minutes: i64) -> DepartureEvent {
        DepartureEvent::new(RouteKey::derive(Some(line), Some("Airport")), station, at(minutes), false, 1.5)
    }

    #[test]
    fn snapshot_file_name_format() {
        assert_eq!(snapshot_file_name(cycle()), "snapshot_2024_11_04_07_20_00.json");
    }

    #[test]
    fn recognises_snapshot_names() {
        let handle = SnapshotHandle::from_path(Path::new("/data/snapshot_2024_11_04_07_20_00.json")).unwrap();
        assert_eq!(handle.cycle, cycle());

        let legacy = SnapshotHandle::from_path(Path::new("saved_trips_2024_11_4_7_20.json")).unwrap();
        assert_eq!(legacy.cycle, cycle());

        assert!(SnapshotHandle::from_path(Path::new("checkpoint.json")).is_none());
        assert!(SnapshotHandle::from_path(Path::new("snapshot_2024_11_04_07_20_00.json.tmp")).is_none());
        assert!(SnapshotHandle::from_path(Path::new("snapshot_yesterday.json")).is_none());
        assert!(SnapshotHandle::from_path(Path::new("notes.txt")).is_none());
    }

    #[test]
    fn write_and_read_snapshot() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        let events = vec![
            event("S1", "Central", 0),
            event("S1", "Central", 10),
            event("U6", "Harbour", 5),
        ];
        let handle = store.write_snapshot(cycle(), &events).unwrap();
        assert_eq!(handle.cycle, cycle());

        let mut back = store.read_snapshot(&handle).unwrap();
        back.sort_by(|a, b| (&a.station_name, a.scheduled_time).cmp(&(&b.station_name, b.scheduled_time)));
        assert_eq!(back, events);
    }

    #[test]
    fn rewriting_a_cycle_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        let events = vec![event("S1", "Central", 0)];

        store.write_snapshot(cycle(), &events).unwrap();
        store.write_snapshot(cycle(), &events).unwrap();

        let handles = store.list_snapshots().unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(store.read_all().unwrap(), events);
    }

    #[test]
    fn list_is_sorted_and_skips_other_files() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        store.write_snapshot(cycle() + Duration::minutes(10), &[]).unwrap();
        store.write_snapshot(cycle(), &[]).unwrap();
        store.write_ledger_checkpoint(&LedgerState::default()).unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let cycles: Vec<_> = store.list_snapshots().unwrap().into_iter().map(|h| h.cycle).collect();
        assert_eq!(cycles, vec![cycle(), cycle() + Duration::minutes(10)]);
    }

    #[test]
    fn checkpoint_roundtrip() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested")).unwrap();
        assert_eq!(store.read_ledger_checkpoint().unwrap(), None);

        let mut routes = BTreeMap::new();
        routes.insert(
            RouteKey::derive(Some("S1"), Some("Airport")),
            BTreeMap::from([("Central".to_string(), event("S1", "Central", 0).record())]),
        );
        let state = LedgerState {
            cycle: Some(cycle()),
            routes,
        };
        store.write_ledger_checkpoint(&state).unwrap();
        assert_eq!(store.read_ledger_checkpoint().unwrap(), Some(state));
    }

    #[test]
    fn unreadable_checkpoint_is_an_error() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        fs::write(dir.path().join(CHECKPOINT_FILE), "{ not json").unwrap();
        assert!(matches!(store.read_ledger_checkpoint(), Err(StoreError::Json { .. })));
    }

    #[test]
    fn read_all_skips_corrupt_files() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        store.write_snapshot(cycle(), &[event("S1", "Central", 0)]).unwrap();
        fs::write(dir.path().join("snapshot_2024_11_04_07_30_00.json"), "[1, 2").unwrap();
        fs::write(dir.path().join("snapshot_2024_11_04_07_40_00.json"), "[1, 2]").unwrap();
        store
            .write_snapshot(cycle() + Duration::minutes(30), &[event("S1", "Central", 30)])
            .unwrap();

        let events = store.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].scheduled_time, at(0));
        assert_eq!(events[1].scheduled_time, at(30));
    }

    #[test]
    fn reads_legacy_shapes_and_skips_bad_records() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        let legacy = serde_json::json!({
            "S1 nach Airport": {
                "Central": [
                    ["S1", "2024-11-04T08:00:00+01:00", false, 2],
                    ["2024-11-04T07:10:00", true, {"seconds": 90}],
                    ["S1", "2024-11-04T08:20:00+01:00"]
                ]
            },
            "no separator here": {
                "Central": [["S1", "2024-11-04T08:00:00+01:00", false, 2]]
            }
        });
        let path = dir.path().join("saved_trips_2024_11_4_7_20.json");
        fs::write(&path, legacy.to_string()).unwrap();

        let handles = store.list_snapshots().unwrap();
        assert_eq!(handles.len(), 1);

        let events = store.read_snapshot(&handles[0]).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].delay_minutes, 2.0);
        assert!(events[1].is_cancelled);
        assert_eq!(events[1].delay_minutes, 1.5);
        assert_eq!(events[0].route_key, RouteKey::derive(Some("S1"), Some("Airport")));
    }

    #[test]
    fn wrong_layout_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        let path = dir.path().join("snapshot_2024_11_04_07_20_00.json");
        fs::write(&path, r#"{"S1 nach Airport": [1, 2]}"#).unwrap();

        let handle = SnapshotHandle::from_path(&path).unwrap();
        assert!(matches!(store.read_snapshot(&handle), Err(StoreError::Corrupt { .. })));
    }
}
