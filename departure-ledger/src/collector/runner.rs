//! The polling state machine.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::domain::{DepartureEvent, Station};
use crate::feed::{DepartureFeed, FeedError, RawDeparture};
use crate::ledger::{AcceptResult, TripLedger};
use crate::stations::stations_in_bands;
use crate::store::SnapshotStore;

use super::clock::Clock;
use super::config::CollectorConfig;
use super::error::CollectorError;
use super::recovery::recover_ledger;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Polling,
    Persisting,
    Sleeping,
    Stopped,
}

/// Counters for one polling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: DateTime<Utc>,
    /// Stations a request was issued for.
    pub stations_polled: usize,
    /// Of those, stations whose request failed or timed out.
    pub stations_failed: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub malformed: usize,
    /// Duplicates that reported a different delay or cancellation.
    pub revisions_ignored: usize,
    /// Whether this cycle's snapshot reached the store.
    pub persisted: bool,
    /// Shutdown arrived before every station was polled.
    pub interrupted: bool,
}

impl CycleReport {
    fn new(cycle: DateTime<Utc>) -> Self {
        Self {
            cycle,
            stations_polled: 0,
            stations_failed: 0,
            accepted: 0,
            duplicates: 0,
            malformed: 0,
            revisions_ignored: 0,
            persisted: false,
            interrupted: false,
        }
    }
}

/// Polls every station on a fixed cadence and files new departures.
///
/// Each cycle fetches all stations (a bounded number at a time), merges the
/// results into the ledger in station order, then writes a snapshot of the
/// accepted events followed by a ledger checkpoint.
pub struct Collector<F, C> {
    feed: F,
    clock: C,
    store: SnapshotStore,
    stations: Vec<Station>,
    ledger: TripLedger,
    config: CollectorConfig,
    phase: Phase,
    /// Last successful poll per station id.
    last_polled: HashMap<String, DateTime<Utc>>,
    /// Accepted events whose snapshot write has not succeeded yet.
    pending: Vec<DepartureEvent>,
}

impl<F, C> Collector<F, C>
where
    F: DepartureFeed + Sync,
    C: Clock,
{
    pub fn new(
        feed: F,
        clock: C,
        store: SnapshotStore,
        stations: Vec<Station>,
        ledger: TripLedger,
        config: CollectorConfig,
    ) -> Self {
        Self {
            feed,
            clock,
            store,
            stations,
            ledger,
            config,
            phase: Phase::Idle,
            last_polled: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Resolve stations, open the store and recover the ledger.
    pub async fn bootstrap(feed: F, clock: C, config: &AppConfig) -> Result<Self, CollectorError> {
        config.validate()?;

        let store = SnapshotStore::new(&config.storage.data_dir)?;
        let stations = stations_in_bands(&feed, config.center, &config.band_edges_m).await?;
        info!(stations = stations.len(), "Station directory resolved");

        let settings = config.collector_config();
        let (ledger, _) = recover_ledger(&store, settings.history_limit)?;

        Ok(Self::new(feed, clock, store, stations, ledger, settings))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ledger(&self) -> &TripLedger {
        &self.ledger
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// Accepted events still waiting for a successful snapshot write.
    pub fn pending(&self) -> &[DepartureEvent] {
        &self.pending
    }

    /// Query window for a station at `now`.
    ///
    /// Starts at the station's last successful poll, but never further back
    /// than `max_window`.
    pub fn window(&self, station_id: &str, now: DateTime<Utc>) -> (DateTime<Utc>, Duration) {
        let earliest = now - self.config.max_window;
        let start = self
            .last_polled
            .get(station_id)
            .map_or(earliest, |last| (*last).max(earliest));
        (start, now - start)
    }

    /// Run cycles until shutdown is signalled.
    ///
    /// Shutdown is honoured between cycles, during the pause, and before
    /// each batch of station requests. Returns the number of cycles run.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut cycles = 0;

        while !is_shutdown(&shutdown) {
            self.run_cycle(&shutdown).await;
            cycles += 1;

            if is_shutdown(&shutdown) {
                break;
            }

            self.phase = Phase::Sleeping;
            tokio::select! {
                _ = self.clock.sleep(self.config.interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        self.phase = Phase::Stopped;
        info!(cycles, pending = self.pending.len(), "Collector stopped");
        cycles
    }

    /// Run up to `n` cycles with the configured pause between them.
    pub async fn run_cycles(&mut self, n: usize, shutdown: &watch::Receiver<bool>) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(n);
        for i in 0..n {
            if is_shutdown(shutdown) {
                break;
            }
            reports.push(self.run_cycle(shutdown).await);
            if i + 1 < n {
                self.phase = Phase::Sleeping;
                self.clock.sleep(self.config.interval).await;
            }
        }
        self.phase = Phase::Idle;
        reports
    }

    /// Poll every station once, merge, and persist.
    pub async fn run_cycle(&mut self, shutdown: &watch::Receiver<bool>) -> CycleReport {
        let now = self.clock.now();
        let mut report = CycleReport::new(now);

        self.phase = Phase::Polling;
        let boards = self.fetch_boards(now, shutdown).await;
        report.interrupted = boards.len() < self.stations.len();

        for (idx, result) in boards {
            let station = &self.stations[idx];
            report.stations_polled += 1;

            match result {
                Ok(mut departures) => {
                    self.last_polled.insert(station.id.clone(), now);
                    // boards come in real-time order; the high-water mark needs scheduled order
                    departures.sort_by_key(|d| d.scheduled_time);
                    for raw in &departures {
                        match self.ledger.observe(raw) {
                            AcceptResult::Accepted(event) => {
                                report.accepted += 1;
                                self.pending.push(event);
                            }
                            AcceptResult::DuplicateRejected { revised } => {
                                report.duplicates += 1;
                                if revised {
                                    report.revisions_ignored += 1;
                                }
                            }
                            AcceptResult::Malformed(_) => report.malformed += 1,
                        }
                    }
                    debug!(station = %station.name, departures = departures.len(), "Merged departures");
                }
                Err(e) => {
                    report.stations_failed += 1;
                    warn!(
                        station = %station.name,
                        station_id = %station.id,
                        error = %e,
                        "Failed to fetch departures, retrying next cycle"
                    );
                }
            }
        }

        self.phase = Phase::Persisting;
        report.persisted = self.persist(now);
        self.phase = Phase::Idle;

        info!(
            cycle = %report.cycle,
            stations = report.stations_polled,
            failed = report.stations_failed,
            accepted = report.accepted,
            duplicates = report.duplicates,
            malformed = report.malformed,
            revisions_ignored = report.revisions_ignored,
            persisted = report.persisted,
            "Cycle complete"
        );

        report
    }

    /// Fetch every station's board, `max_concurrent_requests` at a time.
    ///
    /// Results come back in station order, tagged with the station index.
    async fn fetch_boards(
        &self,
        now: DateTime<Utc>,
        shutdown: &watch::Receiver<bool>,
    ) -> Vec<(usize, Result<Vec<RawDeparture>, FeedError>)> {
        let timeout = self.config.request_timeout;
        let indexed: Vec<_> = self.stations.iter().enumerate().collect();
        let mut boards = Vec::with_capacity(indexed.len());

        for batch in indexed.chunks(self.config.max_concurrent_requests.max(1)) {
            if is_shutdown(shutdown) {
                info!(
                    skipped = indexed.len() - boards.len(),
                    "Shutdown requested, skipping remaining stations"
                );
                break;
            }

            let futures: Vec<_> = batch
                .iter()
                .map(|&(idx, station)| {
                    let (start, window) = self.window(&station.id, now);
                    async move {
                        let request =
                            self.feed
                                .departures(&station.id, start, window, &self.config.products);
                        let result = match tokio::time::timeout(timeout, request).await {
                            Ok(result) => result,
                            Err(_) => Err(FeedError::Timeout(timeout)),
                        };
                        (idx, result)
                    }
                })
                .collect();

            boards.extend(join_all(futures).await);
        }

        boards
    }

    /// Write the snapshot, then the checkpoint.
    ///
    /// A failed snapshot write keeps the events pending for the next cycle
    /// and skips the checkpoint, so the checkpoint never gets ahead of the
    /// snapshots. A failed checkpoint write is only logged.
    fn persist(&mut self, cycle: DateTime<Utc>) -> bool {
        let handle = match self.store.write_snapshot(cycle, &self.pending) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(
                    error = %e,
                    pending = self.pending.len(),
                    "Failed to write snapshot, keeping events for the next cycle"
                );
                return false;
            }
        };
        self.pending.clear();

        let mut state = self.ledger.snapshot_state();
        state.cycle = Some(handle.cycle);
        if let Err(e) = self.store.write_ledger_checkpoint(&state) {
            warn!(error = %e, "Failed to write checkpoint, the snapshot will be replayed on restart");
        }

        true
    }
}

/// True once shutdown was requested or its sender is gone.
fn is_shutdown(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}
