//! Rebuild the ledger from the store on startup.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::ledger::TripLedger;
use crate::store::{SnapshotStore, StoreError};

/// What startup recovery found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Cycle of the restored checkpoint, if one was usable.
    pub checkpoint_cycle: Option<DateTime<Utc>>,
    pub restored_pairs: usize,
    /// Snapshots newer than the checkpoint that were replayed.
    pub snapshots_replayed: usize,
    /// Replayed events that moved a high-water mark.
    pub events_replayed: usize,
}

/// Restore the checkpoint, then replay every snapshot written after it.
///
/// A snapshot is written before its checkpoint, so after a crash between
/// the two the checkpoint lags; replaying brings the marks forward. A
/// missing or unreadable checkpoint means every snapshot is replayed into an
/// empty ledger. Only an unlistable store directory is an error.
pub fn recover_ledger(
    store: &SnapshotStore,
    history_limit: usize,
) -> Result<(TripLedger, RecoveryReport), StoreError> {
    let mut ledger = TripLedger::new(history_limit);
    let mut report = RecoveryReport::default();

    match store.read_ledger_checkpoint() {
        Ok(Some(state)) => {
            report.checkpoint_cycle = state.cycle;
            report.restored_pairs = state.pair_count();
            ledger.restore_state(state);
        }
        Ok(None) => info!(dir = %store.dir().display(), "No checkpoint, starting with an empty ledger"),
        Err(e) => warn!(error = %e, "Unreadable checkpoint, starting with an empty ledger"),
    }

    for handle in store.list_snapshots()? {
        if report.checkpoint_cycle.is_some_and(|cp| handle.cycle <= cp) {
            continue;
        }
        match store.read_snapshot(&handle) {
            Ok(events) => {
                report.events_replayed += ledger.replay(events);
                report.snapshots_replayed += 1;
            }
            Err(e) => warn!(error = %e, "Skipping unreadable snapshot during recovery"),
        }
    }

    info!(
        checkpoint = ?report.checkpoint_cycle,
        restored_pairs = report.restored_pairs,
        snapshots_replayed = report.snapshots_replayed,
        events_replayed = report.events_replayed,
        "Ledger recovered"
    );

    Ok((ledger, report))
}
