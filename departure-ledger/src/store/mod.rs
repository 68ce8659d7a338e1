//! Persistence of accepted departures.
//!
//! Each polling cycle writes one immutable snapshot holding the departures
//! accepted in that cycle, followed by a checkpoint of the ledger's
//! high-water marks. Together they survive a crash between the two writes:
//! on startup the checkpoint is restored and any newer snapshot replayed.

mod error;
mod record;
mod snapshot;

pub use error::{RecordError, StoreError};
pub use record::{RawDelay, RawRecord};
pub use snapshot::{CHECKPOINT_FILE, SnapshotHandle, SnapshotStore, snapshot_file_name};
pub(crate) use snapshot::write_atomic;
