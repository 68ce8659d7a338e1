//! Time source for the collection loop.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

/// Current time and pauses between cycles.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Wait for `duration`. The loop may abandon the wait on shutdown.
    fn sleep(&self, duration: StdDuration) -> impl Future<Output = ()> + Send;
}

/// Wall-clock time and real sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: StdDuration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when told to.
///
/// Sleeping advances the clock by the requested duration and returns at
/// once, so a test can drive many cycles without waiting.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.lock() += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.lock() = to;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }

    async fn sleep(&self, duration: StdDuration) {
        if let Ok(by) = chrono::Duration::from_std(duration) {
            self.advance(by);
        }
        tokio::task::yield_now().await;
    }
}
