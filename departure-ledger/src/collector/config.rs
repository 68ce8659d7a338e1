//! Collection loop configuration.

use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::feed::ProductFilter;
use crate::ledger::DEFAULT_HISTORY_LIMIT;

/// Configuration parameters for the collection loop.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Pause between the end of one cycle and the start of the next.
    pub interval: StdDuration,

    /// How far back a query window may reach.
    /// The feed forgets delays shortly after departure, so older
    /// departures are not worth asking for.
    pub max_window: Duration,

    /// Deadline for one station's departures request.
    pub request_timeout: StdDuration,

    /// Stations fetched at once.
    pub max_concurrent_requests: usize,

    /// Accepted events retained per (route, station).
    pub history_limit: usize,

    pub products: ProductFilter,
}

impl CollectorConfig {
    pub fn with_interval(mut self, interval: StdDuration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_window(mut self, max_window: Duration) -> Self {
        self.max_window = max_window;
        self
    }

    pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_requests(mut self, n: usize) -> Self {
        self.max_concurrent_requests = n;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_products(mut self, products: ProductFilter) -> Self {
        self.products = products;
        self
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: StdDuration::from_secs(600),
            max_window: Duration::minutes(15),
            request_timeout: StdDuration::from_secs(30),
            max_concurrent_requests: 4,
            history_limit: DEFAULT_HISTORY_LIMIT,
            products: ProductFilter::default(),
        }
    }
}
