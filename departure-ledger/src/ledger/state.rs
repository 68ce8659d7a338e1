//! Serializable ledger state, as written to the checkpoint.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EventRecord, RouteKey};

/// The last accepted event per (route, station), plus the cycle it reflects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Polling cycle after which this state was taken.
    pub cycle: Option<DateTime<Utc>>,
    pub routes: BTreeMap<RouteKey, BTreeMap<String, EventRecord>>,
}

impl LedgerState {
    /// Number of (route, station) pairs.
    pub fn pair_count(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LineCategory;

    #[test]
    fn json_shape() {
        let mut stations = BTreeMap::new();
        stations.insert(
            "Central".to_string(),
            EventRecord(
                LineCategory::S,
                DateTime::parse_from_rfc3339("2024-11-04T08:15:00+01:00").unwrap(),
                false,
                0.0,
            ),
        );
        let mut routes = BTreeMap::new();
        routes.insert(RouteKey::derive(Some("S1"), Some("Airport")), stations);

        let state = LedgerState {
            cycle: Some(DateTime::parse_from_rfc3339("2024-11-04T07:20:00Z").unwrap().with_timezone(&Utc)),
            routes,
        };

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json["routes"]["suburban-rail/S1 nach Airport"]["Central"][0],
            "S"
        );
        assert_eq!(state.pair_count(), 1);

        let back: LedgerState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
