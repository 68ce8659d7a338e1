//! HAFAS REST bridge response DTOs.
//!
//! These types map directly to the JSON the REST bridge returns. They use
//! `Option` liberally because the bridge omits fields instead of sending
//! null (`cancelled` only appears when it is true, for instance).

use serde::Deserialize;

/// Entry of a `/locations/nearby` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDto {
    /// "stop", "station", "location" or "poi".
    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub id: Option<String>,

    pub name: Option<String>,

    pub location: Option<CoordinatesDto>,

    /// Walking distance from the query point, in metres.
    pub distance: Option<u32>,
}

/// Coordinates of a location.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatesDto {
    pub latitude: f64,
    pub longitude: f64,
}

/// Response from `/stops/{id}/departures`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeparturesResponse {
    pub departures: Vec<DepartureDto>,
}

/// A departure on the board.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureDto {
    pub trip_id: Option<String>,

    /// Stop the departure leaves from (may be a platform-level stop).
    pub stop: Option<StopDto>,

    /// Realtime departure time (ISO 8601), absent when cancelled.
    pub when: Option<String>,

    /// Scheduled departure time (ISO 8601).
    pub planned_when: Option<String>,

    /// Delay in seconds.
    pub delay: Option<i64>,

    /// Headsign / destination text.
    pub direction: Option<String>,

    pub line: Option<LineDto>,

    pub cancelled: Option<bool>,
}

/// Stop reference inside a departure.
#[derive(Debug, Clone, Deserialize)]
pub struct StopDto {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Line reference inside a departure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDto {
    /// Display name, e.g. "S 1" or "Bus 52".
    pub name: Option<String>,

    /// Product category, e.g. "suburban" or "bus".
    pub product: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_departures_response() {
        let json = r#"{
            "departures": [{
                "tripId": "1|123|0|80|4112024",
                "stop": {"type": "stop", "id": "8004128", "name": "München-Pasing"},
                "when": "2024-11-04T08:17:00+01:00",
                "plannedWhen": "2024-11-04T08:15:00+01:00",
                "delay": 120,
                "platform": "7",
                "direction": "Flughafen München",
                "line": {"type": "line", "name": "S 1", "product": "suburban"}
            }],
            "realtimeDataUpdatedAt": 1730704620
        }"#;

        let response: DeparturesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.departures.len(), 1);

        let dep = &response.departures[0];
        assert_eq!(dep.planned_when.as_deref(), Some("2024-11-04T08:15:00+01:00"));
        assert_eq!(dep.delay, Some(120));
        assert_eq!(dep.cancelled, None);
        assert_eq!(dep.line.as_ref().unwrap().name.as_deref(), Some("S 1"));
    }

    #[test]
    fn parse_nearby_location() {
        let json = r#"[{
            "type": "stop",
            "id": "8000261",
            "name": "München Hbf",
            "location": {"type": "location", "latitude": 48.140229, "longitude": 11.558339},
            "distance": 42
        }]"#;

        let locations: Vec<LocationDto> = serde_json::from_str(json).unwrap();
        assert_eq!(locations[0].kind.as_deref(), Some("stop"));
        assert_eq!(locations[0].distance, Some(42));
    }
}
