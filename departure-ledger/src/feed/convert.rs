//! Conversion from feed DTOs to raw departures and domain types.
//!
//! REST DTOs become [`RawDeparture`]s without any validation; validation
//! happens once, in [`convert_departure`], so that every feed
//! implementation is judged by the same rules.

use chrono::DateTime;
use tracing::debug;

use crate::domain::{DepartureEvent, DomainError, GeoPoint, RouteKey, Station};

use super::RawDeparture;
use super::types::{DepartureDto, DeparturesResponse, LocationDto};

/// Validate a raw departure and turn it into a domain event.
///
/// The route key is derived from the line name and destination; a missing
/// delay counts as zero.
pub fn convert_departure(raw: &RawDeparture) -> Result<DepartureEvent, DomainError> {
    let scheduled_time = raw.scheduled_time.ok_or(DomainError::MissingScheduledTime)?;

    let station_name = raw.station_name.trim();
    if station_name.is_empty() {
        return Err(DomainError::MissingStationName);
    }

    let route_key = RouteKey::derive(raw.line_name.as_deref(), raw.destination.as_deref());
    let delay_minutes = raw.delay_seconds.map_or(0.0, |secs| secs as f64 / 60.0);

    Ok(DepartureEvent::new(
        route_key,
        station_name,
        scheduled_time,
        raw.cancelled,
        delay_minutes,
    ))
}

/// Convert a departures response into raw departures.
///
/// `board_station_name` is used when a departure does not name its stop.
pub fn convert_board(response: &DeparturesResponse, board_station_name: &str) -> Vec<RawDeparture> {
    response
        .departures
        .iter()
        .map(|dep| convert_departure_dto(dep, board_station_name))
        .collect()
}

/// Convert a single departure DTO.
///
/// An unparseable `plannedWhen` is dropped here and surfaces later as a
/// missing scheduled time.
pub fn convert_departure_dto(dto: &DepartureDto, board_station_name: &str) -> RawDeparture {
    let scheduled_time = dto.planned_when.as_deref().and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .map_err(|e| debug!(planned_when = s, error = %e, "Unparseable scheduled time"))
            .ok()
    });

    let station_name = dto
        .stop
        .as_ref()
        .and_then(|stop| stop.name.clone())
        .unwrap_or_else(|| board_station_name.to_string());

    RawDeparture {
        line_name: dto.line.as_ref().and_then(|line| line.name.clone()),
        destination: dto.direction.clone(),
        station_name,
        scheduled_time,
        cancelled: dto.cancelled.unwrap_or(false),
        delay_seconds: dto.delay,
    }
}

/// Convert a nearby location into a station.
///
/// Only stops and stations with an id, a name and coordinates qualify.
pub fn convert_location(dto: &LocationDto) -> Option<Station> {
    match dto.kind.as_deref() {
        Some("stop") | Some("station") => {}
        _ => return None,
    }

    let id = dto.id.as_ref()?;
    let name = dto.name.as_ref()?;
    let coordinates = dto.location.as_ref()?;

    Some(Station::new(
        id.clone(),
        name.clone(),
        GeoPoint::new(coordinates.latitude, coordinates.longitude),
    ))
}
