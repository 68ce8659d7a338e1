//! Tolerant reader for stored departure records.
//!
//! Older collectors wrote records in more than one shape. Every accepted
//! shape is enumerated here; anything else is rejected rather than guessed.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value;

use super::error::RecordError;
use crate::domain::{DepartureEvent, LineCategory, RouteKey};

/// Naive timestamps (no offset) are read as UTC.
const NAIVE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A delay as it appears on disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawDelay {
    /// Plain number of minutes.
    Minutes(f64),
    /// A duration object, `{"seconds": n}`.
    Seconds(f64),
}

impl RawDelay {
    fn parse(value: &Value) -> Result<Self, RecordError> {
        match value {
            Value::Number(n) => n.as_f64().map(RawDelay::Minutes).ok_or(RecordError::Delay),
            Value::Object(map) if map.len() == 1 => map
                .get("seconds")
                .and_then(Value::as_f64)
                .map(RawDelay::Seconds)
                .ok_or(RecordError::Delay),
            _ => Err(RecordError::Delay),
        }
    }

    pub fn minutes(self) -> f64 {
        match self {
            RawDelay::Minutes(m) => m,
            RawDelay::Seconds(s) => s / 60.0,
        }
    }
}

/// One stored record, in any of the recognised shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// `[label, scheduled_time, cancelled, delay]`
    Labelled {
        label: String,
        scheduled_time: DateTime<FixedOffset>,
        cancelled: bool,
        delay: RawDelay,
    },
    /// `[scheduled_time, cancelled, delay]`; the label comes from the route.
    Unlabelled {
        scheduled_time: DateTime<FixedOffset>,
        cancelled: bool,
        delay: RawDelay,
    },
}

impl RawRecord {
    pub fn parse(value: &Value) -> Result<Self, RecordError> {
        let items = value.as_array().ok_or(RecordError::NotAnArray)?;
        match items.as_slice() {
            [label, time, cancelled, delay] => Ok(RawRecord::Labelled {
                label: label.as_str().ok_or(RecordError::Label)?.to_string(),
                scheduled_time: parse_time(time)?,
                cancelled: cancelled.as_bool().ok_or(RecordError::Cancelled)?,
                delay: RawDelay::parse(delay)?,
            }),
            [time, cancelled, delay] => Ok(RawRecord::Unlabelled {
                scheduled_time: parse_time(time)?,
                cancelled: cancelled.as_bool().ok_or(RecordError::Cancelled)?,
                delay: RawDelay::parse(delay)?,
            }),
            other => Err(RecordError::Arity(other.len())),
        }
    }

    /// Standardize into an event filed under `route_key` at `station_name`.
    pub fn into_event(self, route_key: RouteKey, station_name: impl Into<String>) -> DepartureEvent {
        let (category, scheduled_time, cancelled, delay) = match self {
            RawRecord::Labelled {
                label,
                scheduled_time,
                cancelled,
                delay,
            } => (LineCategory::from_label(&label), scheduled_time, cancelled, delay),
            RawRecord::Unlabelled {
                scheduled_time,
                cancelled,
                delay,
            } => (route_key.line_category(), scheduled_time, cancelled, delay),
        };

        DepartureEvent {
            route_key,
            station_name: station_name.into(),
            category,
            scheduled_time,
            is_cancelled: cancelled,
            delay_minutes: delay.minutes(),
        }
    }
}

fn parse_time(value: &Value) -> Result<DateTime<FixedOffset>, RecordError> {
    let s = value.as_str().ok_or(RecordError::ScheduledTime)?;
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Ok(time);
    }
    NaiveDateTime::parse_from_str(s, NAIVE_TIME_FORMAT)
        .map(|naive| naive.and_utc().into())
        .map_err(|_| RecordError::ScheduledTime)
}
