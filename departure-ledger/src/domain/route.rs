//! Route identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::transport::{LineCategory, TransportKind};

/// Placeholder used when the feed omits a line name or destination.
pub const UNDEFINED: &str = "Undefined";

/// Separator between line and destination in the rendered key.
const DIRECTION_SEPARATOR: &str = " nach ";

/// Error returned when parsing a malformed route key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid route key {key:?}: {reason}")]
pub struct InvalidRouteKey {
    key: String,
    reason: &'static str,
}

/// Identity of one directional service pattern: transport kind, line and
/// destination.
///
/// Including the kind keeps two services with the same line label and
/// destination apart when they are different modes.
///
/// Keys render as `<kind>/<line> nach <destination>`. Keys stored without the
/// kind prefix (`S1 nach Flughafen`) still parse; the kind is then derived
/// from the line name.
///
/// # Examples
///
/// ```
/// use departure_ledger::domain::{RouteKey, TransportKind};
///
/// let key = RouteKey::derive(Some("S 1"), Some("Flughafen"));
/// assert_eq!(key.kind(), &TransportKind::SuburbanRail);
/// assert_eq!(key.to_string(), "suburban-rail/S 1 nach Flughafen");
///
/// let legacy: RouteKey = "S 1 nach Flughafen".parse().unwrap();
/// assert_eq!(legacy, key);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    kind: TransportKind,
    line: String,
    destination: String,
}

impl RouteKey {
    /// Create a key from explicit parts.
    pub fn new(kind: TransportKind, line: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            kind,
            line: line.into(),
            destination: destination.into(),
        }
    }

    /// Derive a key from what the feed reports for a trip.
    ///
    /// Missing or blank parts become [`UNDEFINED`]. The kind is classified
    /// from the line name, or unknown when there is none.
    pub fn derive(line_name: Option<&str>, destination: Option<&str>) -> Self {
        let line = non_blank(line_name);
        let kind = LineCategory::classify(line.unwrap_or_default()).kind();
        let destination = non_blank(destination).unwrap_or(UNDEFINED);
        Self::new(kind, line.unwrap_or(UNDEFINED), destination)
    }

    pub fn kind(&self) -> &TransportKind {
        &self.kind
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Category of the line label, used for records that carry no label.
    pub fn line_category(&self) -> LineCategory {
        LineCategory::classify(&self.line)
    }
}

/// Kind of a legacy key's line; the `Undefined` placeholder has none.
fn legacy_kind(line: &str) -> TransportKind {
    let label = if line == UNDEFINED { "" } else { line };
    LineCategory::classify(label).kind()
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}{}{}",
            self.kind, self.line, DIRECTION_SEPARATOR, self.destination
        )
    }
}

impl FromStr for RouteKey {
    type Err = InvalidRouteKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| InvalidRouteKey {
            key: s.to_string(),
            reason,
        };

        // A kind prefix only counts if it parses; line names may contain '/'.
        let (kind, rest) = match s.split_once('/') {
            Some((kind, rest)) => match kind.parse::<TransportKind>() {
                Ok(kind) => (Some(kind), rest),
                Err(_) => (None, s),
            },
            None => (None, s),
        };

        let (line, destination) = rest
            .split_once(DIRECTION_SEPARATOR)
            .ok_or_else(|| invalid("missing \" nach \" separator"))?;

        if line.is_empty() {
            return Err(invalid("empty line name"));
        }

        let kind = kind.unwrap_or_else(|| legacy_kind(line));
        Ok(Self::new(kind, line, destination))
    }
}

impl Serialize for RouteKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RouteKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}
