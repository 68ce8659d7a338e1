//! Line categories and transport kinds.
//!
//! The feed only exposes free-text line names ("STR 19", "Bus 52", "S 1").
//! A [`LineCategory`] is the short prefix category recovered from such a
//! label; a [`TransportKind`] is the normalized mode of transport that the
//! category maps to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Label used when a line name carries no letters at all.
const UNKNOWN_LABEL: &str = "UNKNOWN";

/// Category recovered from the alphabetic prefix of a line label.
///
/// `Str` and `S` are kept apart even though both map to suburban rail,
/// so that records classified years ago keep their category.
///
/// # Examples
///
/// ```
/// use departure_ledger::domain::{LineCategory, TransportKind};
///
/// assert_eq!(LineCategory::classify("Bus12A"), LineCategory::Bus);
/// assert_eq!(LineCategory::classify("STR 19"), LineCategory::Str);
/// assert_eq!(LineCategory::classify("S2").kind(), TransportKind::SuburbanRail);
/// assert_eq!(LineCategory::classify("XYZ5"), LineCategory::Other("XYZ".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LineCategory {
    Bus,
    Str,
    Ice,
    U,
    S,
    Re,
    Nj,
    Brb,
    En,
    /// Unrecognised prefix, upper-cased. Never dropped.
    Other(String),
}

impl LineCategory {
    /// Classify a line label by its leading letters.
    ///
    /// Scanning stops at the first digit; non-letters before it are skipped.
    /// Prefixes are tried in a fixed order, so "STR" wins over the bare "S".
    pub fn classify(label: &str) -> Self {
        let raw: String = label
            .trim()
            .chars()
            .take_while(|c| !c.is_ascii_digit())
            .filter(|c| c.is_alphabetic())
            .collect();

        if raw.is_empty() {
            return LineCategory::Other(UNKNOWN_LABEL.to_string());
        }

        let lower = raw.to_lowercase();
        let ordered = [
            ("bus", LineCategory::Bus),
            ("str", LineCategory::Str),
            ("ice", LineCategory::Ice),
            ("u", LineCategory::U),
            ("s", LineCategory::S),
            ("re", LineCategory::Re),
            ("nj", LineCategory::Nj),
            ("brb", LineCategory::Brb),
            ("en", LineCategory::En),
        ];

        ordered
            .into_iter()
            .find(|(prefix, _)| lower.starts_with(prefix))
            .map(|(_, category)| category)
            .unwrap_or_else(|| LineCategory::Other(raw.to_uppercase()))
    }

    /// Parse a stored category label.
    ///
    /// Canonical labels (as produced by [`LineCategory::as_str`]) map back
    /// exactly; anything else is classified like a line name.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Bus" => LineCategory::Bus,
            "STR" => LineCategory::Str,
            "ICE" => LineCategory::Ice,
            "U" => LineCategory::U,
            "S" => LineCategory::S,
            "RE" => LineCategory::Re,
            "NJ" => LineCategory::Nj,
            "BRB" => LineCategory::Brb,
            "EN" => LineCategory::En,
            UNKNOWN_LABEL => LineCategory::Other(UNKNOWN_LABEL.to_string()),
            other => LineCategory::classify(other),
        }
    }

    /// Canonical label for this category.
    pub fn as_str(&self) -> &str {
        match self {
            LineCategory::Bus => "Bus",
            LineCategory::Str => "STR",
            LineCategory::Ice => "ICE",
            LineCategory::U => "U",
            LineCategory::S => "S",
            LineCategory::Re => "RE",
            LineCategory::Nj => "NJ",
            LineCategory::Brb => "BRB",
            LineCategory::En => "EN",
            LineCategory::Other(prefix) => prefix,
        }
    }

    /// Normalized transport kind for this category.
    pub fn kind(&self) -> TransportKind {
        match self {
            LineCategory::Bus => TransportKind::Bus,
            LineCategory::Str | LineCategory::S => TransportKind::SuburbanRail,
            LineCategory::U => TransportKind::Subway,
            LineCategory::Ice | LineCategory::Nj | LineCategory::En => {
                TransportKind::LongDistanceExpress
            }
            LineCategory::Re => TransportKind::RegionalExpress,
            LineCategory::Brb => TransportKind::Regional,
            LineCategory::Other(prefix) => TransportKind::Other(prefix.clone()),
        }
    }
}

impl fmt::Display for LineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LineCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LineCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(LineCategory::from_label(&label))
    }
}

/// Error returned when parsing an unknown transport kind label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transport kind: {0}")]
pub struct InvalidTransportKind(String);

/// Normalized mode of transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransportKind {
    SuburbanRail,
    Tram,
    Bus,
    Subway,
    RegionalExpress,
    LongDistanceExpress,
    Regional,
    NightBus,
    Other(String),
}

impl TransportKind {
    /// Every kind the departure feed can be asked for.
    pub const PRODUCTS: [TransportKind; 8] = [
        TransportKind::SuburbanRail,
        TransportKind::Tram,
        TransportKind::Bus,
        TransportKind::Subway,
        TransportKind::RegionalExpress,
        TransportKind::LongDistanceExpress,
        TransportKind::Regional,
        TransportKind::NightBus,
    ];
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::SuburbanRail => f.write_str("suburban-rail"),
            TransportKind::Tram => f.write_str("tram"),
            TransportKind::Bus => f.write_str("bus"),
            TransportKind::Subway => f.write_str("subway"),
            TransportKind::RegionalExpress => f.write_str("regional-express"),
            TransportKind::LongDistanceExpress => f.write_str("long-distance-express"),
            TransportKind::Regional => f.write_str("regional"),
            TransportKind::NightBus => f.write_str("night-bus"),
            TransportKind::Other(prefix) => write!(f, "other:{prefix}"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = InvalidTransportKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "suburban-rail" => TransportKind::SuburbanRail,
            "tram" => TransportKind::Tram,
            "bus" => TransportKind::Bus,
            "subway" => TransportKind::Subway,
            "regional-express" => TransportKind::RegionalExpress,
            "long-distance-express" => TransportKind::LongDistanceExpress,
            "regional" => TransportKind::Regional,
            "night-bus" => TransportKind::NightBus,
            other => match other.strip_prefix("other:") {
                Some(prefix) if !prefix.is_empty() => TransportKind::Other(prefix.to_string()),
                _ => return Err(InvalidTransportKind(s.to_string())),
            },
        };
        Ok(kind)
    }
}

impl Serialize for TransportKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TransportKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}
