//! Domain types for the departure ledger.
//!
//! Everything downstream of the feed works with these validated types: a
//! [`DepartureEvent`] always has a scheduled time and a station, and a
//! [`RouteKey`] always carries the transport kind of its line.

mod error;
mod event;
mod route;
mod station;
mod transport;

pub use error::DomainError;
pub use event::{DepartureEvent, EventRecord};
pub use route::{InvalidRouteKey, RouteKey, UNDEFINED};
pub use station::{GeoPoint, Station};
pub use transport::{InvalidTransportKind, LineCategory, TransportKind};
