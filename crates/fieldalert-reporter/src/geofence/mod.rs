//! Geofence gate.
//!
//! Confirms the reporter is physically inside the service area before a
//! report can be built. The only way to obtain a [`Confirmation`] is a
//! `Confirmed` gate, and a report draft can only be built from one.

mod membership;
mod resolver;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;

use fieldalert_core::GeoPoint;
use thiserror::Error;

pub use membership::{GeofenceParams, Membership, resolve_membership};
pub use resolver::{GateState, GeofenceResolver};

/// Geofence gate errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    /// Fatal for this attempt; the reporter must move and retry.
    #[error("Gate rejected: {0}")]
    Rejected(String),

    /// Recoverable; the gate is back in `Idle`.
    #[error("Location fix timed out")]
    AcquisitionTimeout,

    /// Recoverable; the gate is back in `Idle`.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Gate is not idle (state: {0})")]
    NotIdle(&'static str),
}

/// Proof that the gate confirmed the reporter's position.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    point: GeoPoint,
    location_text: String,
    map_link: String,
    distance_meters: f64,
}

impl Confirmation {
    fn from_membership(point: GeoPoint, membership: &Membership) -> Self {
        Self {
            point,
            location_text: membership.location_text.clone(),
            map_link: membership.map_link.clone(),
            distance_meters: membership.distance_meters,
        }
    }

    /// Rebuild the confirmation a queued report was accepted under. Queue
    /// entries are only written after the gate confirmed them.
    pub(crate) fn restored(point: GeoPoint, location_text: &str) -> Self {
        Self {
            point,
            location_text: location_text.to_string(),
            map_link: point.map_link(),
            distance_meters: f64::NAN,
        }
    }

    pub const fn point(&self) -> GeoPoint {
        self.point
    }

    /// Canonical location string (address or synthesized near-center text).
    pub fn location_text(&self) -> &str {
        &self.location_text
    }

    pub fn map_link(&self) -> &str {
        &self.map_link
    }

    /// Distance to the area center at confirmation time; `NaN` for a
    /// confirmation restored from the offline queue.
    pub const fn distance_meters(&self) -> f64 {
        self.distance_meters
    }
}
