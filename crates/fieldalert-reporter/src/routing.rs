//! Station routing.
//!
//! Picks the nearest active responder station, falling back to the nearest
//! station of any status when none is active.

use fieldalert_core::GeoPoint;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Routing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("No stations available")]
    NoStationsAvailable,
}

/// One entry of the station directory, fetched fresh for every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub id: String,
    pub name: String,
    pub point: GeoPoint,
    pub active: bool,
}

/// The selected station and why it was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDecision {
    pub station: StationRecord,
    pub distance_meters: f64,
    /// True when no station was active and the nearest one was used anyway.
    pub fallback_to_inactive: bool,
}

/// Deterministic nearest-active-station selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct StationRouter;

impl StationRouter {
    pub const fn new() -> Self {
        Self
    }

    /// Select a station for a reporter at `reporter`.
    ///
    /// Stations are ordered by great-circle distance with a stable sort, so
    /// equal distances keep directory order.
    pub fn route(
        &self,
        reporter: GeoPoint,
        directory: &[StationRecord],
    ) -> Result<RouteDecision, RoutingError> {
        let mut ranked: Vec<(f64, &StationRecord)> = directory
            .iter()
            .map(|station| (reporter.distance_meters(&station.point), station))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let Some(&(nearest_distance, nearest)) = ranked.first() else {
            warn!(reporter = %reporter, "Station directory is empty");
            return Err(RoutingError::NoStationsAvailable);
        };

        for (distance, station) in &ranked {
            debug!(station_id = %station.id, distance_m = distance, active = station.active, "Station candidate");
        }

        let decision = match ranked.iter().find(|(_, station)| station.active) {
            Some(&(distance, station)) => RouteDecision {
                station: station.clone(),
                distance_meters: distance,
                fallback_to_inactive: false,
            },
            None => RouteDecision {
                station: nearest.clone(),
                distance_meters: nearest_distance,
                fallback_to_inactive: true,
            },
        };

        info!(
            station_id = %decision.station.id,
            station_name = %decision.station.name,
            distance_m = decision.distance_meters,
            fallback = decision.fallback_to_inactive,
            candidates = ranked.len(),
            "Station selected"
        );
        Ok(decision)
    }
}
