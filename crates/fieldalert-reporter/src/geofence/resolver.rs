//! Geofence gate state machine.
//!
//! `Idle -> AcquiringFix -> ReverseGeocoding -> Confirmed | Rejected`.
//! Terminal states go back to `Idle` only through [`GeofenceResolver::retry`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fieldalert_core::GeoPoint;
use fieldalert_core::config::LocationConfig;
use tracing::{debug, info, instrument, warn};

use super::membership::{GeofenceParams, Membership, resolve_membership};
use super::{Confirmation, GateError};
use crate::location::{AdminLevel, Geocoder, LocationError, LocationFix, LocationProvider};

/// Fields whose absence from the fast query triggers the fallback query.
const ESSENTIAL_LEVELS: [AdminLevel; 3] = [
    AdminLevel::Locality,
    AdminLevel::Municipality,
    AdminLevel::Province,
];

/// Current state of the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    Idle,
    AcquiringFix,
    ReverseGeocoding,
    Confirmed(Confirmation),
    Rejected { reason: String },
}

impl GateState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AcquiringFix => "acquiring_fix",
            Self::ReverseGeocoding => "reverse_geocoding",
            Self::Confirmed(_) => "confirmed",
            Self::Rejected { .. } => "rejected",
        }
    }

    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// Acquires one fix, resolves an address and decides area membership.
pub struct GeofenceResolver {
    params: GeofenceParams,
    provider: Arc<dyn LocationProvider>,
    geocoder: Arc<dyn Geocoder>,
    fix_timeout: Duration,
    fix_renewals: u32,
    state: GateState,
}

impl GeofenceResolver {
    pub fn new(
        params: GeofenceParams,
        provider: Arc<dyn LocationProvider>,
        geocoder: Arc<dyn Geocoder>,
        location: &LocationConfig,
    ) -> Self {
        Self {
            params,
            provider,
            geocoder,
            fix_timeout: Duration::from_secs(location.fix_timeout_secs),
            fix_renewals: location.fix_renewals,
            state: GateState::Idle,
        }
    }

    /// Override the per-attempt fix timeout.
    #[must_use]
    pub const fn with_fix_timeout(mut self, timeout: Duration) -> Self {
        self.fix_timeout = timeout;
        self
    }

    pub const fn state(&self) -> &GateState {
        &self.state
    }

    pub const fn params(&self) -> &GeofenceParams {
        &self.params
    }

    /// The confirmation, when the gate is in `Confirmed`.
    pub const fn confirmation(&self) -> Option<&Confirmation> {
        match &self.state {
            GateState::Confirmed(c) => Some(c),
            _ => None,
        }
    }

    /// Explicit retry: leave a terminal state and return to `Idle`.
    pub fn retry(&mut self) {
        if !matches!(self.state, GateState::Idle) {
            self.transition(GateState::Idle);
        }
    }

    /// Run the gate from `Idle` to `Confirmed` or `Rejected`.
    ///
    /// A timed-out or unavailable fix returns the gate to `Idle` so the
    /// caller may try again; a rejection is terminal for this attempt.
    #[instrument(skip(self), fields(area = %self.params.area_label))]
    pub async fn begin_confirmation(&mut self) -> Result<Confirmation, GateError> {
        if !matches!(self.state, GateState::Idle) {
            return Err(GateError::NotIdle(self.state.name()));
        }

        self.transition(GateState::AcquiringFix);
        let fix = match self.acquire_fix().await {
            Ok(fix) => fix,
            Err(e) => {
                self.transition(GateState::Idle);
                return Err(e);
            }
        };

        self.transition(GateState::ReverseGeocoding);
        let address = self.reverse_geocode(fix.point).await;

        let membership = self.resolve_membership(&address, fix.point);
        if membership.inside {
            let confirmation = Confirmation::from_membership(fix.point, &membership);
            info!(
                point = %fix.point,
                distance_m = membership.distance_meters,
                by_locality = membership.by_locality,
                by_distance = membership.by_distance,
                "Reporter confirmed inside service area"
            );
            self.transition(GateState::Confirmed(confirmation.clone()));
            Ok(confirmation)
        } else {
            let reason = "outside service area".to_string();
            info!(
                point = %fix.point,
                distance_m = membership.distance_meters,
                address = %address,
                "Reporter rejected by geofence"
            );
            self.transition(GateState::Rejected {
                reason: reason.clone(),
            });
            Err(GateError::Rejected(reason))
        }
    }

    /// Membership decision for the configured area.
    pub fn resolve_membership(&self, address_text: &str, point: GeoPoint) -> Membership {
        resolve_membership(&self.params, address_text, point)
    }

    /// Request one fix with a bounded wait, renewing after a timeout.
    async fn acquire_fix(&self) -> Result<LocationFix, GateError> {
        let attempts = self.fix_renewals.saturating_add(1);
        for attempt in 1..=attempts {
            match tokio::time::timeout(self.fix_timeout, self.provider.request_fix()).await {
                Ok(Ok(fix)) => {
                    debug!(attempt, point = %fix.point, accuracy = ?fix.accuracy_meters, "Location fix received");
                    return Ok(fix);
                }
                Ok(Err(LocationError::Timeout)) | Err(_) => {
                    warn!(attempt, attempts, timeout = ?self.fix_timeout, "Location fix timed out");
                }
                Ok(Err(LocationError::Unavailable(reason))) => {
                    warn!(attempt, reason = %reason, "Location provider unavailable");
                    return Err(GateError::LocationUnavailable(reason));
                }
            }
        }
        Err(GateError::AcquisitionTimeout)
    }

    /// Compose address text from the fast query, filling gaps from the
    /// fallback query. Lookup failures yield an empty string.
    async fn reverse_geocode(&self, point: GeoPoint) -> String {
        let mut fields: HashMap<AdminLevel, String> = HashMap::new();

        match self.geocoder.lookup_relations(point).await {
            Ok(relations) => {
                for relation in relations {
                    let name = relation.name.trim();
                    if !name.is_empty() {
                        fields.entry(relation.level).or_insert_with(|| name.to_string());
                    }
                }
            }
            Err(e) => warn!(error = %e, "Fast geocode query failed"),
        }

        if ESSENTIAL_LEVELS.iter().any(|level| !fields.contains_key(level)) {
            match self.geocoder.lookup_components(point).await {
                Ok(components) => {
                    for level in AdminLevel::ORDERED {
                        if fields.contains_key(&level) {
                            continue;
                        }
                        if let Some(value) = components.get(level.component_key()) {
                            let value = value.trim();
                            if !value.is_empty() {
                                fields.insert(level, value.to_string());
                            }
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Fallback geocode query failed"),
            }
        }

        compose_address(&fields)
    }

    fn transition(&mut self, next: GateState) {
        debug!(from = self.state.name(), to = next.name(), "Geofence state change");
        self.state = next;
    }
}

/// Join resolved fields from most to least specific, skipping a name that
/// repeats the previous one (a city that is its own municipality).
fn compose_address(fields: &HashMap<AdminLevel, String>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for level in AdminLevel::ORDERED {
        if let Some(name) = fields.get(&level) {
            if parts.last().is_none_or(|prev| !prev.eq_ignore_ascii_case(name)) {
                parts.push(name);
            }
        }
    }
    parts.join(", ")
}
