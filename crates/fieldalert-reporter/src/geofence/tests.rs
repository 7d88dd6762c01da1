//! Geofence gate tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use fieldalert_core::GeoPoint;
use fieldalert_core::config::LocationConfig;

use super::{GateError, GateState, GeofenceParams, GeofenceResolver};
use crate::location::{AdminLevel, AdminRelation, GeocodeError, LocationError};
use crate::test_helpers::{FixOutcome, ScriptedLocation, StaticGeocoder, north_of};

const CENTER: GeoPoint = GeoPoint::new(14.2814, 121.4161);

fn params() -> GeofenceParams {
    GeofenceParams::new(CENTER, 5_000.0, "Santa Cruz")
}

fn resolver(location: ScriptedLocation, geocoder: StaticGeocoder) -> GeofenceResolver {
    GeofenceResolver::new(
        params(),
        Arc::new(location),
        Arc::new(geocoder),
        &LocationConfig::default(),
    )
}

fn relations(pairs: &[(AdminLevel, &str)]) -> Vec<AdminRelation> {
    pairs
        .iter()
        .map(|(level, name)| AdminRelation::new(*level, *name))
        .collect()
}

// =============================================================================
// Confirmation
// =============================================================================

#[tokio::test]
async fn center_with_geocoder_down_confirms_by_distance() {
    let mut gate = resolver(ScriptedLocation::at(CENTER), StaticGeocoder::down());

    let confirmation = gate.begin_confirmation().await.unwrap();
    assert!(gate.state().is_confirmed());
    assert!(confirmation.distance_meters() < 1e-6);
    assert!(confirmation.location_text().starts_with("Near Santa Cruz center"));
    assert!(confirmation.location_text().contains(&CENTER.map_link()));
    assert_eq!(gate.confirmation(), Some(&confirmation));
}

#[tokio::test]
async fn twenty_km_out_with_foreign_address_is_rejected() {
    let geocoder = StaticGeocoder::new(
        Ok(relations(&[
            (AdminLevel::Locality, "Central Plaza"),
            (AdminLevel::Municipality, "Other City"),
            (AdminLevel::Province, "Rizal"),
        ])),
        Ok(HashMap::new()),
    );
    let mut gate = resolver(ScriptedLocation::at(north_of(CENTER, 20_000.0)), geocoder);

    let err = gate.begin_confirmation().await.unwrap_err();
    assert_eq!(err, GateError::Rejected("outside service area".into()));
    assert!(matches!(gate.state(), GateState::Rejected { .. }));
    assert!(gate.confirmation().is_none());
}

#[tokio::test]
async fn matching_locality_confirms_beyond_radius() {
    let geocoder = StaticGeocoder::new(
        Ok(relations(&[
            (AdminLevel::Locality, "Bubukal"),
            (AdminLevel::Municipality, "Santa Cruz"),
            (AdminLevel::Province, "Laguna"),
        ])),
        Ok(HashMap::new()),
    );
    let mut gate = resolver(ScriptedLocation::at(north_of(CENTER, 8_000.0)), geocoder);

    let confirmation = gate.begin_confirmation().await.unwrap();
    assert_eq!(confirmation.location_text(), "Bubukal, Santa Cruz, Laguna");
}

// =============================================================================
// Two-tier reverse geocoding
// =============================================================================

#[tokio::test]
async fn fallback_fills_only_missing_fields() {
    let geocoder = Arc::new(StaticGeocoder::new(
        Ok(relations(&[(AdminLevel::Locality, "Poblacion")])),
        Ok(HashMap::from([
            ("locality".to_string(), "Ignored".to_string()),
            ("municipality".to_string(), "Santa Cruz".to_string()),
            ("province".to_string(), "Laguna".to_string()),
        ])),
    ));
    let mut gate = GeofenceResolver::new(
        params(),
        Arc::new(ScriptedLocation::at(CENTER)),
        Arc::clone(&geocoder) as Arc<dyn crate::location::Geocoder>,
        &LocationConfig::default(),
    );

    let confirmation = gate.begin_confirmation().await.unwrap();
    assert_eq!(confirmation.location_text(), "Poblacion, Santa Cruz, Laguna");
    assert_eq!(geocoder.fallback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn complete_fast_answer_skips_fallback() {
    let geocoder = Arc::new(StaticGeocoder::new(
        Ok(relations(&[
            (AdminLevel::Locality, "Poblacion"),
            (AdminLevel::Municipality, "Santa Cruz"),
            (AdminLevel::Province, "Laguna"),
        ])),
        Err(GeocodeError::Unavailable("unused".into())),
    ));
    let mut gate = GeofenceResolver::new(
        params(),
        Arc::new(ScriptedLocation::at(CENTER)),
        Arc::clone(&geocoder) as Arc<dyn crate::location::Geocoder>,
        &LocationConfig::default(),
    );

    gate.begin_confirmation().await.unwrap();
    assert_eq!(geocoder.fallback_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Fix acquisition
// =============================================================================

#[tokio::test(start_paused = true)]
async fn first_timeout_is_renewed_once() {
    let location = Arc::new(ScriptedLocation::new([
        FixOutcome::Hang,
        FixOutcome::Fix(CENTER),
    ]));
    let mut gate = GeofenceResolver::new(
        params(),
        Arc::clone(&location) as Arc<dyn crate::location::LocationProvider>,
        Arc::new(StaticGeocoder::down()),
        &LocationConfig::default(),
    );

    gate.begin_confirmation().await.unwrap();
    assert_eq!(location.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn second_timeout_returns_gate_to_idle() {
    let location = ScriptedLocation::new([
        FixOutcome::Hang,
        FixOutcome::Fail(LocationError::Timeout),
        FixOutcome::Fix(CENTER),
    ]);
    let mut gate = resolver(location, StaticGeocoder::down());

    let err = gate.begin_confirmation().await.unwrap_err();
    assert_eq!(err, GateError::AcquisitionTimeout);
    assert_eq!(gate.state(), &GateState::Idle);

    // Recoverable: the next attempt uses the third scripted outcome.
    gate.begin_confirmation().await.unwrap();
}

#[tokio::test]
async fn unavailable_provider_is_not_renewed() {
    let location = Arc::new(ScriptedLocation::new([
        FixOutcome::Fail(LocationError::Unavailable("permission denied".into())),
        FixOutcome::Fix(CENTER),
    ]));
    let mut gate = GeofenceResolver::new(
        params(),
        Arc::clone(&location) as Arc<dyn crate::location::LocationProvider>,
        Arc::new(StaticGeocoder::down()),
        &LocationConfig::default(),
    );

    let err = gate.begin_confirmation().await.unwrap_err();
    assert_eq!(err, GateError::LocationUnavailable("permission denied".into()));
    assert_eq!(gate.state(), &GateState::Idle);
    assert_eq!(location.requests.load(Ordering::SeqCst), 1);
}

// =============================================================================
// State machine
// =============================================================================

#[tokio::test]
async fn terminal_state_requires_explicit_retry() {
    let location = ScriptedLocation::new([
        FixOutcome::Fix(north_of(CENTER, 20_000.0)),
        FixOutcome::Fix(CENTER),
    ]);
    let mut gate = resolver(location, StaticGeocoder::down());

    assert!(gate.begin_confirmation().await.is_err());
    assert_eq!(
        gate.begin_confirmation().await.unwrap_err(),
        GateError::NotIdle("rejected")
    );

    gate.retry();
    assert_eq!(gate.state(), &GateState::Idle);
    assert!(gate.begin_confirmation().await.is_ok());
}
