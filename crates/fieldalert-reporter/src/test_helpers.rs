//! In-crate fakes for the pipeline's collaborators.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fieldalert_core::GeoPoint;
use fieldalert_core::geo::EARTH_RADIUS_METERS;

use crate::location::{
    AddressComponents, AdminRelation, GeocodeError, Geocoder, LocationError, LocationFix,
    LocationProvider,
};
use crate::remote::{IdentityStore, RemoteError, RemoteReportStore, StationDirectory};
use crate::report::{ReportPath, ReportSnapshot, ReporterIdentity};
use crate::routing::StationRecord;

/// Scripted outcome of one fix request.
#[derive(Debug, Clone)]
pub enum FixOutcome {
    Fix(GeoPoint),
    Fail(LocationError),
    /// Never resolves; only the caller's timeout ends it.
    Hang,
}

/// Location provider replaying a script, one outcome per request.
#[derive(Debug, Default)]
pub struct ScriptedLocation {
    script: Mutex<VecDeque<FixOutcome>>,
    pub requests: AtomicUsize,
}

impl ScriptedLocation {
    pub fn new(script: impl IntoIterator<Item = FixOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn at(point: GeoPoint) -> Self {
        Self::new([FixOutcome::Fix(point)])
    }
}

#[async_trait]
impl LocationProvider for ScriptedLocation {
    async fn request_fix(&self) -> Result<LocationFix, LocationError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(FixOutcome::Fix(point)) => Ok(LocationFix::new(point)),
            Some(FixOutcome::Fail(e)) => Err(e),
            Some(FixOutcome::Hang) => std::future::pending().await,
            None => Err(LocationError::Unavailable("script exhausted".into())),
        }
    }
}

/// Geocoder returning fixed answers for both tiers.
#[derive(Debug)]
pub struct StaticGeocoder {
    relations: Result<Vec<AdminRelation>, GeocodeError>,
    components: Result<AddressComponents, GeocodeError>,
    pub fallback_calls: AtomicUsize,
}

impl StaticGeocoder {
    pub fn new(
        relations: Result<Vec<AdminRelation>, GeocodeError>,
        components: Result<AddressComponents, GeocodeError>,
    ) -> Self {
        Self {
            relations,
            components,
            fallback_calls: AtomicUsize::new(0),
        }
    }

    /// Both tiers fail.
    pub fn down() -> Self {
        let e = GeocodeError::Unavailable("lookup service down".into());
        Self::new(Err(e.clone()), Err(e))
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn lookup_relations(
        &self,
        _point: GeoPoint,
    ) -> Result<Vec<AdminRelation>, GeocodeError> {
        self.relations.clone()
    }

    async fn lookup_components(&self, _point: GeoPoint) -> Result<AddressComponents, GeocodeError> {
        self.fallback_calls.fetch_add(1, Ordering::SeqCst);
        self.components.clone()
    }
}

/// Report store recording every create. Fails the first `fail_first`
/// writes and every write from `fail_from` onward (zero-based).
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub writes: Mutex<Vec<(ReportPath, ReportSnapshot)>>,
    pub attempts: AtomicUsize,
    fail_first: usize,
    fail_from: Option<usize>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self::failing_from(0)
    }

    pub fn failing_from(index: usize) -> Self {
        Self {
            fail_from: Some(index),
            ..Self::default()
        }
    }

    pub fn failing_first(count: usize) -> Self {
        Self {
            fail_first: count,
            ..Self::default()
        }
    }

    pub fn written(&self) -> Vec<(ReportPath, ReportSnapshot)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteReportStore for RecordingStore {
    async fn create_report(
        &self,
        path: &ReportPath,
        snapshot: &ReportSnapshot,
    ) -> Result<String, RemoteError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first || self.fail_from.is_some_and(|from| attempt >= from) {
            return Err(RemoteError::Http("connection reset".into()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((path.clone(), snapshot.clone()));
        Ok(path.push_id.clone())
    }
}

/// Station directory serving a fixed list, or failing.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    stations: Vec<StationRecord>,
    unavailable: bool,
    pub fetches: AtomicUsize,
}

impl StaticDirectory {
    pub fn new(stations: Vec<StationRecord>) -> Self {
        Self {
            stations,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl StationDirectory for StaticDirectory {
    async fn fetch_stations(&self) -> Result<Vec<StationRecord>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(RemoteError::Http("directory unreachable".into()));
        }
        Ok(self.stations.clone())
    }
}

/// Identity store with at most one profile.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    profile: Option<ReporterIdentity>,
}

impl StaticIdentity {
    pub const fn new(profile: ReporterIdentity) -> Self {
        Self {
            profile: Some(profile),
        }
    }

    pub const fn missing() -> Self {
        Self { profile: None }
    }
}

#[async_trait]
impl IdentityStore for StaticIdentity {
    async fn fetch_profile(&self, user_id: &str) -> Result<ReporterIdentity, RemoteError> {
        self.profile
            .clone()
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| RemoteError::NotFound(format!("Profile {user_id}")))
    }
}

/// Point `meters` due north of `origin`.
pub fn north_of(origin: GeoPoint, meters: f64) -> GeoPoint {
    let delta = (meters / EARTH_RADIUS_METERS).to_degrees();
    GeoPoint::new(origin.latitude + delta, origin.longitude)
}

/// Station `meters` due north of `origin`.
pub fn station_at(id: &str, origin: GeoPoint, meters: f64, active: bool) -> StationRecord {
    StationRecord {
        id: id.to_string(),
        name: format!("Station {id}"),
        point: north_of(origin, meters),
        active,
    }
}

#[test]
fn north_of_round_trips_through_distance() {
    let origin = GeoPoint::new(14.5995, 120.9842);
    let d = origin.distance_meters(&north_of(origin, 20_000.0));
    assert!((d - 20_000.0).abs() < 1.0, "got {d}");
}
