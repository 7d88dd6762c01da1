//! Location and reverse-geocoding collaborators.
//!
//! Both are one-shot: each call resolves exactly once, and dropping the
//! returned future (on timeout or teardown) detaches the request.

use std::collections::HashMap;

use async_trait::async_trait;
use fieldalert_core::GeoPoint;
use thiserror::Error;

/// Location acquisition errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location fix timed out")]
    Timeout,

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Reverse-geocoding errors. Never fatal to the geofence gate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("Geocoder unavailable: {0}")]
    Unavailable(String),
}

/// A single high-accuracy location fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub point: GeoPoint,
    /// Horizontal accuracy radius in meters, when the provider reports one.
    pub accuracy_meters: Option<f64>,
}

impl LocationFix {
    pub const fn new(point: GeoPoint) -> Self {
        Self {
            point,
            accuracy_meters: None,
        }
    }
}

/// Administrative level of a tagged relation from the fast geocode query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminLevel {
    Neighbourhood,
    Locality,
    Municipality,
    Province,
    Region,
    Country,
}

impl AdminLevel {
    /// Address fields in the order they appear in composed address text.
    pub const ORDERED: [Self; 6] = [
        Self::Neighbourhood,
        Self::Locality,
        Self::Municipality,
        Self::Province,
        Self::Region,
        Self::Country,
    ];

    /// Key used by the fallback query's flat component map.
    pub const fn component_key(self) -> &'static str {
        match self {
            Self::Neighbourhood => "neighbourhood",
            Self::Locality => "locality",
            Self::Municipality => "municipality",
            Self::Province => "province",
            Self::Region => "region",
            Self::Country => "country",
        }
    }
}

/// One tagged administrative relation, e.g. `(Municipality, "Santa Cruz")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRelation {
    pub level: AdminLevel,
    pub name: String,
}

impl AdminRelation {
    pub fn new(level: AdminLevel, name: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into(),
        }
    }
}

/// Flat address-component map returned by the fallback query, keyed by
/// [`AdminLevel::component_key`].
pub type AddressComponents = HashMap<String, String>;

/// Source of location fixes.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Request exactly one high-accuracy fix.
    async fn request_fix(&self) -> Result<LocationFix, LocationError>;
}

/// Two-tier address lookup. Both queries are best effort and may return
/// nothing.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Fast structured query returning tagged administrative relations.
    async fn lookup_relations(&self, point: GeoPoint)
    -> Result<Vec<AdminRelation>, GeocodeError>;

    /// Slower fallback query returning a flat component map.
    async fn lookup_components(&self, point: GeoPoint) -> Result<AddressComponents, GeocodeError>;
}

/// Provider that always reports one preset fix (command-line use).
#[derive(Debug, Clone, Copy)]
pub struct FixedLocationProvider {
    fix: LocationFix,
}

impl FixedLocationProvider {
    pub const fn new(point: GeoPoint) -> Self {
        Self {
            fix: LocationFix::new(point),
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn request_fix(&self) -> Result<LocationFix, LocationError> {
        Ok(self.fix)
    }
}

/// Geocoder for hosts without an address service. Membership then rests on
/// the distance test alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGeocoder;

#[async_trait]
impl Geocoder for NullGeocoder {
    async fn lookup_relations(
        &self,
        _point: GeoPoint,
    ) -> Result<Vec<AdminRelation>, GeocodeError> {
        Err(GeocodeError::Unavailable("no geocoder configured".into()))
    }

    async fn lookup_components(
        &self,
        _point: GeoPoint,
    ) -> Result<AddressComponents, GeocodeError> {
        Err(GeocodeError::Unavailable("no geocoder configured".into()))
    }
}
