//! Great-circle geodesy used by the geofence gate and station routing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a point, rejecting values outside the latitude/longitude ranges.
    pub fn checked(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self::new(latitude, longitude);
        if point.in_range() {
            Ok(point)
        } else {
            Err(Error::InvalidCoordinates(format!("{latitude}, {longitude}")))
        }
    }

    fn in_range(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// True for finite, in-range coordinates other than the `0,0` sentinel
    /// that location stacks report when no fix is available.
    pub fn is_valid(&self) -> bool {
        self.in_range() && !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// Haversine distance to `other` in meters.
    pub fn distance_meters(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_METERS * c
    }

    /// A shareable map link centred on this point.
    pub fn map_link(&self) -> String {
        format!(
            "https://maps.google.com/?q={:.6},{:.6}",
            self.latitude, self.longitude
        )
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}
