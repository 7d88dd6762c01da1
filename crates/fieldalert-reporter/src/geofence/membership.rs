//! Service-area membership test.

use fieldalert_core::GeoPoint;
use fieldalert_core::config::ServiceAreaConfig;

/// One parametrized gate shared by every submission flow.
#[derive(Debug, Clone)]
pub struct GeofenceParams {
    pub center: GeoPoint,
    pub radius_meters: f64,
    /// Matched case-insensitively against the resolved address text.
    pub locality_token: String,
    pub area_label: String,
}

impl GeofenceParams {
    pub fn new(center: GeoPoint, radius_meters: f64, locality_token: impl Into<String>) -> Self {
        let locality_token = locality_token.into();
        Self {
            center,
            radius_meters,
            area_label: locality_token.clone(),
            locality_token,
        }
    }

    pub fn from_config(area: &ServiceAreaConfig) -> Self {
        Self {
            center: area.center(),
            radius_meters: area.radius_meters,
            locality_token: area.locality_token.clone(),
            area_label: area.area_label.clone(),
        }
    }

    fn address_matches(&self, address_text: &str) -> bool {
        let token = self.locality_token.trim().to_lowercase();
        !token.is_empty() && address_text.to_lowercase().contains(&token)
    }
}

/// Outcome of [`resolve_membership`].
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub inside: bool,
    pub by_locality: bool,
    pub by_distance: bool,
    /// Great-circle distance to the area center; infinite for an invalid fix.
    pub distance_meters: f64,
    /// Canonical location string: the resolved address when present, a
    /// synthesized near-center string when only distance confirmed, empty
    /// otherwise.
    pub location_text: String,
    pub map_link: String,
}

/// Area membership is `address contains token` OR `distance <= radius`.
///
/// The distance test alone is sufficient, so an address-lookup outage never
/// rejects a reporter who is physically inside the radius.
pub fn resolve_membership(params: &GeofenceParams, address_text: &str, point: GeoPoint) -> Membership {
    let address = address_text.trim();
    let distance_meters = if point.is_valid() {
        point.distance_meters(&params.center)
    } else {
        f64::INFINITY
    };

    let by_locality = params.address_matches(address);
    let by_distance = distance_meters <= params.radius_meters;
    let map_link = point.map_link();

    let location_text = if !address.is_empty() {
        address.to_string()
    } else if by_distance {
        format!("Near {} center ({map_link})", params.area_label)
    } else {
        String::new()
    };

    Membership {
        inside: by_locality || by_distance,
        by_locality,
        by_distance,
        distance_meters,
        location_text,
        map_link,
    }
}
