//! Remote store document types.
//!
//! Deserialization structs matching the JSON tree layout of the station
//! directory and reporter profiles.

use std::collections::BTreeMap;

use fieldalert_core::GeoPoint;
use serde::Deserialize;
use tracing::warn;

use crate::report::ReporterIdentity;
use crate::routing::StationRecord;

/// Status string of a station that is accepting reports.
const ACTIVE_STATUS: &str = "Active";

/// A decimal field stored either as a string (the documented shape) or as a
/// bare JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Decimal {
    Text(String),
    Number(f64),
}

impl Decimal {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Text(s) => s.trim().parse().ok(),
            Self::Number(n) => Some(*n),
        }
    }
}

/// `<station-directory-root>/<station-id>`.
#[derive(Debug, Clone, Deserialize)]
pub struct StationDocument {
    #[serde(default, alias = "stationName")]
    pub name: Option<String>,
    pub latitude: Decimal,
    pub longitude: Decimal,
    /// Free text, compared case-insensitively to `"Active"`.
    #[serde(default)]
    pub status: String,
}

impl StationDocument {
    /// Convert to a routing record. `None` when the coordinates are unusable.
    pub fn into_record(self, id: &str) -> Option<StationRecord> {
        let latitude = self.latitude.value()?;
        let longitude = self.longitude.value()?;
        let point = GeoPoint::checked(latitude, longitude).ok()?;
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| id.to_string());
        Some(StationRecord {
            id: id.to_string(),
            name,
            point,
            active: self.status.trim().eq_ignore_ascii_case(ACTIVE_STATUS),
        })
    }
}

/// Parse the whole directory tree. Malformed stations are skipped; a `null`
/// tree is an empty directory. Records come out in key order.
pub fn parse_directory(tree: serde_json::Value) -> Result<Vec<StationRecord>, serde_json::Error> {
    if tree.is_null() {
        return Ok(Vec::new());
    }
    let entries: BTreeMap<String, serde_json::Value> = serde_json::from_value(tree)?;

    let mut stations = Vec::with_capacity(entries.len());
    for (id, value) in entries {
        let record = serde_json::from_value::<StationDocument>(value)
            .ok()
            .and_then(|doc| doc.into_record(&id));
        match record {
            Some(record) => stations.push(record),
            None => warn!(station_id = %id, "Skipping station with unusable directory entry"),
        }
    }
    Ok(stations)
}

/// Reporter profile record.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDocument {
    #[serde(alias = "fullName", alias = "fullname")]
    pub name: String,
    #[serde(default, alias = "contactNumber", alias = "phone_number")]
    pub phone: Option<String>,
}

impl ProfileDocument {
    pub fn into_identity(self, user_id: &str) -> ReporterIdentity {
        ReporterIdentity {
            user_id: user_id.to_string(),
            display_name: self.name,
            phone: self.phone.filter(|p| !p.trim().is_empty()),
        }
    }
}
