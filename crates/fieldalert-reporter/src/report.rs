//! Report model: categories, lifecycle status, draft builder and the
//! immutable snapshot written to the remote store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geofence::Confirmation;
use crate::routing::RouteDecision;
use crate::session::SessionContext;

/// Report construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("Report has neither an address nor valid coordinates")]
    MissingLocation,

    #[error("Unknown report category: {0}")]
    UnknownCategory(String),
}

/// Incident category. Its name is the `<Category>` segment of the report path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportCategory {
    Fire,
    Crime,
    Medical,
    Accident,
    Disaster,
    Other,
}

impl ReportCategory {
    pub const ALL: [Self; 6] = [
        Self::Fire,
        Self::Crime,
        Self::Medical,
        Self::Accident,
        Self::Disaster,
        Self::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fire => "Fire",
            Self::Crime => "Crime",
            Self::Medical => "Medical",
            Self::Accident => "Accident",
            Self::Disaster => "Disaster",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportCategory {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ReportError::UnknownCategory(s.to_string()))
    }
}

/// Report lifecycle. Owned by the remote store's operators after creation;
/// transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    Pending,
    Ongoing,
    Completed,
    Cancelled,
}

impl ReportStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Ongoing => "Ongoing",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether an operator may move a report from `self` to `next`.
    pub const fn can_advance_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Ongoing | Self::Completed | Self::Cancelled)
                | (Self::Ongoing, Self::Completed | Self::Cancelled)
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who submitted the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReporterIdentity {
    pub user_id: String,
    pub display_name: String,
    pub phone: Option<String>,
}

impl From<&SessionContext> for ReporterIdentity {
    fn from(session: &SessionContext) -> Self {
        Self {
            user_id: session.user_id().to_string(),
            display_name: session.display_name().to_string(),
            phone: session.phone().map(str::to_string),
        }
    }
}

/// Human-readable confirmation shown before the report is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftSummary {
    pub category: ReportCategory,
    pub incident_type: String,
    pub reporter_name: String,
    pub location_text: String,
    pub map_link: String,
    pub created_at: DateTime<Utc>,
    pub has_media: bool,
}

impl fmt::Display for DraftSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Category: {}", self.category)?;
        writeln!(f, "Type:     {}", self.incident_type)?;
        writeln!(f, "Reporter: {}", self.reporter_name)?;
        writeln!(f, "Location: {}", self.location_text)?;
        writeln!(f, "Map:      {}", self.map_link)?;
        write!(
            f,
            "Time:     {}{}",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            if self.has_media { " (photo attached)" } else { "" }
        )
    }
}

/// Report under construction. Finalizes into a [`ReportSnapshot`] only once
/// the routed station is known.
#[derive(Debug, Clone)]
pub struct ReportDraft {
    category: ReportCategory,
    incident_type: String,
    reporter: ReporterIdentity,
    confirmation: Confirmation,
    created_at: DateTime<Utc>,
    media: Option<String>,
    has_pending_media: bool,
}

impl ReportDraft {
    /// Start a draft from a confirmed gate.
    pub fn new(
        confirmation: Confirmation,
        reporter: ReporterIdentity,
        category: ReportCategory,
        incident_type: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ReportError> {
        if confirmation.location_text().trim().is_empty() && !confirmation.point().is_valid() {
            return Err(ReportError::MissingLocation);
        }
        Ok(Self {
            category,
            incident_type: incident_type.into(),
            reporter,
            confirmation,
            created_at,
            media: None,
            has_pending_media: false,
        })
    }

    /// Mark that evidence will be compressed and attached on confirmation.
    #[must_use]
    pub const fn expecting_media(mut self, expected: bool) -> Self {
        self.has_pending_media = expected;
        self
    }

    /// Attach the transport-encoded evidence payload.
    #[must_use]
    pub fn with_media(mut self, payload: Option<String>) -> Self {
        self.media = payload.filter(|p| !p.is_empty());
        self
    }

    /// Replace the session identity with the stored profile.
    #[must_use]
    pub fn with_reporter(mut self, reporter: ReporterIdentity) -> Self {
        self.reporter = reporter;
        self
    }

    pub const fn category(&self) -> ReportCategory {
        self.category
    }

    pub fn incident_type(&self) -> &str {
        &self.incident_type
    }

    pub const fn reporter(&self) -> &ReporterIdentity {
        &self.reporter
    }

    pub const fn confirmation(&self) -> &Confirmation {
        &self.confirmation
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn summary(&self) -> DraftSummary {
        DraftSummary {
            category: self.category,
            incident_type: self.incident_type.clone(),
            reporter_name: self.reporter.display_name.clone(),
            location_text: self.confirmation.location_text().to_string(),
            map_link: self.confirmation.map_link().to_string(),
            created_at: self.created_at,
            has_media: self.media.is_some() || self.has_pending_media,
        }
    }

    /// Finalize with the routed station. Status starts at `Pending`, unread.
    pub fn finalize(self, route: &RouteDecision) -> ReportSnapshot {
        let point = self.confirmation.point();
        ReportSnapshot {
            category: self.category,
            reporter_id: self.reporter.user_id,
            reporter_name: self.reporter.display_name,
            reporter_phone: self.reporter.phone,
            incident_type: self.incident_type,
            created_at: self.created_at,
            latitude: point.latitude,
            longitude: point.longitude,
            location: self.confirmation.location_text().to_string(),
            map_link: self.confirmation.map_link().to_string(),
            image: self.media,
            status: ReportStatus::Pending,
            station_id: route.station.id.clone(),
            station_name: route.station.name.clone(),
            read: false,
        }
    }
}

/// Immutable report record handed to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
    category: ReportCategory,
    reporter_id: String,
    reporter_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reporter_phone: Option<String>,
    #[serde(rename = "type")]
    incident_type: String,
    created_at: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    location: String,
    map_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    status: ReportStatus,
    station_id: String,
    station_name: String,
    read: bool,
}

impl ReportSnapshot {
    pub const fn category(&self) -> ReportCategory {
        self.category
    }

    pub fn reporter_id(&self) -> &str {
        &self.reporter_id
    }

    pub fn reporter_name(&self) -> &str {
        &self.reporter_name
    }

    pub fn incident_type(&self) -> &str {
        &self.incident_type
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn map_link(&self) -> &str {
        &self.map_link
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub const fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn station_name(&self) -> &str {
        &self.station_name
    }

    pub const fn read(&self) -> bool {
        self.read
    }
}

/// `<station-root>/<station-id>/AllReport/<Category>/<push-id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPath {
    pub station_root: String,
    pub station_id: String,
    pub category: ReportCategory,
    pub push_id: String,
}

impl ReportPath {
    /// Path for a new report under `station_id`, with a fresh push id.
    pub fn new_report(station_root: &str, station_id: &str, category: ReportCategory) -> Self {
        Self {
            station_root: station_root.trim_matches('/').to_string(),
            station_id: station_id.to_string(),
            category,
            push_id: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

impl fmt::Display for ReportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/AllReport/{}/{}",
            self.station_root, self.station_id, self.category, self.push_id
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::routing::StationRecord;
    use fieldalert_core::GeoPoint;

    fn confirmation(text: &str, point: GeoPoint) -> Confirmation {
        Confirmation::restored(point, text)
    }

    fn reporter() -> ReporterIdentity {
        ReporterIdentity {
            user_id: "uid-1".into(),
            display_name: "Ana Reyes".into(),
            phone: Some("+639170000000".into()),
        }
    }

    fn route() -> RouteDecision {
        RouteDecision {
            station: StationRecord {
                id: "st-1".into(),
                name: "Central Fire Station".into(),
                point: GeoPoint::new(14.28, 121.41),
                active: true,
            },
            distance_meters: 120.0,
            fallback_to_inactive: false,
        }
    }

    #[test]
    fn status_moves_forward_only() {
        use ReportStatus::{Cancelled, Completed, Ongoing, Pending};
        assert!(Pending.can_advance_to(Ongoing));
        assert!(Ongoing.can_advance_to(Completed));
        assert!(Pending.can_advance_to(Cancelled));
        assert!(!Ongoing.can_advance_to(Pending));
        assert!(!Completed.can_advance_to(Ongoing));
        assert!(!Cancelled.can_advance_to(Pending));
        assert!(!Pending.can_advance_to(Pending));
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("fire".parse::<ReportCategory>().unwrap(), ReportCategory::Fire);
        assert_eq!(" MEDICAL ".parse::<ReportCategory>().unwrap(), ReportCategory::Medical);
        assert!("flood-ish".parse::<ReportCategory>().is_err());
    }

    #[test]
    fn draft_requires_address_or_coordinates() {
        let err = ReportDraft::new(
            confirmation("", GeoPoint::new(0.0, 0.0)),
            reporter(),
            ReportCategory::Fire,
            "House fire",
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, ReportError::MissingLocation);
    }

    #[test]
    fn finalize_fills_station_and_starts_pending() {
        let draft = ReportDraft::new(
            confirmation("Poblacion, Santa Cruz", GeoPoint::new(14.2814, 121.4161)),
            reporter(),
            ReportCategory::Fire,
            "House fire",
            Utc::now(),
        )
        .unwrap()
        .with_media(Some("aGVsbG8=".into()));

        let snapshot = draft.finalize(&route());
        assert_eq!(snapshot.station_id(), "st-1");
        assert_eq!(snapshot.station_name(), "Central Fire Station");
        assert_eq!(snapshot.status(), ReportStatus::Pending);
        assert!(!snapshot.read());
        assert_eq!(snapshot.image(), Some("aGVsbG8="));
        assert_eq!(snapshot.location(), "Poblacion, Santa Cruz");
    }

    #[test]
    fn snapshot_serializes_with_wire_field_names() {
        let snapshot = ReportDraft::new(
            confirmation("Poblacion", GeoPoint::new(14.2814, 121.4161)),
            reporter(),
            ReportCategory::Crime,
            "Theft",
            Utc::now(),
        )
        .unwrap()
        .finalize(&route());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["type"], "Theft");
        assert_eq!(json["category"], "Crime");
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["stationName"], "Central Fire Station");
        assert_eq!(json["read"], false);
        assert!(json.get("image").is_none());
    }

    #[test]
    fn empty_media_payload_is_dropped() {
        let draft = ReportDraft::new(
            confirmation("Poblacion", GeoPoint::new(14.2814, 121.4161)),
            reporter(),
            ReportCategory::Medical,
            "Collapsed",
            Utc::now(),
        )
        .unwrap()
        .with_media(Some(String::new()));
        assert!(!draft.summary().has_media);
    }

    #[test]
    fn report_path_has_expected_shape() {
        let path = ReportPath::new_report("/Stations/", "st-9", ReportCategory::Accident);
        let rendered = path.to_string();
        assert!(rendered.starts_with("Stations/st-9/AllReport/Accident/"));
        assert_eq!(path.push_id.len(), 32);
    }
}
