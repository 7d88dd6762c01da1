//! Data models for the offline report queue.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use fieldalert_core::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::report::{ReportCategory, ReportDraft};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Delivery status of a queue entry. Moves `Pending -> Sent` at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Sent,
}

impl QueueStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            other => Err(format!("unknown queue status: {other}")),
        }
    }
}

/// One row of `report_queue`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueueEntry {
    pub id: i64,
    /// Reporter display name.
    pub name: String,
    pub location: String,
    /// Free-text incident type.
    pub report: String,
    pub date: String,
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub station_name: Option<String>,
    pub category: Option<String>,
    pub status: String,
}

impl QueueEntry {
    pub const fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn queue_status(&self) -> Option<QueueStatus> {
        self.status.parse().ok()
    }

    /// Stored category; rows written before the category column existed,
    /// or with an unknown name, resync as `Other`.
    pub fn report_category(&self) -> ReportCategory {
        self.category
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(ReportCategory::Other)
    }

    /// Creation time from the stored date and time columns (UTC).
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()?;
        let time = NaiveTime::parse_from_str(&self.time, TIME_FORMAT).ok()?;
        Some(date.and_time(time).and_utc())
    }
}

/// Denormalized report fields appended by the constrained channel. Media is
/// never queued and the station is unknown until resync.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQueueEntry {
    pub name: String,
    pub location: String,
    pub report: String,
    pub date: String,
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: ReportCategory,
}

impl NewQueueEntry {
    pub fn from_draft(draft: &ReportDraft) -> Self {
        let point = draft.confirmation().point();
        let created_at = draft.created_at();
        Self {
            name: draft.reporter().display_name.clone(),
            location: draft.confirmation().location_text().to_string(),
            report: draft.incident_type().to_string(),
            date: created_at.format(DATE_FORMAT).to_string(),
            time: created_at.format(TIME_FORMAT).to_string(),
            latitude: point.latitude,
            longitude: point.longitude,
            category: draft.category(),
        }
    }
}
