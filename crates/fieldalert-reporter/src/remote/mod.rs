//! Remote collaborators: report store, station directory, identity store.
//!
//! The pipeline talks to them through async traits. [`RestRemote`] is a
//! reqwest implementation for a JSON tree store addressed by `<path>.json`.

mod client;
pub mod types;


use async_trait::async_trait;
use thiserror::Error;

use crate::report::{ReportPath, ReportSnapshot, ReporterIdentity};
use crate::routing::StationRecord;

pub use client::{RemoteConfigError, RestRemote};
pub use types::{ProfileDocument, StationDocument};

/// Remote call errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Remote store error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

/// Durable remote storage for finalized reports.
#[async_trait]
pub trait RemoteReportStore: Send + Sync {
    /// Single atomic create of `snapshot` at `path`. Returns the push id.
    async fn create_report(
        &self,
        path: &ReportPath,
        snapshot: &ReportSnapshot,
    ) -> Result<String, RemoteError>;
}

/// Source of the responder station directory.
#[async_trait]
pub trait StationDirectory: Send + Sync {
    async fn fetch_stations(&self) -> Result<Vec<StationRecord>, RemoteError>;
}

/// Reporter profile lookup.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<ReporterIdentity, RemoteError>;
}
