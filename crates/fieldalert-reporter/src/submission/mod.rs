//! Submission coordinator.
//!
//! One attempt is a sequential chain: validate and build the draft, show a
//! summary, then compress evidence, fetch the profile, route, finalize and
//! write. Any failing step ends the attempt before anything is written.

mod coordinator;
mod liveness;


use fieldalert_core::db::DatabaseError;
use thiserror::Error;

use crate::geofence::GateError;
use crate::remote::RemoteError;
use crate::report::ReportError;
use crate::routing::RoutingError;

pub use coordinator::{
    Evidence, PreparedSubmission, SubmissionCoordinator, SubmissionReceipt, SubmissionRequest,
};
pub use liveness::{Liveness, SubmissionStage};

/// Submission errors.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Rejected locally before any remote call.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("Station directory unavailable: {0}")]
    Directory(#[source] RemoteError),

    /// Surfaced to the caller; the report is not queued.
    #[error("Remote write failed: {0}")]
    RemoteWrite(#[source] RemoteError),

    #[error("Remote write task failed: {0}")]
    WriteTask(String),

    #[error("Offline queue is not configured")]
    QueueUnavailable,

    #[error("Offline queue error: {0}")]
    Queue(#[from] DatabaseError),
}

impl SubmissionError {
    /// Short message for conditions the reporter can act on.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Validation(message) => Some(message.clone()),
            Self::Gate(GateError::Rejected(_)) => {
                Some("You are outside the service area. Move closer and try again.".into())
            }
            Self::Report(ReportError::MissingLocation) => {
                Some("Your location could not be determined. Please try again.".into())
            }
            Self::Routing(RoutingError::NoStationsAvailable) => {
                Some("No responder station is available right now.".into())
            }
            Self::RemoteWrite(_) => Some("Your report could not be sent. Please try again.".into()),
            _ => None,
        }
    }
}
