//! `FieldAlert` Reporter Library
//!
//! Geofenced incident submission pipeline:
//! - Geofence gate confirming the reporter is inside the service area
//! - Bounded-size evidence compression
//! - Nearest-active station routing
//! - Sequential submission to the remote report store
//! - Offline queue with resync for the constrained channel

pub mod commands;
pub mod connectivity;
pub mod evidence;
pub mod geofence;
pub mod location;
pub mod queue;
pub mod remote;
pub mod report;
pub mod routing;
pub mod session;
pub mod submission;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_helpers;
