//! `FieldAlert` Core Library
//!
//! Shared functionality for `FieldAlert` components:
//! - Configuration resolution and hierarchy
//! - Great-circle geodesy for geofencing and station routing
//! - `SQLite` pool helpers for the offline queue
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use geo::GeoPoint;
