//! Offline report queue.
//!
//! Durable `SQLite` table backing the constrained submission channel, and the
//! worker that resyncs pending entries to the remote store.

mod db;
mod models;
mod queries;
mod resync;


use fieldalert_core::db::DatabaseError;
use thiserror::Error;

use crate::remote::RemoteError;

pub use db::QueueDatabase;
pub use models::{NewQueueEntry, QueueEntry, QueueStatus};
pub use resync::{ResyncSummary, ResyncWorker, RetryPolicy};

/// Queue and resync errors.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Station directory unavailable: {0}")]
    Directory(#[source] RemoteError),
}
