//! Offline queue queries.

use fieldalert_core::db::DatabaseError;
use tracing::debug;

use super::db::QueueDatabase;
use super::models::{NewQueueEntry, QueueEntry, QueueStatus};

impl QueueDatabase {
    /// Append an entry. No deduplication. Returns the new row id.
    pub async fn insert_entry(&self, entry: &NewQueueEntry) -> Result<i64, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO report_queue (name, location, report, date, time, latitude, longitude, category, status) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.name)
        .bind(&entry.location)
        .bind(&entry.report)
        .bind(&entry.date)
        .bind(&entry.time)
        .bind(entry.latitude)
        .bind(entry.longitude)
        .bind(entry.category.as_str())
        .bind(QueueStatus::Pending.as_str())
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        debug!(queue_id = id, category = %entry.category, "Queue entry inserted");
        Ok(id)
    }

    /// Pending entries, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<QueueEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, QueueEntry>(
            "SELECT * FROM report_queue WHERE status = ? ORDER BY id ASC",
        )
        .bind(QueueStatus::Pending.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Every entry regardless of status, oldest first.
    pub async fn list_entries(&self) -> Result<Vec<QueueEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, QueueEntry>("SELECT * FROM report_queue ORDER BY id ASC")
            .fetch_all(self.pool())
            .await?;

        Ok(entries)
    }

    pub async fn get_entry(&self, id: i64) -> Result<QueueEntry, DatabaseError> {
        sqlx::query_as::<_, QueueEntry>("SELECT * FROM report_queue WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Queue entry {id}")))
    }

    /// Move a pending entry to `status`. Returns `false` when the entry does
    /// not exist or has already left `pending`.
    pub async fn update_status(&self, id: i64, status: QueueStatus) -> Result<bool, DatabaseError> {
        if status == QueueStatus::Pending {
            return Ok(false);
        }

        let result = sqlx::query("UPDATE report_queue SET status = ? WHERE id = ? AND status = ?")
            .bind(status.as_str())
            .bind(id)
            .bind(QueueStatus::Pending.as_str())
            .execute(self.pool())
            .await?;

        let changed = result.rows_affected() > 0;
        debug!(queue_id = id, status = %status, changed, "Queue entry status update");
        Ok(changed)
    }

    /// Mark a pending entry sent and record the station it was routed to.
    pub async fn mark_sent(&self, id: i64, station_name: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE report_queue SET status = ?, station_name = ? WHERE id = ? AND status = ?",
        )
        .bind(QueueStatus::Sent.as_str())
        .bind(station_name)
        .bind(id)
        .bind(QueueStatus::Pending.as_str())
        .execute(self.pool())
        .await?;

        let changed = result.rows_affected() > 0;
        debug!(queue_id = id, station_name, changed, "Queue entry marked sent");
        Ok(changed)
    }

    /// Delete one entry. Deleting a missing id is a no-op.
    pub async fn delete_entry(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM report_queue WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        let deleted = result.rows_affected() > 0;
        debug!(queue_id = id, deleted, "Queue entry delete");
        Ok(deleted)
    }

    /// Delete every `sent` entry. Returns the count removed.
    pub async fn purge_sent(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM report_queue WHERE status = ?")
            .bind(QueueStatus::Sent.as_str())
            .execute(self.pool())
            .await?;

        let removed = result.rows_affected();
        debug!(removed, "Sent queue entries purged");
        Ok(removed)
    }

    pub async fn count_pending(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM report_queue WHERE status = ?")
            .bind(QueueStatus::Pending.as_str())
            .fetch_one(self.pool())
            .await?;

        Ok(row.0)
    }
}
