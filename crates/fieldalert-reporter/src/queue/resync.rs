//! Resync of queued reports to the remote store.
//!
//! Entries are delivered oldest first. An entry is marked `sent` only after
//! its remote write succeeded; the first remote failure ends the pass and
//! leaves the rest pending for the next one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::QueueError;
use super::db::QueueDatabase;
use super::models::QueueEntry;
use crate::connectivity::ConnectivityRegistration;
use crate::geofence::Confirmation;
use crate::remote::{RemoteReportStore, StationDirectory};
use crate::report::{ReportDraft, ReportPath, ReporterIdentity};
use crate::routing::{StationRecord, StationRouter};
use crate::session::SessionContext;

/// Outcome of one resync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResyncSummary {
    pub pending: usize,
    pub sent: usize,
    /// Entries that can never form a report (no address and no coordinates).
    pub skipped: usize,
    pub purged: u64,
    /// Why the pass ended before reaching every pending entry.
    pub halted: Option<String>,
}

/// Exponential backoff between passes that stopped early while online.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-indexed), doubling each time.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Delivers pending queue entries.
pub struct ResyncWorker {
    db: QueueDatabase,
    store: Arc<dyn RemoteReportStore>,
    directory: Arc<dyn StationDirectory>,
    router: StationRouter,
    station_root: String,
    retry: RetryPolicy,
}

impl ResyncWorker {
    pub fn new(
        db: QueueDatabase,
        store: Arc<dyn RemoteReportStore>,
        directory: Arc<dyn StationDirectory>,
        station_root: impl Into<String>,
    ) -> Self {
        Self {
            db,
            store,
            directory,
            router: StationRouter::new(),
            station_root: station_root.into(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run one pass over the pending entries, then purge sent ones.
    ///
    /// The station directory is fetched once per pass. Failing to fetch it
    /// is an error; every entry stays pending.
    pub async fn run_pass(&self, session: &SessionContext) -> Result<ResyncSummary, QueueError> {
        let pending = self.db.list_pending().await?;
        let mut summary = ResyncSummary {
            pending: pending.len(),
            ..ResyncSummary::default()
        };

        if !pending.is_empty() {
            let stations = self
                .directory
                .fetch_stations()
                .await
                .map_err(QueueError::Directory)?;

            for entry in &pending {
                match self.deliver(entry, &stations, session).await {
                    Ok(true) => summary.sent += 1,
                    Ok(false) => summary.skipped += 1,
                    Err(reason) => {
                        warn!(
                            queue_id = entry.id,
                            sent = summary.sent,
                            remaining = summary.pending - summary.sent - summary.skipped,
                            reason = %reason,
                            "Resync halted, remaining entries kept pending"
                        );
                        summary.halted = Some(reason);
                        break;
                    }
                }
            }
        }

        summary.purged = self.db.purge_sent().await?;
        info!(
            pending = summary.pending,
            sent = summary.sent,
            skipped = summary.skipped,
            purged = summary.purged,
            halted = summary.halted.is_some(),
            "Resync pass complete"
        );
        Ok(summary)
    }

    /// Route and write one entry. `Ok(false)` for an entry that cannot form a
    /// report; `Err` carries the reason the pass must stop.
    async fn deliver(
        &self,
        entry: &QueueEntry,
        stations: &[StationRecord],
        session: &SessionContext,
    ) -> Result<bool, String> {
        let point = entry.point();
        let category = entry.report_category();

        let reporter = ReporterIdentity {
            display_name: entry.name.clone(),
            ..ReporterIdentity::from(session)
        };
        let created_at = entry.created_at().unwrap_or_else(Utc::now);
        let draft = match ReportDraft::new(
            Confirmation::restored(point, &entry.location),
            reporter,
            category,
            entry.report.clone(),
            created_at,
        ) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(queue_id = entry.id, error = %e, "Skipping unroutable queue entry");
                return Ok(false);
            }
        };

        let route = self.router.route(point, stations).map_err(|e| e.to_string())?;
        let snapshot = draft.finalize(&route);
        let path = ReportPath::new_report(&self.station_root, &route.station.id, category);

        self.store
            .create_report(&path, &snapshot)
            .await
            .map_err(|e| e.to_string())?;

        // The report is durable remotely; a failed status update only means
        // the entry is offered again on the next pass.
        match self.db.mark_sent(entry.id, &route.station.name).await {
            Ok(_) => debug!(queue_id = entry.id, path = %path, "Queue entry delivered"),
            Err(e) => warn!(queue_id = entry.id, error = %e, "Failed to mark delivered queue entry sent"),
        }
        Ok(true)
    }

    /// Run a pass every time connectivity is observed `Online`, until
    /// `shutdown` fires or the monitor goes away. A pass that stops early
    /// while still online is retried with backoff.
    pub fn spawn(
        self: Arc<Self>,
        session: Arc<SessionContext>,
        mut registration: ConnectivityRegistration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut attempt: u32 = 0;
            loop {
                if *shutdown.borrow() {
                    break;
                }
                let mut retry_in = None;
                if registration.current().is_online() {
                    let incomplete = match self.run_pass(&session).await {
                        Ok(summary) => summary.halted.is_some(),
                        Err(e) => {
                            warn!(error = %e, "Resync pass failed");
                            true
                        }
                    };
                    if incomplete {
                        let delay = self.retry.delay_for_attempt(attempt);
                        warn!(attempt, delay_ms = delay.as_millis(), "Resync incomplete, retrying");
                        attempt = attempt.saturating_add(1);
                        retry_in = Some(delay);
                    } else {
                        attempt = 0;
                    }
                }
                tokio::select! {
                    changed = registration.changed() => {
                        if changed.is_none() {
                            break;
                        }
                    }
                    () = tokio::time::sleep(retry_in.unwrap_or_default()), if retry_in.is_some() => {}
                    _ = shutdown.changed() => break,
                }
            }
            debug!("Resync worker stopped");
        })
    }
}
