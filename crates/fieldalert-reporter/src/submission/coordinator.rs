//! Submission chain.

use std::sync::Arc;

use chrono::Utc;
use fieldalert_core::Config;
use tracing::{debug, info, instrument, warn};

use super::liveness::{Liveness, SubmissionStage};
use super::SubmissionError;
use crate::evidence::{CaptureSlot, CompressedEvidence, EvidenceCompressor};
use crate::geofence::{GateError, GateState};
use crate::queue::{NewQueueEntry, QueueDatabase};
use crate::remote::{IdentityStore, RemoteReportStore, StationDirectory};
use crate::report::{DraftSummary, ReportCategory, ReportDraft, ReportPath, ReporterIdentity};
use crate::routing::{StationRecord, StationRouter};
use crate::session::SessionContext;

/// Evidence attached to a request.
#[derive(Debug, Clone)]
pub enum Evidence {
    /// Raw image bytes, compressed during submission.
    Raw(Vec<u8>),
    /// A capture already compressing in its slot.
    Captured(Arc<CaptureSlot>),
}

/// Selection fields gathered by the hosting screen.
#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    pub category: Option<ReportCategory>,
    pub incident_type: Option<String>,
    pub evidence: Option<Evidence>,
}

/// A validated draft awaiting the reporter's confirmation.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    draft: ReportDraft,
    evidence: Option<Evidence>,
}

impl PreparedSubmission {
    pub const fn draft(&self) -> &ReportDraft {
        &self.draft
    }

    pub fn summary(&self) -> DraftSummary {
        self.draft.summary()
    }
}

/// Result of a successful primary-channel submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub push_id: String,
    pub path: ReportPath,
    pub station: StationRecord,
    pub distance_meters: f64,
    pub fallback_to_inactive: bool,
    pub media_attached: bool,
}

/// Orchestrates submission attempts against the remote collaborators.
pub struct SubmissionCoordinator {
    compressor: Arc<EvidenceCompressor>,
    router: StationRouter,
    store: Arc<dyn RemoteReportStore>,
    directory: Arc<dyn StationDirectory>,
    identity: Arc<dyn IdentityStore>,
    queue: Option<QueueDatabase>,
    station_root: String,
    liveness: Liveness,
}

impl SubmissionCoordinator {
    pub fn new(
        config: &Config,
        store: Arc<dyn RemoteReportStore>,
        directory: Arc<dyn StationDirectory>,
        identity: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            compressor: Arc::new(EvidenceCompressor::new(config.media.clone())),
            router: StationRouter::new(),
            store,
            directory,
            identity,
            queue: None,
            station_root: config.remote.station_root.clone(),
            liveness: Liveness::new(),
        }
    }

    /// Enable the constrained channel.
    #[must_use]
    pub fn with_queue(mut self, queue: QueueDatabase) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Share the hosting screen's liveness flag.
    #[must_use]
    pub fn with_liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = liveness;
        self
    }

    pub const fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    pub fn compressor(&self) -> Arc<EvidenceCompressor> {
        Arc::clone(&self.compressor)
    }

    /// Validate the request against the gate and build the draft with the
    /// current time. Nothing remote is touched.
    pub fn prepare(
        &self,
        gate: &GateState,
        session: &SessionContext,
        request: SubmissionRequest,
    ) -> Result<PreparedSubmission, SubmissionError> {
        let confirmation = match gate {
            GateState::Confirmed(confirmation) => confirmation.clone(),
            GateState::Rejected { reason } => {
                return Err(GateError::Rejected(reason.clone()).into());
            }
            other => {
                debug!(state = other.name(), "Submission attempted before confirmation");
                return Err(SubmissionError::Validation(
                    "Location has not been confirmed yet.".into(),
                ));
            }
        };

        let category = request
            .category
            .ok_or_else(|| SubmissionError::Validation("Please select a category.".into()))?;
        let incident_type = request
            .incident_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SubmissionError::Validation("Please select an incident type.".into()))?;

        let draft = ReportDraft::new(
            confirmation,
            ReporterIdentity::from(session),
            category,
            incident_type,
            Utc::now(),
        )?
        .expecting_media(request.evidence.is_some());

        self.liveness.publish(SubmissionStage::AwaitingConfirmation);
        Ok(PreparedSubmission {
            draft,
            evidence: request.evidence,
        })
    }

    /// Run the confirmed submission through to the remote write.
    ///
    /// A failed write is returned to the caller and never queued.
    #[instrument(skip_all, fields(category = %prepared.draft.category()))]
    pub async fn submit(
        &self,
        prepared: PreparedSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let result = self.run_chain(prepared).await;
        match &result {
            Ok(receipt) => {
                self.liveness.publish(SubmissionStage::Submitted {
                    push_id: receipt.push_id.clone(),
                });
            }
            Err(e) => {
                warn!(error = %e, "Submission failed");
                self.liveness.publish(SubmissionStage::Failed {
                    message: e.user_message().unwrap_or_else(|| e.to_string()),
                });
            }
        }
        result
    }

    async fn run_chain(
        &self,
        prepared: PreparedSubmission,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let PreparedSubmission { draft, evidence } = prepared;

        let media = match evidence {
            Some(evidence) => {
                self.liveness.publish(SubmissionStage::CompressingEvidence);
                self.compress(evidence).await
            }
            None => None,
        };
        let media_attached = media.is_some();
        let draft = draft.with_media(media.map(|m| m.payload));

        self.liveness.publish(SubmissionStage::FetchingProfile);
        let draft = match self.identity.fetch_profile(&draft.reporter().user_id).await {
            Ok(profile) => draft.with_reporter(profile),
            Err(e) => {
                warn!(error = %e, user_id = %draft.reporter().user_id, "Profile fetch failed, using session identity");
                draft
            }
        };

        self.liveness.publish(SubmissionStage::Routing);
        let stations = self
            .directory
            .fetch_stations()
            .await
            .map_err(SubmissionError::Directory)?;
        let route = self.router.route(draft.confirmation().point(), &stations)?;

        let category = draft.category();
        let snapshot = draft.finalize(&route);
        let path = ReportPath::new_report(&self.station_root, &route.station.id, category);

        self.liveness.publish(SubmissionStage::Writing);
        // The write runs on its own task so dropping this future cannot
        // cancel it mid-write.
        let store = Arc::clone(&self.store);
        let write_path = path.clone();
        let push_id = tokio::spawn(async move { store.create_report(&write_path, &snapshot).await })
            .await
            .map_err(|e| SubmissionError::WriteTask(e.to_string()))?
            .map_err(SubmissionError::RemoteWrite)?;

        info!(
            push_id = %push_id,
            station_id = %route.station.id,
            distance_m = route.distance_meters,
            media_attached,
            "Report submitted"
        );

        Ok(SubmissionReceipt {
            push_id,
            path,
            station: route.station,
            distance_meters: route.distance_meters,
            fallback_to_inactive: route.fallback_to_inactive,
            media_attached,
        })
    }

    /// Compress to completion before any network step. Unreadable evidence
    /// yields `None` and the report goes without media.
    async fn compress(&self, evidence: Evidence) -> Option<CompressedEvidence> {
        let compressed = match evidence {
            Evidence::Raw(bytes) => {
                let compressor = Arc::clone(&self.compressor);
                match tokio::task::spawn_blocking(move || compressor.compress(&bytes)).await {
                    Ok(compressed) => compressed,
                    Err(e) => {
                        warn!(error = %e, "Compression task failed");
                        return None;
                    }
                }
            }
            Evidence::Captured(slot) => slot.wait().await?,
        };

        if compressed.is_empty() {
            warn!("Evidence unreadable, submitting without media");
            return None;
        }
        Some(compressed)
    }

    /// Constrained channel: append the draft to the offline queue without
    /// media. The station is chosen on resync.
    #[instrument(skip_all, fields(category = %draft.category()))]
    pub async fn submit_constrained(&self, draft: &ReportDraft) -> Result<i64, SubmissionError> {
        let queue = self.queue.as_ref().ok_or(SubmissionError::QueueUnavailable)?;
        let queue_id = queue.insert_entry(&NewQueueEntry::from_draft(draft)).await?;
        info!(queue_id, "Report queued for resync");
        self.liveness.publish(SubmissionStage::Queued { queue_id });
        Ok(queue_id)
    }
}
