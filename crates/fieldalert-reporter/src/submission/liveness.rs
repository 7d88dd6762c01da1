//! Liveness of the hosting screen and submission progress.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::debug;

/// Where a submission attempt currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStage {
    Idle,
    AwaitingConfirmation,
    CompressingEvidence,
    FetchingProfile,
    Routing,
    Writing,
    Submitted { push_id: String },
    Queued { queue_id: i64 },
    Failed { message: String },
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::AwaitingConfirmation => f.write_str("awaiting confirmation"),
            Self::CompressingEvidence => f.write_str("compressing evidence"),
            Self::FetchingProfile => f.write_str("fetching profile"),
            Self::Routing => f.write_str("routing"),
            Self::Writing => f.write_str("writing report"),
            Self::Submitted { push_id } => write!(f, "submitted ({push_id})"),
            Self::Queued { queue_id } => write!(f, "queued (#{queue_id})"),
            Self::Failed { message } => write!(f, "failed: {message}"),
        }
    }
}

/// Shared between a hosting screen and the coordinator. After
/// [`Liveness::tear_down`] progress is no longer published; work already
/// issued still runs to completion.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
    progress: Arc<watch::Sender<SubmissionStage>>,
}

impl Liveness {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SubmissionStage::Idle);
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            progress: Arc::new(tx),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn tear_down(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            debug!("Submission host torn down");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionStage> {
        self.progress.subscribe()
    }

    pub fn stage(&self) -> SubmissionStage {
        self.progress.borrow().clone()
    }

    /// Publish `stage` if the host is still alive. Returns whether it was
    /// published.
    pub fn publish(&self, stage: SubmissionStage) -> bool {
        if !self.is_alive() {
            debug!(stage = %stage, "Progress dropped, host gone");
            return false;
        }
        self.progress.send_replace(stage);
        true
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
