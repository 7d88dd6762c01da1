//! Single in-flight compression per capture.
//!
//! The capture control is enabled only while the slot holds its permit free.
//! A retake discards whatever is in flight; a late result from a discarded
//! compression is dropped on arrival.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use super::{CompressedEvidence, EvidenceCompressor};

/// Capture slot errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("A capture is still being compressed")]
    Busy,
}

#[derive(Debug)]
enum SlotState {
    Empty,
    Compressing,
    Ready(CompressedEvidence),
}

#[derive(Debug)]
struct Inner {
    /// Bumped on every `begin` and `retake`; stale completions compare unequal.
    generation: u64,
    state: SlotState,
    permit: Option<OwnedSemaphorePermit>,
}

#[derive(Debug)]
struct Shared {
    inner: Mutex<Inner>,
    settled: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the evidence of one capture while it is compressed off the async
/// runtime.
#[derive(Debug)]
pub struct CaptureSlot {
    compressor: Arc<EvidenceCompressor>,
    permits: Arc<Semaphore>,
    shared: Arc<Shared>,
}

impl CaptureSlot {
    pub fn new(compressor: Arc<EvidenceCompressor>) -> Self {
        Self {
            compressor,
            permits: Arc::new(Semaphore::new(1)),
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    generation: 0,
                    state: SlotState::Empty,
                    permit: None,
                }),
                settled: Notify::new(),
            }),
        }
    }

    /// Whether a new capture may start.
    pub fn is_capture_enabled(&self) -> bool {
        self.permits.available_permits() > 0
    }

    /// Start compressing `source` on the blocking pool. Replaces a finished
    /// result from an earlier capture. Must be called inside a Tokio runtime.
    pub fn begin(&self, source: Vec<u8>) -> Result<(), CaptureError> {
        let compressor = Arc::clone(&self.compressor);
        self.begin_with(move || compressor.compress(&source))
    }

    pub(crate) fn begin_with<F>(&self, work: F) -> Result<(), CaptureError>
    where
        F: FnOnce() -> CompressedEvidence + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| CaptureError::Busy)?;

        let generation = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            inner.state = SlotState::Compressing;
            inner.permit = Some(permit);
            inner.generation
        };
        debug!(generation, "Capture compression started");

        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || {
            let evidence = work();
            let mut inner = shared.lock();
            if inner.generation == generation && matches!(inner.state, SlotState::Compressing) {
                debug!(generation, bytes = evidence.encoded_len, "Capture compression finished");
                inner.state = SlotState::Ready(evidence);
                inner.permit = None;
                drop(inner);
                shared.settled.notify_waiters();
            } else {
                debug!(generation, "Discarded capture finished compressing");
            }
        });
        Ok(())
    }

    /// Discard the current capture, in flight or finished, and re-enable
    /// capture.
    pub fn retake(&self) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        inner.state = SlotState::Empty;
        inner.permit = None;
        drop(inner);
        debug!("Capture discarded for retake");
        self.shared.settled.notify_waiters();
    }

    /// Wait for the in-flight compression to finish. `None` when the slot is
    /// empty or the capture was retaken while waiting.
    pub async fn wait(&self) -> Option<CompressedEvidence> {
        loop {
            let settled = self.shared.settled.notified();
            {
                let inner = self.shared.lock();
                match &inner.state {
                    SlotState::Empty => return None,
                    SlotState::Ready(evidence) => return Some(evidence.clone()),
                    SlotState::Compressing => {}
                }
            }
            settled.await;
        }
    }
}
