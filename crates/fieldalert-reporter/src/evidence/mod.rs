//! Evidence media: bounded-size compression and the per-capture slot.

mod capture;
mod compressor;

use thiserror::Error;

pub use capture::{CaptureError, CaptureSlot};
pub use compressor::{CompressedEvidence, EvidenceCompressor, read_bounds, subsample_factor};

/// Compression errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompressionError {
    /// The source is not a decodable image. Submission proceeds without media.
    #[error("Unreadable image: {0}")]
    Unreadable(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}
