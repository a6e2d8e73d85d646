//! Pipeline error types
//!
//! Every non-success path of a scan run maps to one of these variants.
//! A user cancelling the capture is not an error and is reported through
//! [`crate::app::PipelineOutcome::CaptureCancelled`] instead.

use std::path::PathBuf;
use std::time::Duration;

/// Typed failure of a capture/normalize run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The capture device did not answer within the configured wait
    #[error("capture device did not respond within {waited:?}")]
    CaptureTimeout { waited: Duration },

    /// The device reported an error, or claimed success without writing a file
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// The image file could not be opened at all
    #[error("could not open {} to read metadata: {source}", .path.display())]
    MetadataRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image file is unreadable or corrupt
    #[error("failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("downsample factor must be at least 1, got {0}")]
    InvalidDownsample(u32),

    /// Header dimensions exceed the configured decode ceiling
    #[error("{} is {pixels} pixels, limit is {limit}", .path.display())]
    ResourceLimit {
        path: PathBuf,
        pixels: u64,
        limit: u64,
    },

    /// The OCR consumer refused the normalized buffer
    #[error("OCR consumer rejected the buffer: {0:#}")]
    Consumer(anyhow::Error),

    #[error("checkpoint {}: {reason}", .path.display())]
    Checkpoint { path: PathBuf, reason: String },
}

impl PipelineError {
    /// Whether a host should offer the user a retake
    pub fn is_capture_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::CaptureTimeout { .. } | PipelineError::CaptureFailed(_)
        )
    }

    /// Whether the captured file itself is unusable, so resuming cannot help
    pub fn is_unusable_image(&self) -> bool {
        match self {
            PipelineError::Decode { .. } | PipelineError::ResourceLimit { .. } => true,
            PipelineError::MetadataRead { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
