//! Notifications emitted while a scan runs

use std::path::PathBuf;

use crate::vision::OrientationTag;

/// Progress messages sent from the pipeline to its host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The capture device was asked for a photo
    CaptureStarted { destination: PathBuf },
    /// The device wrote a photo
    CaptureCompleted { path: PathBuf },
    /// The user backed out of the capture
    CaptureCancelled,
    /// A normalized buffer was delivered to the OCR consumer
    Normalized {
        path: PathBuf,
        orientation: OrientationTag,
        width: u32,
        height: u32,
    },
    /// The run ended with an error
    Failed { reason: String },
}
