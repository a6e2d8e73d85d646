//! Scope - photo capture and orientation normalization for OCR
//!
//! Captures a photo through an injected device, reads its EXIF orientation
//! and produces an upright RGBA buffer for an external OCR engine.

pub mod app;
pub mod capture;
pub mod config;
pub mod error;
pub mod shared;
pub mod storage;
pub mod vision;

#[cfg(test)]
mod test_support;

pub use app::{PipelineOutcome, ResumeOutcome, ScanPipeline, ScanReport};
pub use capture::{
    CaptureDevice, CaptureOutcome, CaptureTrigger, CapturedImage, CommandDevice, DeviceResponse,
    UnavailableDevice,
};
pub use config::AppConfig;
pub use error::PipelineError;
pub use shared::PipelineEvent;
pub use storage::{Checkpoint, CheckpointStore};
pub use vision::{
    normalize, read_orientation, ImageFileSink, Normalizer, OcrConsumer, OrientationTag, PixelBuffer,
    PixelFormat,
};
