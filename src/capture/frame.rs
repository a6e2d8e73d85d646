//! Handle for a photo written by the capture device

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A captured photo on durable storage
///
/// Read-only once created: the pipeline never writes to the file it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Location of the image file
    path: PathBuf,
    /// When the device reported completion (or when the handle was rebuilt)
    captured_at: SystemTime,
}

impl CapturedImage {
    /// Create a handle for a file the device just finished writing
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            captured_at: SystemTime::now(),
        }
    }

    /// Rebuild a handle for a file captured earlier, e.g. when resuming
    ///
    /// Uses the file's modification time when it can be read.
    pub fn from_existing(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let captured_at = std::fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .unwrap_or_else(|_| SystemTime::now());
        Self { path, captured_at }
    }

    /// Path of the image file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capture timestamp
    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }
}
