//! Resumable scan checkpoint
//!
//! Records "capture completed, normalization pending" on disk so a host that
//! was suspended between the two can finish the run without asking the
//! camera again.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PipelineError;

/// Persisted pipeline state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Where the captured photo lives
    pub destination: PathBuf,
    /// Capture finished and the photo still needs normalizing
    pub photo_taken: bool,
}

impl Checkpoint {
    /// Checkpoint for a capture waiting to be normalized
    pub fn pending(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            photo_taken: true,
        }
    }
}

/// JSON file holding at most one checkpoint
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Store backed by `path`; its parent directory must exist
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint, `None` when nothing was saved
    pub fn load(&self) -> Result<Option<Checkpoint>, PipelineError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error(e)),
        };

        let checkpoint = serde_json::from_str(&content).map_err(|e| self.error(e))?;
        Ok(Some(checkpoint))
    }

    /// Save the checkpoint, replacing the previous one atomically
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), PipelineError> {
        let content = serde_json::to_string_pretty(checkpoint).map_err(|e| self.error(e))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content).map_err(|e| self.error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.error(e))?;

        debug!("Saved checkpoint {:?}", checkpoint);
        Ok(())
    }

    /// Forget any saved checkpoint
    pub fn clear(&self) -> Result<(), PipelineError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Cleared checkpoint {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error(e)),
        }
    }

    fn error(&self, err: impl std::fmt::Display) -> PipelineError {
        PipelineError::Checkpoint {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}
