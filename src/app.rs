//! Scan Pipeline Coordinator
//!
//! Runs capture → orientation → normalization → OCR hand-off as explicit,
//! strictly sequential calls. Hosts drive it directly and adapt the typed
//! results to their own event model.

use anyhow::Result;
use crossbeam_channel::Sender;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::capture::{CaptureDevice, CaptureOutcome, CaptureTrigger, CapturedImage};
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::shared::PipelineEvent;
use crate::storage::{Checkpoint, CheckpointStore};
use crate::vision::{read_orientation, Normalizer, OcrConsumer, OrientationTag, PixelBuffer};

/// Summary of a run that delivered a buffer to the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// The photo that was normalized
    pub image: CapturedImage,
    /// Orientation read from its metadata
    pub orientation: OrientationTag,
    /// Width of the delivered buffer
    pub width: u32,
    /// Height of the delivered buffer
    pub height: u32,
}

/// Terminal outcome of [`ScanPipeline::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// A normalized buffer reached the OCR consumer
    Completed(ScanReport),
    /// The user cancelled the capture; nothing was normalized
    CaptureCancelled,
}

/// Terminal outcome of [`ScanPipeline::resume`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// A pending capture was normalized and delivered
    Completed(ScanReport),
    /// No capture was waiting for normalization
    NothingPending,
}

/// Capture and normalization pipeline
pub struct ScanPipeline {
    trigger: CaptureTrigger,
    normalizer: Normalizer,
    downsample_factor: u32,
    checkpoints: Option<CheckpointStore>,
    events: Option<Sender<PipelineEvent>>,
}

impl ScanPipeline {
    /// Create a pipeline without checkpointing or notifications
    pub fn new(trigger: CaptureTrigger, normalizer: Normalizer, downsample_factor: u32) -> Self {
        Self {
            trigger,
            normalizer,
            downsample_factor,
            checkpoints: None,
            events: None,
        }
    }

    /// Create a pipeline from configuration, with checkpointing enabled
    pub fn from_config(device: Arc<dyn CaptureDevice>, config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let trigger = CaptureTrigger::new(device, config.capture.timeout());
        let normalizer = Normalizer::new(&config.normalize);
        let store = CheckpointStore::new(config.checkpoint_path()?);

        Ok(Self::new(trigger, normalizer, config.normalize.downsample_factor).with_checkpoints(store))
    }

    /// Persist a checkpoint between capture and normalization
    pub fn with_checkpoints(mut self, store: CheckpointStore) -> Self {
        self.checkpoints = Some(store);
        self
    }

    /// Send progress notifications to `sender`
    pub fn with_events(mut self, sender: Sender<PipelineEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Capture a photo at `destination`, normalize it and hand it to `consumer`
    pub fn run(
        &self,
        destination: &Path,
        consumer: &mut dyn OcrConsumer,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.emit(PipelineEvent::CaptureStarted {
            destination: destination.to_path_buf(),
        });

        // The retake replaces whatever photo an earlier checkpoint points at
        self.clear_checkpoint();

        let image = match self.trigger.request_capture(destination) {
            Ok(CaptureOutcome::Captured(image)) => image,
            Ok(CaptureOutcome::Cancelled) => {
                self.emit(PipelineEvent::CaptureCancelled);
                return Ok(PipelineOutcome::CaptureCancelled);
            }
            Err(e) => return Err(self.fail(e)),
        };

        self.emit(PipelineEvent::CaptureCompleted {
            path: image.path().to_path_buf(),
        });

        if let Some(store) = &self.checkpoints {
            store
                .save(&Checkpoint::pending(image.path()))
                .map_err(|e| self.fail(e))?;
        }

        self.process(image, consumer).map(PipelineOutcome::Completed)
    }

    /// Finish a capture recorded in the checkpoint without triggering the device
    pub fn resume(&self, consumer: &mut dyn OcrConsumer) -> Result<ResumeOutcome, PipelineError> {
        let Some(store) = &self.checkpoints else {
            debug!("Resume requested without a checkpoint store");
            return Ok(ResumeOutcome::NothingPending);
        };

        match store.load().map_err(|e| self.fail(e))? {
            Some(checkpoint) if checkpoint.photo_taken => {
                info!("Resuming normalization of {:?}", checkpoint.destination);
                let image = CapturedImage::from_existing(checkpoint.destination);
                self.process(image, consumer).map(ResumeOutcome::Completed)
            }
            _ => Ok(ResumeOutcome::NothingPending),
        }
    }

    /// Orientation → normalize → consumer, then clear the checkpoint
    fn process(
        &self,
        image: CapturedImage,
        consumer: &mut dyn OcrConsumer,
    ) -> Result<ScanReport, PipelineError> {
        let (orientation, buffer) = match self.read_and_normalize(&image) {
            Ok(ok) => ok,
            Err(e) => {
                if e.is_unusable_image() {
                    self.clear_checkpoint();
                }
                return Err(self.fail(e));
            }
        };

        let (width, height) = buffer.dimensions();
        // The consumer owns the buffer from here on
        consumer
            .consume(buffer)
            .map_err(|e| self.fail(PipelineError::Consumer(e)))?;

        self.clear_checkpoint();
        self.emit(PipelineEvent::Normalized {
            path: image.path().to_path_buf(),
            orientation,
            width,
            height,
        });

        Ok(ScanReport {
            image,
            orientation,
            width,
            height,
        })
    }

    fn read_and_normalize(
        &self,
        image: &CapturedImage,
    ) -> Result<(OrientationTag, PixelBuffer), PipelineError> {
        let orientation = read_orientation(image)?;
        let buffer = self
            .normalizer
            .normalize(image, orientation, self.downsample_factor)?;
        Ok((orientation, buffer))
    }

    fn clear_checkpoint(&self) {
        if let Some(store) = &self.checkpoints {
            if let Err(e) = store.clear() {
                warn!("Failed to clear checkpoint: {}", e);
            }
        }
    }

    fn fail(&self, error: PipelineError) -> PipelineError {
        self.emit(PipelineEvent::Failed {
            reason: error.to_string(),
        });
        error
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                debug!("Event receiver dropped");
            }
        }
    }
}
