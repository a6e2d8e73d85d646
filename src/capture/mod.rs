//! Capture Layer
//!
//! Asks an injected capture device for a photo and waits, with a bounded
//! timeout, for it to report completion or cancellation.

pub mod device;
pub mod frame;

pub use device::{CaptureDevice, CommandDevice, DeviceResponse, UnavailableDevice};
pub use frame::CapturedImage;

use crossbeam_channel::RecvTimeoutError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::PipelineError;

/// Extra time a timed-out device gets to stop its own work
const RELEASE_GRACE: Duration = Duration::from_millis(500);

/// Result of a single capture request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The device wrote a photo to the destination
    Captured(CapturedImage),
    /// The user cancelled; nothing to normalize
    Cancelled,
}

/// Issues one capture request per call to an external device
pub struct CaptureTrigger {
    device: Arc<dyn CaptureDevice>,
    timeout: Duration,
}

impl CaptureTrigger {
    /// Create a trigger that waits at most `timeout` for the device
    pub fn new(device: Arc<dyn CaptureDevice>, timeout: Duration) -> Self {
        Self { device, timeout }
    }

    /// Maximum time spent waiting for the device
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Request a photo at `destination`, overwriting whatever is there
    ///
    /// The device runs on a worker thread and is handed the deadline. If it
    /// does not answer in time, the trigger waits a short grace period for
    /// the device to stop, removes anything written at `destination` and
    /// returns `CaptureTimeout`.
    pub fn request_capture(&self, destination: &Path) -> Result<CaptureOutcome, PipelineError> {
        clear_destination(destination)?;

        let (tx, rx) = crossbeam_channel::bounded(1);
        let device = Arc::clone(&self.device);
        let dest = destination.to_path_buf();
        let deadline = Instant::now() + self.timeout;

        std::thread::Builder::new()
            .name("capture-device".to_string())
            .spawn(move || {
                let response = device.capture(&dest, deadline);
                if tx.send(response).is_err() {
                    debug!("Capture answer arrived after the trigger stopped waiting");
                }
            })
            .map_err(|e| PipelineError::CaptureFailed(format!("could not start device worker: {}", e)))?;

        info!("Waiting up to {:?} for capture device", self.timeout);

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(DeviceResponse::Completed)) => {
                if !destination.is_file() {
                    return Err(PipelineError::CaptureFailed(format!(
                        "device reported success but {} does not exist",
                        destination.display()
                    )));
                }
                info!("Photo captured at {:?}", destination);
                Ok(CaptureOutcome::Captured(CapturedImage::new(destination)))
            }
            Ok(Ok(DeviceResponse::Cancelled)) => {
                info!("User cancelled capture");
                Ok(CaptureOutcome::Cancelled)
            }
            Ok(Err(e)) => Err(PipelineError::CaptureFailed(format!("{:#}", e))),
            Err(RecvTimeoutError::Timeout) => {
                warn!("Capture device unresponsive after {:?}", self.timeout);
                if rx.recv_timeout(RELEASE_GRACE).is_err() {
                    warn!("Capture device still busy {:?} past its deadline", RELEASE_GRACE);
                }
                if let Err(e) = clear_destination(destination) {
                    warn!("{}", e);
                }
                Err(PipelineError::CaptureTimeout {
                    waited: self.timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::CaptureFailed(
                "device worker exited without an answer".to_string(),
            )),
        }
    }
}

/// Remove a stale photo so a cancelled run cannot leave an old file looking fresh
fn clear_destination(destination: &Path) -> Result<(), PipelineError> {
    match std::fs::remove_file(destination) {
        Ok(()) => {
            debug!("Removed previous capture at {:?}", destination);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::CaptureFailed(format!(
            "could not overwrite {}: {}",
            destination.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{jpeg_bytes, ScriptedDevice};
    use tempfile::tempdir;

    fn trigger(device: ScriptedDevice, timeout: Duration) -> CaptureTrigger {
        CaptureTrigger::new(Arc::new(device), timeout)
    }

    #[test]
    fn test_capture_success_returns_image() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("ocr.jpg");
        let trigger = trigger(ScriptedDevice::writes(jpeg_bytes(8, 6, None)), Duration::from_secs(5));

        match trigger.request_capture(&dest).unwrap() {
            CaptureOutcome::Captured(image) => assert_eq!(image.path(), dest.as_path()),
            other => panic!("expected capture, got {:?}", other),
        }
        assert!(dest.is_file());
    }

    #[test]
    fn test_capture_cancelled_is_not_error() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("ocr.jpg");
        let trigger = trigger(ScriptedDevice::cancels(), Duration::from_secs(5));

        assert_eq!(trigger.request_capture(&dest).unwrap(), CaptureOutcome::Cancelled);
        assert!(!dest.exists());
    }

    #[test]
    fn test_capture_overwrites_previous_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("ocr.jpg");
        std::fs::write(&dest, b"old photo").unwrap();

        let trigger = trigger(ScriptedDevice::cancels(), Duration::from_secs(5));
        trigger.request_capture(&dest).unwrap();
        assert!(!dest.exists(), "stale capture must not survive a cancelled run");
    }

    #[test]
    fn test_unresponsive_device_times_out() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("ocr.jpg");
        let trigger = trigger(
            ScriptedDevice::hangs(Duration::from_secs(2)),
            Duration::from_millis(50),
        );

        match trigger.request_capture(&dest) {
            Err(PipelineError::CaptureTimeout { waited }) => {
                assert_eq!(waited, Duration::from_millis(50))
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_late_write_is_removed_after_timeout() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("ocr.jpg");
        let trigger = trigger(
            ScriptedDevice::writes_late(Duration::from_millis(150), jpeg_bytes(8, 6, None)),
            Duration::from_millis(50),
        );

        assert!(matches!(
            trigger.request_capture(&dest),
            Err(PipelineError::CaptureTimeout { .. })
        ));
        assert!(!dest.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_timed_out_command_never_writes_photo() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("ocr.jpg");
        let argv: Vec<String> = ["sh", "-c", "sleep 1; printf late > \"$0\"", "{path}"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let device = CommandDevice::from_argv(&argv, 1).unwrap();
        let trigger = CaptureTrigger::new(Arc::new(device), Duration::from_millis(100));

        assert!(matches!(
            trigger.request_capture(&dest),
            Err(PipelineError::CaptureTimeout { .. })
        ));
        std::thread::sleep(Duration::from_millis(1500));
        assert!(!dest.exists());
    }

    #[test]
    fn test_device_error_is_capture_failure() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("ocr.jpg");
        let trigger = trigger(ScriptedDevice::fails("camera busy"), Duration::from_secs(5));

        match trigger.request_capture(&dest) {
            Err(PipelineError::CaptureFailed(msg)) => assert!(msg.contains("camera busy")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_success_without_file_is_capture_failure() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("ocr.jpg");
        let trigger = trigger(ScriptedDevice::completes_without_file(), Duration::from_secs(5));

        assert!(matches!(
            trigger.request_capture(&dest),
            Err(PipelineError::CaptureFailed(_))
        ));
    }
}
