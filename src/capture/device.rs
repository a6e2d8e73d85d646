//! Capture device interface
//!
//! The camera (or gallery picker) is an external collaborator. The pipeline
//! only asks it to write a photo to a path and waits for the answer.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Placeholder replaced by the destination path in command arguments
pub const PATH_PLACEHOLDER: &str = "{path}";

/// How often a running capture command is checked for exit
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// What the device reported once its interaction finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceResponse {
    /// A photo was written to the requested path
    Completed,
    /// The user backed out of the capture flow
    Cancelled,
}

/// An external device able to store a photo at a given path
///
/// Implementations must give up and release whatever they started (child
/// processes, camera sessions) once `deadline` passes, so nothing can write
/// the destination after the trigger has reported a timeout.
pub trait CaptureDevice: Send + Sync {
    /// Ask the device to write a photo to `destination` before `deadline`
    fn capture(&self, destination: &Path, deadline: Instant) -> Result<DeviceResponse>;
}

/// Capture device backed by an external command
///
/// Each argument has `{path}` replaced by the destination. Exit status 0 means
/// the photo was taken; `cancel_exit_code` means the user cancelled; anything
/// else is a device failure. A command still running at the deadline is killed.
#[derive(Debug, Clone)]
pub struct CommandDevice {
    program: String,
    args: Vec<String>,
    cancel_exit_code: i32,
}

impl CommandDevice {
    /// Build from an argv list such as `["libcamera-still", "-o", "{path}"]`
    pub fn from_argv(argv: &[String], cancel_exit_code: i32) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("capture device command is empty");
        };

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            cancel_exit_code,
        })
    }

    fn expand_args(&self, destination: &Path) -> Vec<String> {
        let dest = destination.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, &dest))
            .collect()
    }
}

impl CaptureDevice for CommandDevice {
    fn capture(&self, destination: &Path, deadline: Instant) -> Result<DeviceResponse> {
        let args = self.expand_args(destination);
        info!("Starting capture command: {} {:?}", self.program, args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .spawn()
            .with_context(|| format!("Failed to run capture command '{}'", self.program))?;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!("Capture command '{}' still running at deadline, killing", self.program);
                        if let Err(e) = child.kill() {
                            debug!("Kill failed, command may have just exited: {}", e);
                        }
                        // Reap so the process is gone before we report
                        let status = child.wait().context("Failed to reap capture command")?;
                        bail!("capture command '{}' timed out ({})", self.program, status);
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => bail!("Failed to wait for capture command '{}': {}", self.program, e),
            }
        };

        debug!("Capture command exited with {}", status);

        match status.code() {
            Some(0) => Ok(DeviceResponse::Completed),
            Some(code) if code == self.cancel_exit_code => Ok(DeviceResponse::Cancelled),
            _ => bail!("capture command '{}' failed with {}", self.program, status),
        }
    }
}

/// Device for hosts that only resume or normalize existing photos
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDevice;

impl CaptureDevice for UnavailableDevice {
    fn capture(&self, _destination: &Path, _deadline: Instant) -> Result<DeviceResponse> {
        bail!("no capture device configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(10)
    }

    #[test]
    fn test_empty_argv_rejected() {
        assert!(CommandDevice::from_argv(&[], 1).is_err());
    }

    #[test]
    fn test_path_placeholder_expanded() {
        let device = CommandDevice::from_argv(&argv(&["cam", "-o", "{path}", "--out={path}"]), 1).unwrap();
        let args = device.expand_args(Path::new("/data/ocr.jpg"));
        assert_eq!(args, vec!["-o", "/data/ocr.jpg", "--out=/data/ocr.jpg"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_codes_map_to_responses() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("ocr.jpg");

        let writes = CommandDevice::from_argv(&argv(&["sh", "-c", "printf x > \"$0\"", "{path}"]), 1).unwrap();
        assert_eq!(writes.capture(&dest, soon()).unwrap(), DeviceResponse::Completed);
        assert!(dest.exists());

        let cancels = CommandDevice::from_argv(&argv(&["sh", "-c", "exit 1"]), 1).unwrap();
        assert_eq!(cancels.capture(&dest, soon()).unwrap(), DeviceResponse::Cancelled);

        let fails = CommandDevice::from_argv(&argv(&["sh", "-c", "exit 3"]), 1).unwrap();
        assert!(fails.capture(&dest, soon()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_killed_at_deadline_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("ocr.jpg");
        let device =
            CommandDevice::from_argv(&argv(&["sh", "-c", "sleep 1; printf late > \"$0\"", "{path}"]), 1).unwrap();

        let started = Instant::now();
        let result = device.capture(&dest, Instant::now() + Duration::from_millis(100));
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_millis(900));

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!dest.exists(), "killed command must not write the photo");
    }

    #[test]
    fn test_unavailable_device_always_fails() {
        assert!(UnavailableDevice.capture(Path::new("/tmp/unused.jpg"), soon()).is_err());
    }

    #[test]
    fn test_missing_program_is_error() {
        let device = CommandDevice::from_argv(&argv(&["/nonexistent/scope-camera"]), 1).unwrap();
        assert!(device.capture(Path::new("/tmp/unused.jpg"), soon()).is_err());
    }
}
