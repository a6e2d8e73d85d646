//! Application Configuration
//!
//! Pipeline settings stored in TOML format.

use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage;

/// File name used when no capture destination is configured
pub const DEFAULT_CAPTURE_FILE: &str = "ocr.jpg";
/// File name used when no checkpoint path is configured
pub const DEFAULT_CHECKPOINT_FILE: &str = "checkpoint.json";

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture settings
    pub capture: CaptureSettings,
    /// Decode and normalization settings
    pub normalize: NormalizeSettings,
    /// Checkpoint storage settings
    pub storage: StorageSettings,
}

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Where the device writes the photo; defaults to `<data dir>/ocr.jpg`
    pub destination: Option<PathBuf>,
    /// Maximum wait for the device, in seconds
    pub timeout_secs: u64,
    /// External capture command, `{path}` is replaced by the destination
    pub device_command: Vec<String>,
    /// Exit code the capture command uses to signal user cancellation
    pub cancel_exit_code: i32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            destination: None,
            timeout_secs: 120,
            device_command: Vec::new(),
            cancel_exit_code: 1,
        }
    }
}

impl CaptureSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Resampling filter used when downsampling at decode time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    /// Pick the nearest source pixel (fastest)
    #[default]
    Nearest,
    /// Linear filter
    Triangle,
    /// Cubic filter
    CatmullRom,
    /// Lanczos with window 3 (sharpest, slowest)
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Decode and normalization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSettings {
    /// Linear subsampling factor applied at decode time (1 = full resolution)
    pub downsample_factor: u32,
    /// Largest image, in pixels, the decoder will accept
    pub max_decoded_pixels: u64,
    /// Filter used when downsampling
    pub resample_filter: ResampleFilter,
    /// Brightness offset added to each colour channel before OCR, -255..=255
    pub brightness: i32,
    /// Contrast adjustment in percent; 0 leaves the image untouched
    pub contrast: f32,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            downsample_factor: 4,
            max_decoded_pixels: 50_000_000,
            resample_filter: ResampleFilter::Nearest,
            brightness: 0,
            contrast: 0.0,
        }
    }
}

/// Checkpoint storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Checkpoint file; defaults to `<data dir>/checkpoint.json`
    pub checkpoint_path: Option<PathBuf>,
}

impl AppConfig {
    /// Check values that would make the pipeline misbehave
    pub fn validate(&self) -> Result<()> {
        if self.normalize.downsample_factor == 0 {
            bail!("normalize.downsample_factor must be at least 1");
        }
        if self.normalize.max_decoded_pixels == 0 {
            bail!("normalize.max_decoded_pixels must be greater than 0");
        }
        if !(-255..=255).contains(&self.normalize.brightness) {
            bail!("normalize.brightness must be between -255 and 255");
        }
        if !self.normalize.contrast.is_finite() {
            bail!("normalize.contrast must be a finite number");
        }
        if self.capture.timeout_secs == 0 {
            bail!("capture.timeout_secs must be greater than 0");
        }
        if self.capture.cancel_exit_code == 0 {
            bail!("capture.cancel_exit_code cannot be 0, that is the success code");
        }
        Ok(())
    }

    /// Resolved capture destination
    pub fn destination_path(&self) -> Result<PathBuf> {
        match &self.capture.destination {
            Some(path) => Ok(path.clone()),
            None => Ok(storage::get_data_dir()?.join(DEFAULT_CAPTURE_FILE)),
        }
    }

    /// Resolved checkpoint file path
    pub fn checkpoint_path(&self) -> Result<PathBuf> {
        match &self.storage.checkpoint_path {
            Some(path) => Ok(path.clone()),
            None => Ok(storage::get_data_dir()?.join(DEFAULT_CHECKPOINT_FILE)),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Invalid config {:?}", path))?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
