//! Fixtures shared by unit tests

use anyhow::{bail, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::capture::{CaptureDevice, DeviceResponse};

/// Behaviour of a [`ScriptedDevice`]
#[derive(Debug, Clone)]
pub enum Script {
    WriteBytes(Vec<u8>),
    Cancel,
    Fail(String),
    Hang(Duration),
    WriteLate(Duration, Vec<u8>),
    CompleteWithoutFile,
}

/// Capture device double that follows a fixed script
#[derive(Debug, Clone)]
pub struct ScriptedDevice {
    script: Script,
}

impl ScriptedDevice {
    pub fn writes(bytes: Vec<u8>) -> Self {
        Self { script: Script::WriteBytes(bytes) }
    }

    pub fn cancels() -> Self {
        Self { script: Script::Cancel }
    }

    pub fn fails(reason: &str) -> Self {
        Self { script: Script::Fail(reason.to_string()) }
    }

    pub fn hangs(duration: Duration) -> Self {
        Self { script: Script::Hang(duration) }
    }

    /// Ignores the deadline and writes the photo after `delay`
    pub fn writes_late(delay: Duration, bytes: Vec<u8>) -> Self {
        Self { script: Script::WriteLate(delay, bytes) }
    }

    pub fn completes_without_file() -> Self {
        Self { script: Script::CompleteWithoutFile }
    }
}

impl CaptureDevice for ScriptedDevice {
    fn capture(&self, destination: &Path, _deadline: Instant) -> Result<DeviceResponse> {
        match &self.script {
            Script::WriteBytes(bytes) => {
                std::fs::write(destination, bytes)?;
                Ok(DeviceResponse::Completed)
            }
            Script::Cancel => Ok(DeviceResponse::Cancelled),
            Script::Fail(reason) => bail!("{}", reason),
            Script::Hang(duration) => {
                std::thread::sleep(*duration);
                Ok(DeviceResponse::Cancelled)
            }
            Script::WriteLate(delay, bytes) => {
                std::thread::sleep(*delay);
                std::fs::write(destination, bytes)?;
                Ok(DeviceResponse::Completed)
            }
            Script::CompleteWithoutFile => Ok(DeviceResponse::Completed),
        }
    }
}

/// RGB image whose every pixel is distinct
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * 7 + y * 13) % 256) as u8])
    })
}

/// RGBA image with a translucent alpha channel
pub fn translucent_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 200, 64]))
}

/// Encode a JPEG, optionally carrying an EXIF orientation tag
pub fn jpeg_bytes(width: u32, height: u32, orientation: Option<u16>) -> Vec<u8> {
    let mut encoded = Vec::new();
    DynamicImage::ImageRgb8(gradient_rgb(width, height))
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
        .unwrap();

    match orientation {
        Some(value) => splice_exif(&encoded, value),
        None => encoded,
    }
}

/// Encode any image as PNG (lossless, no EXIF)
pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut encoded = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
        .unwrap();
    encoded
}

/// Insert an APP1 EXIF segment right after the JPEG SOI marker
fn splice_exif(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG stream");

    // Little-endian TIFF header followed by IFD0 with a single Orientation entry
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&orientation.to_le_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_le_bytes());

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);

    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}
