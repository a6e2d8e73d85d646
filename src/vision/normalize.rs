//! Orientation normalizer
//!
//! Decode → downsample → rotate upright → canonical RGBA, as one call.
//! Baseline JPEGs are subsampled inside the decoder so the full-resolution
//! frame is never allocated; other formats are resized after decoding.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader, RgbImage};
use jpeg_decoder::PixelFormat as JpegPixelFormat;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

use super::buffer::PixelBuffer;
use super::orientation::OrientationTag;
use crate::capture::CapturedImage;
use crate::config::NormalizeSettings;
use crate::error::PipelineError;

/// Decodes captured photos into upright canonical buffers
#[derive(Debug, Clone)]
pub struct Normalizer {
    max_decoded_pixels: u64,
    filter: FilterType,
    brightness: i32,
    contrast: f32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizeSettings::default())
    }
}

impl Normalizer {
    /// Create a normalizer from configuration
    pub fn new(settings: &NormalizeSettings) -> Self {
        Self {
            max_decoded_pixels: settings.max_decoded_pixels,
            filter: settings.resample_filter.into(),
            brightness: settings.brightness,
            contrast: settings.contrast,
        }
    }

    /// Produce the upright, canonical buffer for a captured photo
    ///
    /// On failure no buffer is returned; the decode allocation is dropped
    /// with the error.
    pub fn normalize(
        &self,
        image: &CapturedImage,
        tag: OrientationTag,
        downsample_factor: u32,
    ) -> Result<PixelBuffer, PipelineError> {
        let raw = self.decode(image.path(), downsample_factor)?;
        let (raw_width, raw_height) = raw.dimensions();

        debug!("Rotation: {}", tag.rotation_degrees());
        let buffer = PixelBuffer::from_dynamic(raw)
            .rotated(tag)
            .adjusted(self.brightness, self.contrast);

        info!(
            "Normalized {:?}: {}x{} -> {}x{} ({}°)",
            image.path(),
            raw_width,
            raw_height,
            buffer.width(),
            buffer.height(),
            tag.rotation_degrees()
        );

        Ok(buffer)
    }

    /// Decode the file into a raw image, subsampled by `downsample_factor`
    ///
    /// The result keeps the decoder's native pixel format and orientation.
    pub fn decode(&self, path: &Path, downsample_factor: u32) -> Result<DynamicImage, PipelineError> {
        if downsample_factor == 0 {
            return Err(PipelineError::InvalidDownsample(downsample_factor));
        }

        let reader = open_reader(path)?;
        if reader.format() == Some(ImageFormat::Jpeg) && downsample_factor > 1 {
            if let Some(image) = self.decode_jpeg_scaled(path, downsample_factor)? {
                return Ok(image);
            }
        }

        let (width, height) = reader.into_dimensions().map_err(|e| decode_error(path, e))?;
        self.validate_pixel_limit(path, width, height)?;

        let decoded = open_reader(path)?
            .decode()
            .map_err(|e| decode_error(path, e))?;

        debug!(
            "Decoded {:?}: {}x{} {:?}",
            path,
            decoded.width(),
            decoded.height(),
            decoded.color()
        );

        Ok(downsample(decoded, downsample_factor, self.filter))
    }

    /// Decode a JPEG with DCT scaling, then trim to the exact target size
    ///
    /// Returns `None` for pixel layouts the scaled path does not handle
    /// (CMYK, 16-bit), which then go through the generic decoder.
    fn decode_jpeg_scaled(&self, path: &Path, factor: u32) -> Result<Option<DynamicImage>, PipelineError> {
        let file = File::open(path).map_err(|e| decode_error(path, e))?;
        let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));
        decoder.read_info().map_err(|e| decode_error(path, e))?;
        let info = decoder
            .info()
            .ok_or_else(|| decode_error(path, "missing JPEG frame header"))?;

        if !matches!(info.pixel_format, JpegPixelFormat::L8 | JpegPixelFormat::RGB24) {
            debug!("JPEG {:?} is {:?}, using the generic decoder", path, info.pixel_format);
            return Ok(None);
        }

        let (target_width, target_height) =
            downsampled_dimensions(u32::from(info.width), u32::from(info.height), factor);
        let (width, height) = decoder
            .scale(to_u16(target_width), to_u16(target_height))
            .map_err(|e| decode_error(path, e))?;
        let (width, height) = (u32::from(width), u32::from(height));
        self.validate_pixel_limit(path, width, height)?;

        let pixels = decoder.decode().map_err(|e| decode_error(path, e))?;
        let decoded = match info.pixel_format {
            JpegPixelFormat::L8 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
            _ => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        }
        .ok_or_else(|| decode_error(path, "decoded JPEG data does not match its header"))?;

        debug!(
            "Decoded {:?} scaled: {}x{} -> {}x{}",
            path, info.width, info.height, width, height
        );

        if (width, height) == (target_width, target_height) {
            return Ok(Some(decoded));
        }
        Ok(Some(decoded.resize_exact(target_width, target_height, self.filter)))
    }

    fn validate_pixel_limit(&self, path: &Path, width: u32, height: u32) -> Result<(), PipelineError> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_decoded_pixels {
            return Err(PipelineError::ResourceLimit {
                path: path.to_path_buf(),
                pixels,
                limit: self.max_decoded_pixels,
            });
        }
        Ok(())
    }
}

/// Normalize with default decode limits
pub fn normalize(
    image: &CapturedImage,
    tag: OrientationTag,
    downsample_factor: u32,
) -> Result<PixelBuffer, PipelineError> {
    Normalizer::default().normalize(image, tag, downsample_factor)
}

/// Target size for a subsampling factor: ceil(dimension / factor), at least 1
pub fn downsampled_dimensions(width: u32, height: u32, factor: u32) -> (u32, u32) {
    let factor = factor.max(1);
    (width.div_ceil(factor).max(1), height.div_ceil(factor).max(1))
}

fn downsample(image: DynamicImage, factor: u32, filter: FilterType) -> DynamicImage {
    if factor <= 1 {
        return image;
    }

    let (width, height) = image.dimensions();
    let (target_width, target_height) = downsampled_dimensions(width, height, factor);
    debug!(
        "Downsampling by {}: {}x{} -> {}x{}",
        factor, width, height, target_width, target_height
    );
    image.resize_exact(target_width, target_height, filter)
}

fn to_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

fn open_reader(path: &Path) -> Result<ImageReader<BufReader<File>>, PipelineError> {
    ImageReader::open(path)
        .map_err(|e| decode_error(path, e))?
        .with_guessed_format()
        .map_err(|e| decode_error(path, e))
}

fn decode_error(path: &Path, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Decode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
