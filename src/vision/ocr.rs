//! OCR consumer interface
//!
//! The OCR engine is external. The pipeline hands it each normalized buffer
//! by value and forgets about it.

use anyhow::{Context, Result};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::info;

use super::buffer::PixelBuffer;

/// Receiver of normalized buffers
pub trait OcrConsumer {
    /// Take ownership of a normalized buffer
    fn consume(&mut self, buffer: PixelBuffer) -> Result<()>;
}

impl<F> OcrConsumer for F
where
    F: FnMut(PixelBuffer) -> Result<()>,
{
    fn consume(&mut self, buffer: PixelBuffer) -> Result<()> {
        self(buffer)
    }
}

/// Consumer that writes each buffer as a PNG for an external OCR tool
#[derive(Debug, Clone)]
pub struct ImageFileSink {
    path: PathBuf,
}

impl ImageFileSink {
    /// Create a sink writing to `path` (overwritten on every buffer)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OcrConsumer for ImageFileSink {
    fn consume(&mut self, buffer: PixelBuffer) -> Result<()> {
        buffer
            .as_image()
            .save_with_format(&self.path, ImageFormat::Png)
            .with_context(|| format!("Failed to write OCR input {:?}", self.path))?;

        info!(
            "Wrote {}x{} OCR input to {:?}",
            buffer.width(),
            buffer.height(),
            self.path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::gradient_rgb;
    use image::{DynamicImage, GenericImageView};
    use tempfile::tempdir;

    #[test]
    fn test_file_sink_writes_png() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("ocr.png");
        let buffer = PixelBuffer::from_dynamic(DynamicImage::ImageRgb8(gradient_rgb(8, 5)));
        let expected = buffer.clone();

        let mut sink = ImageFileSink::new(&out);
        sink.consume(buffer).unwrap();

        let written = image::open(&out).unwrap();
        assert_eq!(written.dimensions(), (8, 5));
        assert_eq!(written.to_rgba8().as_raw(), expected.data());
    }

    #[test]
    fn test_file_sink_reports_unwritable_path() {
        let buffer = PixelBuffer::from_dynamic(DynamicImage::ImageRgb8(gradient_rgb(2, 2)));
        let mut sink = ImageFileSink::new("/nonexistent/dir/ocr.png");
        assert!(sink.consume(buffer).is_err());
    }

    #[test]
    fn test_closure_consumer() {
        let mut seen = Vec::new();
        let mut consumer = |buffer: PixelBuffer| -> Result<()> {
            seen.push(buffer.dimensions());
            Ok(())
        };
        let buffer = PixelBuffer::from_dynamic(DynamicImage::ImageRgb8(gradient_rgb(3, 2)));
        consumer.consume(buffer).unwrap();
        assert_eq!(seen, vec![(3, 2)]);
    }
}
