//! Normalized pixel buffer handed to the OCR consumer

use image::{imageops, DynamicImage, RgbaImage};

use super::orientation::OrientationTag;

/// Pixel layout of a normalized buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, bytes ordered R, G, B, A, alpha always 255
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Upright image in the canonical pixel format
///
/// Row-major, tightly packed. The only way to build one is from a decoded
/// image, which forces the alpha channel opaque, so every instance satisfies
/// the format contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Convert a decoded image of any native format to canonical RGBA
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::from_rgba(image.into_rgba8())
    }

    /// Wrap an RGBA image, discarding any transparency
    pub fn from_rgba(mut image: RgbaImage) -> Self {
        for pixel in image.pixels_mut() {
            pixel.0[3] = u8::MAX;
        }
        Self { image }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Get buffer dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn format(&self) -> PixelFormat {
        PixelFormat::Rgba8
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width() as usize * self.format().bytes_per_pixel()
    }

    /// Raw pixel bytes
    pub fn data(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Take ownership of the raw pixel bytes
    pub fn into_data(self) -> Vec<u8> {
        self.image.into_raw()
    }

    /// Borrow as an `image` buffer, e.g. for encoding
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// RGBA value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Whether every pixel has full alpha
    pub fn is_opaque(&self) -> bool {
        self.image.pixels().all(|p| p.0[3] == u8::MAX)
    }

    /// Rotate clockwise by the tag's angle, consuming the buffer
    pub fn rotated(self, tag: OrientationTag) -> Self {
        let image = match tag {
            OrientationTag::Normal => self.image,
            OrientationTag::Rotate90 => imageops::rotate90(&self.image),
            OrientationTag::Rotate180 => imageops::rotate180(&self.image),
            OrientationTag::Rotate270 => imageops::rotate270(&self.image),
        };
        Self { image }
    }

    /// Apply a brightness offset and a contrast change (percent) for OCR
    ///
    /// Alpha stays opaque; zero values return the buffer unchanged.
    pub fn adjusted(self, brightness: i32, contrast: f32) -> Self {
        let mut image = self.image;
        if brightness != 0 {
            image = imageops::brighten(&image, brightness);
        }
        if contrast != 0.0 {
            image = imageops::contrast(&image, contrast);
        }
        Self::from_rgba(image)
    }
}
