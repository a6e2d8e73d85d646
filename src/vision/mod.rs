//! Vision Layer
//!
//! Turns a captured photo into OCR-ready pixels: reads the EXIF orientation,
//! decodes, rotates upright and converts to a single canonical pixel format.

pub mod buffer;
pub mod metadata;
pub mod normalize;
pub mod ocr;
pub mod orientation;

pub use buffer::{PixelBuffer, PixelFormat};
pub use metadata::read_orientation;
pub use normalize::{normalize, Normalizer};
pub use ocr::{ImageFileSink, OcrConsumer};
pub use orientation::OrientationTag;
