//! Orientation tags and the rotation each one implies

use std::fmt;

/// Orientation of a photo as recorded by the device
///
/// Only the four pure rotations are modelled. Mirrored EXIF orientations
/// fall back to `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrientationTag {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl OrientationTag {
    /// All tags, in clockwise order
    pub const ALL: [OrientationTag; 4] = [
        OrientationTag::Normal,
        OrientationTag::Rotate90,
        OrientationTag::Rotate180,
        OrientationTag::Rotate270,
    ];

    /// Map a raw EXIF orientation value (1..=8) to a tag
    pub fn from_exif(value: u32) -> Self {
        match value {
            6 => OrientationTag::Rotate90,
            3 => OrientationTag::Rotate180,
            8 => OrientationTag::Rotate270,
            _ => OrientationTag::Normal,
        }
    }

    /// Clockwise rotation, in degrees, that turns the stored image upright
    pub fn rotation_degrees(self) -> u32 {
        match self {
            OrientationTag::Normal => 0,
            OrientationTag::Rotate90 => 90,
            OrientationTag::Rotate180 => 180,
            OrientationTag::Rotate270 => 270,
        }
    }

    /// Whether applying this rotation exchanges width and height
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, OrientationTag::Rotate90 | OrientationTag::Rotate270)
    }
}

impl fmt::Display for OrientationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrientationTag::Normal => "normal",
            OrientationTag::Rotate90 => "rotate_90",
            OrientationTag::Rotate180 => "rotate_180",
            OrientationTag::Rotate270 => "rotate_270",
        };
        f.write_str(name)
    }
}

/// Whether an EXIF orientation value describes a mirrored image
pub fn is_mirrored_exif(value: u32) -> bool {
    matches!(value, 2 | 4 | 5 | 7)
}
