//! EXIF orientation reader
//!
//! Missing or broken metadata is common on camera output, so anything short
//! of an unopenable file resolves to [`OrientationTag::Normal`].

use exif::{In, Reader, Tag};
use std::fs::File;
use std::io::BufReader;
use tracing::{debug, warn};

use super::orientation::{is_mirrored_exif, OrientationTag};
use crate::capture::CapturedImage;
use crate::error::PipelineError;

/// Read the orientation tag of a captured photo
///
/// The file is opened read-only and closed before returning.
pub fn read_orientation(image: &CapturedImage) -> Result<OrientationTag, PipelineError> {
    let path = image.path();
    let file = File::open(path).map_err(|source| PipelineError::MetadataRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => {
            debug!("No EXIF data in {:?}, assuming upright", path);
            return Ok(OrientationTag::Normal);
        }
        Err(e) => {
            warn!("Unreadable EXIF data in {:?} ({}), assuming upright", path, e);
            return Ok(OrientationTag::Normal);
        }
    };

    let Some(value) = exif
        .get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
    else {
        debug!("No orientation field in {:?}, assuming upright", path);
        return Ok(OrientationTag::Normal);
    };

    if is_mirrored_exif(value) {
        warn!(
            "Mirrored orientation {} in {:?} is not corrected, treating as normal",
            value, path
        );
    }

    let tag = OrientationTag::from_exif(value);
    debug!("Orient: {} -> rotation {}", value, tag.rotation_degrees());
    Ok(tag)
}
