use std::fs;
use std::path::Path;

use image::DynamicImage;

use crate::imaging::domain::image_reader::ImageReader;
use crate::shared::error::SkinToneError;
use crate::shared::frame::Frame;

/// Decodes any format the `image` crate recognizes, sniffing the format
/// from content rather than the file name. Alpha and 16-bit channels are
/// reduced to 8-bit RGB.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

fn into_frame(img: DynamicImage) -> Result<Frame, SkinToneError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(SkinToneError::ZeroDimensions);
    }
    Ok(Frame::from(img.to_rgb8()))
}

impl ImageReader for ImageFileReader {
    fn read_path(&self, path: &Path) -> Result<Frame, SkinToneError> {
        let bytes = fs::read(path).map_err(|e| SkinToneError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let frame = self.read_bytes(&bytes)?;
        log::debug!(
            "Decoded {} ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );
        Ok(frame)
    }

    fn read_bytes(&self, bytes: &[u8]) -> Result<Frame, SkinToneError> {
        let img = image::load_from_memory(bytes).map_err(SkinToneError::Decode)?;
        into_frame(img)
    }
}
