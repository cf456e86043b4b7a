use std::fs;
use std::path::Path;

use image::error::{ParameterError, ParameterErrorKind};

use crate::imaging::domain::image_writer::ImageWriter;
use crate::shared::error::SkinToneError;
use crate::shared::frame::Frame;

/// Writes a frame using the `image` crate, creating parent directories.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), SkinToneError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SkinToneError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let write_err = |source: image::ImageError| SkinToneError::Write {
            path: path.to_path_buf(),
            source,
        };
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(|| {
                write_err(image::ImageError::Parameter(ParameterError::from_kind(
                    ParameterErrorKind::DimensionMismatch,
                )))
            })?;
        img.save(path).map_err(write_err)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}
