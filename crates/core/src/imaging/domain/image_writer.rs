use std::path::Path;

use crate::shared::error::SkinToneError;
use crate::shared::frame::Frame;

/// Writes a single frame to an image file.
pub trait ImageWriter: Send + Sync {
    /// Output format follows the path's extension.
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), SkinToneError>;
}
