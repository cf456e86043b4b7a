use std::path::Path;

use crate::shared::error::SkinToneError;
use crate::shared::frame::Frame;

/// Decodes an encoded still image into an RGB frame.
pub trait ImageReader: Send + Sync {
    fn read_path(&self, path: &Path) -> Result<Frame, SkinToneError>;

    fn read_bytes(&self, bytes: &[u8]) -> Result<Frame, SkinToneError>;
}
