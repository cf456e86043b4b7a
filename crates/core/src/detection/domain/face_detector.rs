use crate::shared::error::SkinToneError;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Detectors are stateless per call, so one instance can serve many
/// requests across threads. Boxes come back in detector scan order.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<FaceBox>, SkinToneError>;
}
