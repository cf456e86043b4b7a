use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Draws face boxes onto a frame in place.
pub trait FrameAnnotator: Send + Sync {
    fn annotate(&self, frame: &mut Frame, boxes: &[FaceBox]);
}
