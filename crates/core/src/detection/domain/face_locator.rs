use crate::shared::error::SkinToneError;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

use super::face_detector::FaceDetector;
use super::face_selection::FaceSelection;

/// Finds the single face the rest of the pipeline works on.
///
/// Detector output is clamped to the frame before selection, so the
/// returned box always lies inside the image.
pub struct FaceLocator {
    detector: Box<dyn FaceDetector>,
    selection: FaceSelection,
}

impl FaceLocator {
    pub fn new(detector: Box<dyn FaceDetector>, selection: FaceSelection) -> Self {
        Self {
            detector,
            selection,
        }
    }

    pub fn selection(&self) -> FaceSelection {
        self.selection
    }

    /// Returns `Ok(None)` when no face is found; errors only on unusable input.
    pub fn locate(&self, frame: &Frame) -> Result<Option<FaceBox>, SkinToneError> {
        if frame.is_empty() {
            return Err(SkinToneError::ZeroDimensions);
        }

        let faces: Vec<FaceBox> = self
            .detector
            .detect(frame)?
            .iter()
            .filter_map(|f| f.clamp_to(frame.width(), frame.height()))
            .collect();

        let chosen = self.selection.select(&faces);
        log::debug!(
            "Detected {} face(s), selection '{}' -> {:?}",
            faces.len(),
            self.selection,
            chosen
        );
        Ok(chosen)
    }
}
