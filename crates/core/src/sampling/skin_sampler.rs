use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Horizontal cheek band as fractions of face width.
const CHEEK_X: (f64, f64) = (0.25, 0.75);

/// Vertical cheek band as fractions of face height: below the eyes,
/// above the mouth.
const CHEEK_Y: (f64, f64) = (0.20, 0.60);

/// Pixels cropped for color estimation, and where they came from.
#[derive(Clone, Debug, PartialEq)]
pub struct SkinSample {
    /// `None` only for a zero-area frame.
    pub region: Option<FaceBox>,
    pub pixels: Frame,
}

/// Picks the pixels the color estimate is computed from.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkinSampler;

impl SkinSampler {
    pub fn new() -> Self {
        Self
    }

    /// The rectangle that `sample` would crop.
    ///
    /// With a face: the cheek band of the face box (clamped to the frame).
    /// Without one: the central half of the image in each dimension.
    /// Returns `None` only for a zero-area frame.
    pub fn sample_region(&self, frame: &Frame, face: Option<&FaceBox>) -> Option<FaceBox> {
        if frame.is_empty() {
            return None;
        }
        let whole = FaceBox::new(0, 0, frame.width(), frame.height());

        let clamped_face = face.and_then(|f| f.clamp_to(frame.width(), frame.height()));
        Some(match clamped_face {
            Some(f) => f.fraction(CHEEK_X.0, CHEEK_X.1, CHEEK_Y.0, CHEEK_Y.1),
            None => {
                if face.is_some() {
                    log::warn!("Face box {face:?} lies outside the image, sampling image center");
                }
                center_region(&whole)
            }
        })
    }

    /// Crops the skin sample out of the frame. The pixels are empty only
    /// for a zero-area frame.
    pub fn sample(&self, frame: &Frame, face: Option<&FaceBox>) -> SkinSample {
        let region = self.sample_region(frame, face);
        let pixels = match region {
            Some(r) => frame.crop(r.x, r.y, r.width, r.height),
            None => Frame::new(Vec::new(), 0, 0),
        };
        SkinSample { region, pixels }
    }
}

/// `[W/4, W/4 + W/2) × [H/4, H/4 + H/2)` with integer division, widened to
/// one pixel for tiny images.
fn center_region(whole: &FaceBox) -> FaceBox {
    let span = |extent: u32| -> (u32, u32) {
        let start = extent / 4;
        let len = (extent / 2).max(1).min(extent - start);
        (start, len)
    };
    let (x, w) = span(whole.width);
    let (y, h) = span(whole.height);
    FaceBox::new(x, y, w, h)
}
