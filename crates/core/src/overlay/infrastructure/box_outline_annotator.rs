use crate::overlay::domain::frame_annotator::FrameAnnotator;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::{Frame, CHANNELS};

const DEFAULT_COLOR: [u8; 3] = [0, 255, 0];
const DEFAULT_THICKNESS: u32 = 3;

/// Strokes a solid rectangle outline just inside each box's edges.
pub struct BoxOutlineAnnotator {
    color: [u8; 3],
    thickness: u32,
}

impl BoxOutlineAnnotator {
    pub fn new(color: [u8; 3], thickness: u32) -> Self {
        Self {
            color,
            thickness: thickness.max(1),
        }
    }
}

impl Default for BoxOutlineAnnotator {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR, DEFAULT_THICKNESS)
    }
}

impl FrameAnnotator for BoxOutlineAnnotator {
    fn annotate(&self, frame: &mut Frame, boxes: &[FaceBox]) {
        let fw = frame.width() as usize;
        let (frame_w, frame_h) = (frame.width(), frame.height());
        let data = frame.data_mut();

        for b in boxes {
            let Some(r) = b.clamp_to(frame_w, frame_h) else {
                continue;
            };
            let t_x = self.thickness.min(r.width);
            let t_y = self.thickness.min(r.height);

            for y in r.y..r.bottom() {
                let on_h_edge = y < r.y + t_y || y >= r.bottom() - t_y;
                for x in r.x..r.right() {
                    let on_v_edge = x < r.x + t_x || x >= r.right() - t_x;
                    if on_h_edge || on_v_edge {
                        let idx = (y as usize * fw + x as usize) * CHANNELS;
                        data[idx..idx + CHANNELS].copy_from_slice(&self.color);
                    }
                }
            }
        }
    }
}
