use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box of a detected face, in pixel coordinates.
///
/// Boxes leaving the face locator are clamped to the image, so
/// `x + width <= image width` and `y + height <= image height` hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Clips the box to a `frame_w` × `frame_h` image.
    ///
    /// Returns `None` when nothing of the box remains inside the image.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<FaceBox> {
        let x1 = self.right().min(frame_w);
        let y1 = self.bottom().min(frame_h);
        if self.x >= x1 || self.y >= y1 {
            return None;
        }
        Some(FaceBox::new(self.x, self.y, x1 - self.x, y1 - self.y))
    }

    /// Sub-rectangle spanning the given fractions of this box.
    ///
    /// Fractions are floored to whole pixels, relative to the box origin. The
    /// result keeps at least one pixel in each dimension when the box itself
    /// is non-empty.
    pub fn fraction(&self, x_from: f64, x_to: f64, y_from: f64, y_to: f64) -> FaceBox {
        let (x0, x1) = fraction_span(self.width, x_from, x_to);
        let (y0, y1) = fraction_span(self.height, y_from, y_to);
        FaceBox::new(self.x + x0, self.y + y0, x1 - x0, y1 - y0)
    }
}

fn fraction_span(extent: u32, from: f64, to: f64) -> (u32, u32) {
    if extent == 0 {
        return (0, 0);
    }
    let start = ((extent as f64 * from).floor() as u32).min(extent - 1);
    let end = ((extent as f64 * to).floor() as u32).clamp(start + 1, extent);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Clamping ─────────────────────────────────────────────────────

    #[test]
    fn test_clamp_inside_is_identity() {
        let b = FaceBox::new(10, 10, 20, 20);
        assert_eq!(b.clamp_to(100, 100), Some(b));
    }

    #[test]
    fn test_clamp_trims_overhang() {
        let b = FaceBox::new(90, 80, 20, 40);
        assert_eq!(b.clamp_to(100, 100), Some(FaceBox::new(90, 80, 10, 20)));
    }

    #[test]
    fn test_clamp_outside_is_none() {
        assert_eq!(FaceBox::new(120, 0, 10, 10).clamp_to(100, 100), None);
        assert_eq!(FaceBox::new(0, 0, 0, 10).clamp_to(100, 100), None);
    }

    // ── Fractions ────────────────────────────────────────────────────

    #[test]
    fn test_fraction_cheek_band() {
        let face = FaceBox::new(100, 50, 200, 100);
        let band = face.fraction(0.25, 0.75, 0.2, 0.6);
        assert_eq!(band, FaceBox::new(150, 70, 100, 40));
    }

    #[test]
    fn test_fraction_floors_like_integer_slicing() {
        // w=7: 7*0.25=1.75 -> 1, 7*0.75=5.25 -> 5
        let face = FaceBox::new(0, 0, 7, 7);
        let band = face.fraction(0.25, 0.75, 0.2, 0.6);
        assert_eq!(band, FaceBox::new(1, 1, 4, 3));
    }

    #[test]
    fn test_fraction_of_tiny_box_keeps_one_pixel() {
        let face = FaceBox::new(5, 5, 1, 1);
        let band = face.fraction(0.25, 0.75, 0.2, 0.6);
        assert_eq!(band, FaceBox::new(5, 5, 1, 1));
    }
}
