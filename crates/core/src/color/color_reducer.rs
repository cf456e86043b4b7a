use serde::{Deserialize, Serialize};

use crate::shared::constants::MIN_MASKED_SAMPLES;
use crate::shared::frame::Frame;

use super::hsv::Hsv;
use super::skin_mask::SkinMask;

/// Representative skin color of a sample: per-channel median HSV.
pub type ColorEstimate = Hsv;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reduction {
    pub estimate: ColorEstimate,
    /// Pixels the median was taken over.
    pub pixel_count: usize,
    /// False when too few pixels passed the skin mask and the whole sample
    /// was used instead.
    pub mask_applied: bool,
}

/// Collapses a sample region into one [`ColorEstimate`].
///
/// Pixels outside the skin mask are discarded unless fewer than
/// `min_samples` survive, in which case every pixel in the region is used.
#[derive(Clone, Debug)]
pub struct ColorReducer {
    mask: SkinMask,
    min_samples: usize,
}

impl Default for ColorReducer {
    fn default() -> Self {
        Self::new(SkinMask::default(), MIN_MASKED_SAMPLES)
    }
}

impl ColorReducer {
    pub fn new(mask: SkinMask, min_samples: usize) -> Self {
        Self { mask, min_samples }
    }

    pub fn mask(&self) -> &SkinMask {
        &self.mask
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Returns `None` for an empty sample.
    pub fn reduce(&self, sample: &Frame) -> Option<Reduction> {
        let all: Vec<Hsv> = sample.pixels().map(Hsv::from_rgb).collect();
        if all.is_empty() {
            return None;
        }

        let masked: Vec<Hsv> = all.iter().copied().filter(|p| self.mask.contains(p)).collect();
        let mask_applied = !masked.is_empty() && masked.len() >= self.min_samples;
        let used = if mask_applied {
            masked
        } else {
            log::warn!(
                "Only {} of {} pixels look like skin (need {}), using the whole region",
                masked.len(),
                all.len(),
                self.min_samples
            );
            all
        };

        let estimate = median_hsv(&used);
        log::debug!(
            "Median HSV over {} pixels: ({:.1}, {:.1}, {:.1})",
            used.len(),
            estimate.hue,
            estimate.saturation,
            estimate.value
        );

        Some(Reduction {
            estimate,
            pixel_count: used.len(),
            mask_applied,
        })
    }
}

fn median_hsv(pixels: &[Hsv]) -> Hsv {
    let mut hues: Vec<f64> = pixels.iter().map(|p| p.hue).collect();
    let mut sats: Vec<f64> = pixels.iter().map(|p| p.saturation).collect();
    let mut vals: Vec<f64> = pixels.iter().map(|p| p.value).collect();
    Hsv::new(median(&mut hues), median(&mut sats), median(&mut vals))
}

/// Median of a non-empty slice; even counts average the two middle values.
/// Reorders the slice.
pub(crate) fn median(values: &mut [f64]) -> f64 {
    let n = values.len();
    debug_assert!(n > 0, "median of empty slice");
    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        return upper;
    }
    let below = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (below + upper) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    const SKIN: [u8; 3] = [150, 134, 126];
    const BLUE: [u8; 3] = [0, 0, 255];

    /// One-row frame with `skin` skin pixels followed by `blue` blue ones.
    fn strip(skin: usize, blue: usize) -> Frame {
        let mut data = Vec::new();
        for _ in 0..skin {
            data.extend_from_slice(&SKIN);
        }
        for _ in 0..blue {
            data.extend_from_slice(&BLUE);
        }
        Frame::new(data, (skin + blue) as u32, 1)
    }

    #[rstest]
    #[case::odd(vec![3.0, 1.0, 2.0], 2.0)]
    #[case::even(vec![4.0, 1.0, 3.0, 2.0], 2.5)]
    #[case::single(vec![7.0], 7.0)]
    #[case::repeated(vec![5.0, 5.0, 1.0, 9.0], 5.0)]
    fn test_median(#[case] values: Vec<f64>, #[case] expected: f64) {
        let mut values = values;
        assert_abs_diff_eq!(median(&mut values), expected);
    }

    #[test]
    fn test_masked_pixels_drive_estimate() {
        let reduction = ColorReducer::default().reduce(&strip(60, 10)).unwrap();
        assert!(reduction.mask_applied);
        assert_eq!(reduction.pixel_count, 60);
        assert_abs_diff_eq!(reduction.estimate.hue, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(reduction.estimate.saturation, 40.8, epsilon = 1e-9);
        assert_abs_diff_eq!(reduction.estimate.value, 150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_too_few_skin_pixels_uses_whole_region() {
        let reduction = ColorReducer::default().reduce(&strip(10, 50)).unwrap();
        assert!(!reduction.mask_applied);
        assert_eq!(reduction.pixel_count, 60);
        assert_abs_diff_eq!(reduction.estimate.hue, 240.0, epsilon = 1e-9);
    }

    #[test]
    fn test_exactly_min_samples_applies_mask() {
        let reduction = ColorReducer::default().reduce(&strip(50, 60)).unwrap();
        assert!(reduction.mask_applied);
        assert_abs_diff_eq!(reduction.estimate.hue, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_custom_min_samples() {
        let reducer = ColorReducer::new(SkinMask::default(), 5);
        let reduction = reducer.reduce(&strip(10, 50)).unwrap();
        assert!(reduction.mask_applied);
        assert_eq!(reduction.pixel_count, 10);
    }

    #[test]
    fn test_black_region_estimate() {
        let frame = Frame::filled(20, 20, [0, 0, 0]);
        let reduction = ColorReducer::default().reduce(&frame).unwrap();
        assert!(!reduction.mask_applied);
        assert_eq!(reduction.estimate, Hsv::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_zero_min_samples_with_no_skin_uses_whole_region() {
        let reducer = ColorReducer::new(SkinMask::default(), 0);
        let reduction = reducer.reduce(&Frame::filled(40, 40, BLUE)).unwrap();
        assert!(!reduction.mask_applied);
        assert_eq!(reduction.pixel_count, 1600);
        assert_abs_diff_eq!(reduction.estimate.hue, 240.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_sample() {
        assert!(ColorReducer::default().reduce(&Frame::new(Vec::new(), 0, 0)).is_none());
    }
}
