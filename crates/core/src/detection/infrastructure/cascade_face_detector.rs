//! Multi-scale sliding-window face detector driven by a Haar cascade.
//!
//! Builds an image pyramid from the luminance channel, runs the cascade on
//! every window of every level, then clusters the raw hits and keeps only
//! clusters with enough agreeing neighbors.
use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::{
    CLOSE_UP_MIN_FACE_SIZE, DEFAULT_MIN_FACE_SIZE, DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR,
};
use crate::shared::error::SkinToneError;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

use super::haar_cascade::HaarCascade;
use super::integral_image::IntegralImage;
use super::math;

/// Relative tolerance for treating two hits as the same face.
const GROUP_EPS: f64 = 0.2;

/// Pyramid levels past this factor are scanned with a 1 px stride.
const FINE_STEP_FACTOR: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    /// Pyramid step between levels; must be > 1.
    pub scale_factor: f64,
    /// A cluster needs more than this many raw hits to count as a face.
    /// Zero disables grouping and returns raw hits.
    pub min_neighbors: usize,
    /// Smallest face edge (px) evaluated.
    pub min_size: u32,
    /// Largest face edge (px) evaluated, unbounded when `None`.
    pub max_size: Option<u32>,
}

impl Default for DetectionParams {
    fn default() -> Self {
        DetectionPreset::Default.params()
    }
}

impl DetectionParams {
    pub fn validate(&self) -> Result<(), SkinToneError> {
        if !(self.scale_factor > 1.0 && self.scale_factor.is_finite()) {
            return Err(SkinToneError::InvalidParams(format!(
                "scale factor must be greater than 1.0, got {}",
                self.scale_factor
            )));
        }
        if self.min_size == 0 {
            return Err(SkinToneError::InvalidParams("minimum face size must be > 0".into()));
        }
        if let Some(max) = self.max_size {
            if max < self.min_size {
                return Err(SkinToneError::InvalidParams(format!(
                    "maximum face size {max} is below minimum {}",
                    self.min_size
                )));
            }
        }
        Ok(())
    }
}

/// Detector settings for common capture contexts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionPreset {
    /// Uploaded photos: faces may be small in frame.
    #[default]
    Default,
    /// Camera captures held at arm's length: the face fills the frame.
    CloseUp,
}

impl DetectionPreset {
    pub fn params(&self) -> DetectionParams {
        let min_size = match self {
            DetectionPreset::Default => DEFAULT_MIN_FACE_SIZE,
            DetectionPreset::CloseUp => CLOSE_UP_MIN_FACE_SIZE,
        };
        DetectionParams {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size,
            max_size: None,
        }
    }
}

impl std::fmt::Display for DetectionPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionPreset::Default => write!(f, "default"),
            DetectionPreset::CloseUp => write!(f, "close-up"),
        }
    }
}

impl std::str::FromStr for DetectionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(DetectionPreset::Default),
            "close-up" => Ok(DetectionPreset::CloseUp),
            other => Err(format!(
                "preset must be 'default' or 'close-up', got '{other}'"
            )),
        }
    }
}

pub struct CascadeFaceDetector {
    cascade: HaarCascade,
    params: DetectionParams,
}

impl CascadeFaceDetector {
    pub fn new(cascade: HaarCascade, params: DetectionParams) -> Result<Self, SkinToneError> {
        cascade.validate()?;
        params.validate()?;
        Ok(Self { cascade, params })
    }

    pub fn from_path(path: &Path, params: DetectionParams) -> Result<Self, SkinToneError> {
        Self::new(HaarCascade::from_path(path)?, params)
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Raw window hits across all pyramid levels, in original image
    /// coordinates and scan order.
    fn scan(&self, gray: &GrayImage) -> Vec<FaceBox> {
        let (img_w, img_h) = gray.dimensions();
        let (win_w, win_h) = self.cascade.window_size();
        let mut hits = Vec::new();
        let mut factor = 1.0f64;

        loop {
            let level_w = (img_w as f64 / factor).round() as u32;
            let level_h = (img_h as f64 / factor).round() as u32;
            if level_w < win_w || level_h < win_h {
                break;
            }

            let face_w = (win_w as f64 * factor).round() as u32;
            let face_h = (win_h as f64 * factor).round() as u32;
            if let Some(max) = self.params.max_size {
                if face_w > max || face_h > max {
                    break;
                }
            }

            if face_w >= self.params.min_size && face_h >= self.params.min_size {
                let level = if level_w == img_w && level_h == img_h {
                    gray.clone()
                } else {
                    imageops::resize(gray, level_w, level_h, FilterType::Triangle)
                };
                let ii = IntegralImage::new(level.as_raw(), level_w, level_h);
                let step = if factor > FINE_STEP_FACTOR { 1 } else { 2 };

                for y in (0..=(level_h - win_h) as usize).step_by(step) {
                    for x in (0..=(level_w - win_w) as usize).step_by(step) {
                        if self.cascade.passes(&ii, x, y) {
                            hits.push(FaceBox::new(
                                (x as f64 * factor).round() as u32,
                                (y as f64 * factor).round() as u32,
                                face_w,
                                face_h,
                            ));
                        }
                    }
                }
            }

            factor *= self.params.scale_factor;
        }

        hits
    }

    /// Clusters raw hits, averages each surviving cluster, and drops boxes
    /// nested inside a better-supported neighbor.
    fn group(&self, hits: &[FaceBox]) -> Vec<FaceBox> {
        if self.params.min_neighbors == 0 {
            return hits.to_vec();
        }

        let grouped: Vec<(FaceBox, usize)> = math::cluster_boxes(hits, GROUP_EPS)
            .into_iter()
            .filter(|members| members.len() > self.params.min_neighbors)
            .map(|members| (average_box(hits, &members), members.len()))
            .collect();

        grouped
            .iter()
            .enumerate()
            .filter(|&(i, &(inner, n_inner))| {
                !grouped.iter().enumerate().any(|(j, &(outer, n_outer))| {
                    i != j
                        && nested_with_margin(&inner, &outer)
                        && (n_outer > n_inner.max(3) || n_inner < 3)
                })
            })
            .map(|(_, &(face, _))| face)
            .collect()
    }
}

impl FaceDetector for CascadeFaceDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<FaceBox>, SkinToneError> {
        if frame.is_empty() {
            return Err(SkinToneError::ZeroDimensions);
        }
        let gray = GrayImage::from_raw(frame.width(), frame.height(), frame.to_luminance())
            .ok_or(SkinToneError::ZeroDimensions)?;

        let hits = self.scan(&gray);
        let faces = self.group(&hits);
        log::debug!(
            "Cascade scan of {}x{}: {} raw hits, {} faces",
            frame.width(),
            frame.height(),
            hits.len(),
            faces.len()
        );
        Ok(faces)
    }
}

fn average_box(hits: &[FaceBox], members: &[usize]) -> FaceBox {
    let n = members.len() as f64;
    let mean = |get: fn(&FaceBox) -> u32| -> u32 {
        (members.iter().map(|&i| get(&hits[i]) as f64).sum::<f64>() / n).round() as u32
    };
    FaceBox::new(mean(|b| b.x), mean(|b| b.y), mean(|b| b.width), mean(|b| b.height))
}

/// `inner` lies within `outer` grown by `GROUP_EPS` of its size.
fn nested_with_margin(inner: &FaceBox, outer: &FaceBox) -> bool {
    let dx = (outer.width as f64 * GROUP_EPS).round() as i64;
    let dy = (outer.height as f64 * GROUP_EPS).round() as i64;
    let (ix, iy) = (inner.x as i64, inner.y as i64);
    let (ox, oy) = (outer.x as i64, outer.y as i64);
    ix >= ox - dx
        && iy >= oy - dy
        && ix + inner.width as i64 <= ox + outer.width as i64 + dx
        && iy + inner.height as i64 <= oy + outer.height as i64 + dy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::haar_cascade::tests::edge_cascade;
    use rstest::rstest;

    fn params(min_neighbors: usize, min_size: u32) -> DetectionParams {
        DetectionParams {
            scale_factor: 1.1,
            min_neighbors,
            min_size,
            max_size: None,
        }
    }

    /// 60x60 gray background with a 20x20 block at (20, 20): dark top half,
    /// bright bottom half. The edge cascade fires around its center.
    fn frame_with_block() -> Frame {
        let (w, h) = (60usize, 60usize);
        let mut data = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                let v = if (20..40).contains(&x) && (20..40).contains(&y) {
                    if y < 30 {
                        0
                    } else {
                        200
                    }
                } else {
                    100
                };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(data, w as u32, h as u32)
    }

    #[test]
    fn test_finds_block() {
        let detector = CascadeFaceDetector::new(edge_cascade(), params(1, 10)).unwrap();
        let faces = detector.detect(&frame_with_block()).unwrap();
        assert!(!faces.is_empty());

        let f = faces[0];
        let cx = f.x as f64 + f.width as f64 / 2.0;
        let cy = f.y as f64 + f.height as f64 / 2.0;
        assert!((22.0..=38.0).contains(&cx), "center x {cx}");
        assert!((22.0..=38.0).contains(&cy), "center y {cy}");
    }

    #[test]
    fn test_uniform_image_has_no_faces() {
        let detector = CascadeFaceDetector::new(edge_cascade(), params(1, 10)).unwrap();
        let faces = detector.detect(&Frame::filled(60, 60, [90, 90, 90])).unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn test_neighbor_threshold_suppresses_weak_clusters() {
        let detector = CascadeFaceDetector::new(edge_cascade(), params(10_000, 10)).unwrap();
        let faces = detector.detect(&frame_with_block()).unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn test_min_size_above_image_finds_nothing() {
        let detector = CascadeFaceDetector::new(edge_cascade(), params(0, 100)).unwrap();
        let faces = detector.detect(&frame_with_block()).unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn test_zero_neighbors_returns_raw_hits() {
        let raw = CascadeFaceDetector::new(edge_cascade(), params(0, 10)).unwrap();
        let grouped = CascadeFaceDetector::new(edge_cascade(), params(1, 10)).unwrap();
        let frame = frame_with_block();
        assert!(raw.detect(&frame).unwrap().len() > grouped.detect(&frame).unwrap().len());
    }

    #[test]
    fn test_image_smaller_than_window() {
        let detector = CascadeFaceDetector::new(edge_cascade(), params(1, 1)).unwrap();
        let faces = detector.detect(&Frame::filled(5, 5, [0, 0, 0])).unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn test_empty_frame_is_an_error() {
        let detector = CascadeFaceDetector::new(edge_cascade(), params(1, 10)).unwrap();
        assert!(detector.detect(&Frame::new(vec![], 0, 0)).is_err());
    }

    #[test]
    fn test_group_averages_cluster() {
        let detector = CascadeFaceDetector::new(edge_cascade(), params(1, 10)).unwrap();
        let hits = vec![FaceBox::new(10, 10, 20, 20), FaceBox::new(12, 12, 20, 20)];
        assert_eq!(detector.group(&hits), vec![FaceBox::new(11, 11, 20, 20)]);
    }

    #[test]
    fn test_group_drops_nested_weaker_box() {
        let detector = CascadeFaceDetector::new(edge_cascade(), params(1, 10)).unwrap();
        let mut hits = vec![FaceBox::new(0, 0, 100, 100); 6];
        hits.extend(vec![FaceBox::new(30, 30, 20, 20); 2]);
        assert_eq!(detector.group(&hits), vec![FaceBox::new(0, 0, 100, 100)]);
    }

    #[rstest]
    #[case::scale_one(DetectionParams { scale_factor: 1.0, ..DetectionParams::default() })]
    #[case::scale_nan(DetectionParams { scale_factor: f64::NAN, ..DetectionParams::default() })]
    #[case::zero_min(DetectionParams { min_size: 0, ..DetectionParams::default() })]
    #[case::max_below_min(DetectionParams { max_size: Some(10), ..DetectionParams::default() })]
    fn test_invalid_params_rejected(#[case] bad: DetectionParams) {
        assert!(matches!(
            CascadeFaceDetector::new(edge_cascade(), bad),
            Err(SkinToneError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_presets() {
        assert_eq!(DetectionPreset::Default.params().min_size, 25);
        assert_eq!(DetectionPreset::CloseUp.params().min_size, 100);
        assert_eq!(DetectionParams::default().min_neighbors, 5);
        assert!((DetectionParams::default().scale_factor - 1.05).abs() < f64::EPSILON);
    }

    #[test]
    fn test_preset_names() {
        for preset in [DetectionPreset::Default, DetectionPreset::CloseUp] {
            assert_eq!(preset.to_string().parse::<DetectionPreset>().unwrap(), preset);
        }
        assert!("tiny".parse::<DetectionPreset>().is_err());
        assert_eq!(
            serde_json::to_string(&DetectionPreset::CloseUp).unwrap(),
            "\"close-up\""
        );
    }
}
