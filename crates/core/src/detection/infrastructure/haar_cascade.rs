//! Boosted Haar-feature cascade model.
//!
//! Loads OpenCV's `opencv-cascade-classifier` XML (for example
//! `haarcascade_frontalface_default.xml`) or an equivalent JSON layout:
//! a shared feature table plus stages of weak classifiers that index into
//! it. Only stump trees are supported, and tilted features are rejected.
use std::fs;
use std::path::Path;
use std::str::FromStr;

use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::shared::error::SkinToneError;

use super::integral_image::IntegralImage;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HaarRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HaarFeature {
    pub rects: Vec<HaarRect>,
}

/// Decision stump: contributes `left` when the normalized feature response
/// is below `threshold`, else `right`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeakClassifier {
    pub feature: usize,
    pub threshold: f64,
    pub left: f64,
    pub right: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub threshold: f64,
    pub classifiers: Vec<WeakClassifier>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HaarCascade {
    pub window_width: u32,
    pub window_height: u32,
    pub features: Vec<HaarFeature>,
    pub stages: Vec<Stage>,
}

impl HaarCascade {
    /// Loads a `.xml` file as an OpenCV cascade, anything else as JSON.
    pub fn from_path(path: &Path) -> Result<Self, SkinToneError> {
        let text = fs::read_to_string(path).map_err(|e| SkinToneError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let is_xml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        let cascade = if is_xml {
            Self::from_opencv_xml(&text).map_err(|e| match e {
                SkinToneError::CascadeFormat(msg) => {
                    SkinToneError::CascadeFormat(format!("{}: {msg}", path.display()))
                }
                other => other,
            })?
        } else {
            let cascade: HaarCascade =
                serde_json::from_str(&text).map_err(|e| SkinToneError::Json {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            cascade.validate()?;
            cascade
        };
        log::debug!(
            "Loaded cascade {}: {}x{} window, {} stages, {} features",
            path.display(),
            cascade.window_width,
            cascade.window_height,
            cascade.stages.len(),
            cascade.features.len()
        );
        Ok(cascade)
    }

    pub fn from_json(json: &str) -> Result<Self, SkinToneError> {
        let cascade: HaarCascade = serde_json::from_str(json)
            .map_err(|e| SkinToneError::CascadeFormat(e.to_string()))?;
        cascade.validate()?;
        Ok(cascade)
    }

    /// Parses OpenCV's cascade XML. Stages come from
    /// `stages/_/weakClassifiers`, whose `internalNodes` read
    /// `left right feature threshold` with two `leafValues`, and each
    /// feature is a list of `x y width height weight` rects.
    pub fn from_opencv_xml(xml: &str) -> Result<Self, SkinToneError> {
        let doc = Document::parse(xml).map_err(|e| format_error(e.to_string()))?;
        let root = doc
            .descendants()
            .find(|n| n.has_tag_name("cascade"))
            .ok_or_else(|| format_error("missing <cascade> element"))?;

        if let Some(kind) = root.children().find(|n| n.has_tag_name("featureType")) {
            let kind = kind.text().unwrap_or("").trim();
            if kind != "HAAR" {
                return Err(format_error(format!("unsupported feature type {kind:?}")));
            }
        }

        let cascade = HaarCascade {
            window_width: single(child(root, "width")?)?,
            window_height: single(child(root, "height")?)?,
            features: items(child(root, "features")?)
                .map(parse_feature)
                .collect::<Result<_, _>>()?,
            stages: items(child(root, "stages")?)
                .map(parse_stage)
                .collect::<Result<_, _>>()?,
        };
        cascade.validate()?;
        Ok(cascade)
    }

    pub fn validate(&self) -> Result<(), SkinToneError> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(SkinToneError::CascadeFormat("window size must be non-zero".into()));
        }
        if self.stages.is_empty() {
            return Err(SkinToneError::CascadeFormat("cascade has no stages".into()));
        }
        for (i, feature) in self.features.iter().enumerate() {
            if feature.rects.is_empty() {
                return Err(SkinToneError::CascadeFormat(format!("feature {i} has no rects")));
            }
            for r in &feature.rects {
                if !fits(r.x, r.width, self.window_width) || !fits(r.y, r.height, self.window_height)
                {
                    return Err(SkinToneError::CascadeFormat(format!(
                        "feature {i} rect {}x{}+{}+{} exceeds {}x{} window",
                        r.width, r.height, r.x, r.y, self.window_width, self.window_height
                    )));
                }
            }
        }
        for (s, stage) in self.stages.iter().enumerate() {
            if let Some(bad) = stage
                .classifiers
                .iter()
                .find(|c| c.feature >= self.features.len())
            {
                return Err(SkinToneError::CascadeFormat(format!(
                    "stage {s} references feature {} of {}",
                    bad.feature,
                    self.features.len()
                )));
            }
        }
        Ok(())
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    /// Runs every stage on the window with top-left corner (`x`, `y`).
    ///
    /// Rejects as soon as one stage sum falls below its threshold.
    pub(crate) fn passes(&self, ii: &IntegralImage, x: usize, y: usize) -> bool {
        let inv_norm = self.inverse_norm(ii, x, y);

        self.stages.iter().all(|stage| {
            let total: f64 = stage
                .classifiers
                .iter()
                .map(|c| {
                    let response = self.feature_sum(&self.features[c.feature], ii, x, y) * inv_norm;
                    if response < c.threshold {
                        c.left
                    } else {
                        c.right
                    }
                })
                .sum();
            total >= stage.threshold
        })
    }

    fn feature_sum(&self, feature: &HaarFeature, ii: &IntegralImage, x: usize, y: usize) -> f64 {
        feature
            .rects
            .iter()
            .map(|r| {
                r.weight
                    * ii.rect_sum(
                        x + r.x as usize,
                        y + r.y as usize,
                        r.width as usize,
                        r.height as usize,
                    ) as f64
            })
            .sum()
    }

    /// `1 / sqrt(A·Σx² − (Σx)²)` over the window interior (1 px border
    /// dropped), or 1 for flat windows.
    fn inverse_norm(&self, ii: &IntegralImage, x: usize, y: usize) -> f64 {
        let (nx, nw) = interior(x, self.window_width as usize);
        let (ny, nh) = interior(y, self.window_height as usize);
        let area = (nw * nh) as f64;
        let sum = ii.rect_sum(nx, ny, nw, nh) as f64;
        let sqsum = ii.rect_sqsum(nx, ny, nw, nh) as f64;
        let spread = area * sqsum - sum * sum;
        if spread > 0.0 {
            1.0 / spread.sqrt()
        } else {
            1.0
        }
    }
}

fn fits(start: u32, len: u32, limit: u32) -> bool {
    start.checked_add(len).is_some_and(|end| end <= limit)
}

fn format_error(msg: impl Into<String>) -> SkinToneError {
    SkinToneError::CascadeFormat(msg.into())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Result<Node<'a, 'input>, SkinToneError> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or_else(|| format_error(format!("missing <{name}> in <{}>", node.tag_name().name())))
}

/// Element children of a sequence node (OpenCV writes them as `<_>`).
fn items<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn numbers<T: FromStr>(node: Node) -> Result<Vec<T>, SkinToneError> {
    node.text()
        .unwrap_or("")
        .split_whitespace()
        .map(|token| {
            token.parse::<T>().map_err(|_| {
                format_error(format!("bad number {token:?} in <{}>", node.tag_name().name()))
            })
        })
        .collect()
}

fn single<T: FromStr>(node: Node) -> Result<T, SkinToneError> {
    let mut values = numbers::<T>(node)?;
    if values.len() != 1 {
        return Err(format_error(format!(
            "<{}> holds {} values, expected 1",
            node.tag_name().name(),
            values.len()
        )));
    }
    Ok(values.remove(0))
}

fn parse_stage(node: Node) -> Result<Stage, SkinToneError> {
    let classifiers = items(child(node, "weakClassifiers")?)
        .map(parse_stump)
        .collect::<Result<_, _>>()?;
    Ok(Stage {
        threshold: single(child(node, "stageThreshold")?)?,
        classifiers,
    })
}

fn parse_stump(node: Node) -> Result<WeakClassifier, SkinToneError> {
    let internal = child(node, "internalNodes")?;
    let tokens: Vec<&str> = internal.text().unwrap_or("").split_whitespace().collect();
    let leaves = numbers::<f64>(child(node, "leafValues")?)?;
    let [_, _, feature, threshold] = tokens[..] else {
        return Err(format_error(format!(
            "weak classifier has {} internal values, only stumps (4) are supported",
            tokens.len()
        )));
    };
    let [left, right] = leaves[..] else {
        return Err(format_error(format!(
            "stump has {} leaf values, expected 2",
            leaves.len()
        )));
    };
    Ok(WeakClassifier {
        feature: feature
            .parse()
            .map_err(|_| format_error(format!("bad feature index {feature:?}")))?,
        threshold: threshold
            .parse()
            .map_err(|_| format_error(format!("bad stump threshold {threshold:?}")))?,
        left,
        right,
    })
}

fn parse_feature(node: Node) -> Result<HaarFeature, SkinToneError> {
    if let Some(tilted) = node.children().find(|n| n.has_tag_name("tilted")) {
        if tilted.text().unwrap_or("").trim() != "0" {
            return Err(format_error("tilted features are not supported"));
        }
    }
    let rects = items(child(node, "rects")?)
        .map(|rect| {
            let values = numbers::<f64>(rect)?;
            let [x, y, width, height, weight] = values[..] else {
                return Err(format_error(format!(
                    "rect has {} values, expected 5",
                    values.len()
                )));
            };
            Ok(HaarRect {
                x: coordinate(x)?,
                y: coordinate(y)?,
                width: coordinate(width)?,
                height: coordinate(height)?,
                weight,
            })
        })
        .collect::<Result<_, _>>()?;
    Ok(HaarFeature { rects })
}

fn coordinate(value: f64) -> Result<u32, SkinToneError> {
    if value.fract() != 0.0 || !(0.0..=u32::MAX as f64).contains(&value) {
        return Err(format_error(format!("bad rect coordinate {value}")));
    }
    Ok(value as u32)
}

fn interior(origin: usize, extent: usize) -> (usize, usize) {
    if extent > 2 {
        (origin + 1, extent - 2)
    } else {
        (origin, extent)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 10x10 window responding to a dark band above a bright band.
    pub(crate) const EDGE_CASCADE_JSON: &str = r#"{
        "window_width": 10,
        "window_height": 10,
        "features": [
            { "rects": [
                { "x": 0, "y": 0, "width": 10, "height": 5, "weight": -1.0 },
                { "x": 0, "y": 5, "width": 10, "height": 5, "weight": 1.0 }
            ] }
        ],
        "stages": [
            { "threshold": 0.5,
              "classifiers": [ { "feature": 0, "threshold": 0.5, "left": -1.0, "right": 1.0 } ] }
        ]
    }"#;

    pub(crate) fn edge_cascade() -> HaarCascade {
        HaarCascade::from_json(EDGE_CASCADE_JSON).unwrap()
    }

    fn gray_with_edge(width: usize, height: usize, edge_row: usize) -> Vec<u8> {
        (0..width * height)
            .map(|i| if i / width < edge_row { 0 } else { 200 })
            .collect()
    }

    #[test]
    fn test_parses_and_validates() {
        let cascade = edge_cascade();
        assert_eq!(cascade.window_size(), (10, 10));
        assert_eq!(cascade.stages.len(), 1);
    }

    #[test]
    fn test_window_over_edge_passes() {
        let gray = gray_with_edge(10, 10, 5);
        let ii = IntegralImage::new(&gray, 10, 10);
        assert!(edge_cascade().passes(&ii, 0, 0));
    }

    #[test]
    fn test_inverted_edge_is_rejected() {
        let gray: Vec<u8> = gray_with_edge(10, 10, 5).iter().map(|v| 200 - v).collect();
        let ii = IntegralImage::new(&gray, 10, 10);
        assert!(!edge_cascade().passes(&ii, 0, 0));
    }

    #[test]
    fn test_flat_window_is_rejected() {
        let gray = vec![120u8; 100];
        let ii = IntegralImage::new(&gray, 10, 10);
        assert!(!edge_cascade().passes(&ii, 0, 0));
    }

    #[test]
    fn test_rejects_empty_stages() {
        let json = r#"{ "window_width": 4, "window_height": 4, "features": [], "stages": [] }"#;
        let err = HaarCascade::from_json(json).unwrap_err();
        assert!(err.to_string().contains("no stages"));
    }

    #[test]
    fn test_rejects_dangling_feature_index() {
        let json = r#"{
            "window_width": 4, "window_height": 4,
            "features": [],
            "stages": [ { "threshold": 0.0,
                "classifiers": [ { "feature": 3, "threshold": 0.0, "left": 0.0, "right": 1.0 } ] } ]
        }"#;
        let err = HaarCascade::from_json(json).unwrap_err();
        assert!(err.to_string().contains("references feature 3"));
    }

    #[test]
    fn test_rejects_rect_outside_window() {
        let json = r#"{
            "window_width": 4, "window_height": 4,
            "features": [ { "rects": [ { "x": 2, "y": 0, "width": 4, "height": 2, "weight": 1.0 } ] } ],
            "stages": [ { "threshold": 0.0, "classifiers": [] } ]
        }"#;
        let err = HaarCascade::from_json(json).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_rejects_invalid_json() {
        assert!(matches!(
            HaarCascade::from_json("{ not json"),
            Err(SkinToneError::CascadeFormat(_))
        ));
    }

    #[test]
    fn test_from_path_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cascade.json");
        fs::write(&path, EDGE_CASCADE_JSON).unwrap();
        assert_eq!(HaarCascade::from_path(&path).unwrap(), edge_cascade());
    }

    /// The edge cascade above as OpenCV writes it.
    const EDGE_CASCADE_XML: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>10</height>
  <width>10</width>
  <stageParams>
    <maxWeakCount>1</maxWeakCount></stageParams>
  <featureParams>
    <maxCatCount>0</maxCatCount></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <!-- stage 0 -->
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>5.0000000000000000e-01</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 5.0000000000000000e-01</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 10 5 -1.</_>
        <_>
          0 5 10 5 1.</_></rects></_></features></cascade>
</opencv_storage>
"#;

    #[test]
    fn test_opencv_xml_matches_json_layout() {
        assert_eq!(HaarCascade::from_opencv_xml(EDGE_CASCADE_XML).unwrap(), edge_cascade());
    }

    #[test]
    fn test_from_path_dispatches_on_xml_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("haarcascade_frontalface_default.xml");
        fs::write(&path, EDGE_CASCADE_XML).unwrap();
        assert_eq!(HaarCascade::from_path(&path).unwrap(), edge_cascade());
    }

    #[test]
    fn test_xml_rejects_tilted_feature() {
        let xml = EDGE_CASCADE_XML.replace("</rects></_></features>", "</rects>\n<tilted>1</tilted></_></features>");
        let err = HaarCascade::from_opencv_xml(&xml).unwrap_err();
        assert!(err.to_string().contains("tilted"));
    }

    #[test]
    fn test_xml_rejects_deeper_trees() {
        let xml = EDGE_CASCADE_XML.replace("0 -1 0 5.0000000000000000e-01", "1 -1 0 0.5 0 -2 0 0.5");
        let err = HaarCascade::from_opencv_xml(&xml).unwrap_err();
        assert!(err.to_string().contains("only stumps"));
    }

    #[test]
    fn test_xml_missing_stages() {
        let xml = EDGE_CASCADE_XML.replace("<stages>", "<stagez>").replace("</stages>", "</stagez>");
        let err = HaarCascade::from_opencv_xml(&xml).unwrap_err();
        assert!(err.to_string().contains("missing <stages>"));
    }

    #[test]
    fn test_rejects_overflowing_rect() {
        let json = r#"{
            "window_width": 4, "window_height": 4,
            "features": [ { "rects": [ { "x": 4294967295, "y": 0, "width": 2, "height": 2, "weight": 1.0 } ] } ],
            "stages": [ { "threshold": 0.0, "classifiers": [] } ]
        }"#;
        let err = HaarCascade::from_json(json).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = HaarCascade::from_path(Path::new("/nonexistent/cascade.json")).unwrap_err();
        assert!(matches!(err, SkinToneError::Io { .. }));
    }
}
