use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classification::rule_table::RuleTable;
use crate::color::color_reducer::ColorReducer;
use crate::color::skin_mask::SkinMask;
use crate::detection::domain::face_locator::FaceLocator;
use crate::detection::domain::face_selection::FaceSelection;
use crate::detection::infrastructure::cascade_face_detector::{
    CascadeFaceDetector, DetectionParams, DetectionPreset,
};
use crate::shared::constants::MIN_MASKED_SAMPLES;
use crate::shared::error::SkinToneError;

use super::skin_tone_analyzer::{NoFacePolicy, SkinToneAnalyzer};

/// Everything needed to build a [`SkinToneAnalyzer`], loadable from JSON.
///
/// Detector fields left unset fall back to the chosen preset. Without a
/// face the default is to refuse rather than guess from the image center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub cascade: Option<PathBuf>,
    pub preset: DetectionPreset,
    pub scale_factor: Option<f64>,
    pub min_neighbors: Option<usize>,
    pub min_face_size: Option<u32>,
    pub max_face_size: Option<u32>,
    pub selection: FaceSelection,
    pub no_face: NoFacePolicy,
    pub rules: Option<PathBuf>,
    pub mask: SkinMask,
    pub min_samples: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cascade: None,
            preset: DetectionPreset::Default,
            scale_factor: None,
            min_neighbors: None,
            min_face_size: None,
            max_face_size: None,
            selection: FaceSelection::First,
            no_face: NoFacePolicy::default(),
            rules: None,
            mask: SkinMask::default(),
            min_samples: MIN_MASKED_SAMPLES,
        }
    }
}

impl AnalyzerConfig {
    /// `<config dir>/skintone/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("skintone").join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, SkinToneError> {
        let json = fs::read_to_string(path).map_err(|e| SkinToneError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = serde_json::from_str(&json).map_err(|e| SkinToneError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `path` when given, else the default location if a file exists
    /// there, else the built-in defaults. An explicit path must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SkinToneError> {
        match path {
            Some(p) => Self::load(p),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(p) => Self::load(&p),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn detection_params(&self) -> DetectionParams {
        let base = self.preset.params();
        DetectionParams {
            scale_factor: self.scale_factor.unwrap_or(base.scale_factor),
            min_neighbors: self.min_neighbors.unwrap_or(base.min_neighbors),
            min_size: self.min_face_size.unwrap_or(base.min_size),
            max_size: self.max_face_size.or(base.max_size),
        }
    }

    pub fn rule_table(&self) -> Result<RuleTable, SkinToneError> {
        match &self.rules {
            Some(path) => RuleTable::from_path(path),
            None => Ok(RuleTable::default()),
        }
    }

    /// Builds a cascade-backed analyzer. All configuration errors surface
    /// here rather than during classification.
    pub fn build_analyzer(&self, cascade_path: &Path) -> Result<SkinToneAnalyzer, SkinToneError> {
        self.mask.validate().map_err(SkinToneError::InvalidParams)?;
        if self.min_samples == 0 {
            return Err(SkinToneError::InvalidParams(
                "min_samples must be at least 1".into(),
            ));
        }
        let detector = CascadeFaceDetector::from_path(cascade_path, self.detection_params())?;
        let locator = FaceLocator::new(Box::new(detector), self.selection);
        let reducer = ColorReducer::new(self.mask, self.min_samples);
        Ok(SkinToneAnalyzer::new(locator, reducer, self.rule_table()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::haar_cascade::tests::EDGE_CASCADE_JSON;

    #[test]
    fn test_empty_json_is_default() {
        let config: AnalyzerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn test_default_no_face_policy_refuses() {
        assert_eq!(NoFacePolicy::default(), NoFacePolicy::Refuse);
        assert_eq!(AnalyzerConfig::default().no_face, NoFacePolicy::default());
    }

    #[test]
    fn test_preset_with_overrides() {
        let config: AnalyzerConfig = serde_json::from_str(
            r#"{ "preset": "close-up", "min_neighbors": 2, "selection": "largest", "no_face": "whole-image" }"#,
        )
        .unwrap();
        let params = config.detection_params();
        assert_eq!(params.min_size, 100);
        assert_eq!(params.min_neighbors, 2);
        assert!((params.scale_factor - 1.05).abs() < f64::EPSILON);
        assert_eq!(config.selection, FaceSelection::Largest);
        assert_eq!(config.no_face, NoFacePolicy::WholeImage);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "confidence": 0.5 }"#).unwrap();
        assert!(matches!(
            AnalyzerConfig::load(&path),
            Err(SkinToneError::Json { .. })
        ));
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let err = AnalyzerConfig::load_or_default(Some(Path::new("/nonexistent/config.json")))
            .unwrap_err();
        assert!(matches!(err, SkinToneError::Io { .. }));
    }

    #[test]
    fn test_build_analyzer_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let cascade = dir.path().join("cascade.json");
        fs::write(&cascade, EDGE_CASCADE_JSON).unwrap();
        let rules = dir.path().join("rules.json");
        fs::write(&rules, serde_json::to_string(&RuleTable::default()).unwrap()).unwrap();

        let config = AnalyzerConfig {
            rules: Some(rules),
            min_face_size: Some(10),
            ..AnalyzerConfig::default()
        };
        let analyzer = config.build_analyzer(&cascade).unwrap();
        assert_eq!(analyzer.rules().len(), 4);
    }

    #[test]
    fn test_build_analyzer_rejects_bad_params() {
        let dir = tempfile::tempdir().unwrap();
        let cascade = dir.path().join("cascade.json");
        fs::write(&cascade, EDGE_CASCADE_JSON).unwrap();
        let config = AnalyzerConfig {
            scale_factor: Some(1.0),
            ..AnalyzerConfig::default()
        };
        assert!(matches!(
            config.build_analyzer(&cascade),
            Err(SkinToneError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_build_analyzer_rejects_inverted_mask() {
        let dir = tempfile::tempdir().unwrap();
        let cascade = dir.path().join("cascade.json");
        fs::write(&cascade, EDGE_CASCADE_JSON).unwrap();
        let mut config = AnalyzerConfig::default();
        config.mask.hue.min = 90.0;
        assert!(matches!(
            config.build_analyzer(&cascade),
            Err(SkinToneError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_build_analyzer_rejects_zero_min_samples() {
        let dir = tempfile::tempdir().unwrap();
        let cascade = dir.path().join("cascade.json");
        fs::write(&cascade, EDGE_CASCADE_JSON).unwrap();
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{ "min_samples": 0, "no_face": "whole-image" }"#).unwrap();
        assert!(matches!(
            config.build_analyzer(&cascade),
            Err(SkinToneError::InvalidParams(_))
        ));
    }
}
