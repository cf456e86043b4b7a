//! Ordered threshold rules mapping a color estimate to a tone category.
//!
//! The default intervals overlap; rules are tried top to bottom and the
//! first match wins, so table order is part of its meaning.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::color_reducer::ColorEstimate;
use crate::shared::error::SkinToneError;
use crate::shared::interval::Interval;

use super::tone_category::ToneCategory;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToneRule {
    pub category: ToneCategory,
    pub hue: Interval,
    pub saturation: Interval,
    pub value: Interval,
}

impl ToneRule {
    pub fn matches(&self, estimate: &ColorEstimate) -> bool {
        self.hue.contains(estimate.hue)
            && self.saturation.contains(estimate.saturation)
            && self.value.contains(estimate.value)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<ToneRule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            rules: vec![
                ToneRule {
                    category: ToneCategory::Fair,
                    hue: Interval::closed(0.0, 50.0),
                    saturation: Interval::closed(10.0, 60.0),
                    value: Interval::left_open(80.0, 255.0),
                },
                ToneRule {
                    category: ToneCategory::Light,
                    hue: Interval::closed(10.0, 50.0),
                    saturation: Interval::closed(30.0, 90.0),
                    value: Interval::left_open(70.0, 240.0),
                },
                ToneRule {
                    category: ToneCategory::Medium,
                    hue: Interval::closed(10.0, 40.0),
                    saturation: Interval::closed(50.0, 120.0),
                    value: Interval::left_open(40.0, 200.0),
                },
                ToneRule {
                    category: ToneCategory::Dark,
                    hue: Interval::closed(0.0, 30.0),
                    saturation: Interval::closed(60.0, 150.0),
                    value: Interval::left_open(20.0, 100.0),
                },
            ],
        }
    }
}

impl RuleTable {
    /// Rules may not map to `Unknown`; that label is reserved for "no rule
    /// matched".
    pub fn new(rules: Vec<ToneRule>) -> Result<Self, SkinToneError> {
        for (i, rule) in rules.iter().enumerate() {
            if !rule.category.is_known() {
                return Err(SkinToneError::RuleTable(format!(
                    "rule {i} maps to {}",
                    rule.category
                )));
            }
            for (channel, interval) in [
                ("hue", &rule.hue),
                ("saturation", &rule.saturation),
                ("value", &rule.value),
            ] {
                interval.validate().map_err(|e| {
                    SkinToneError::RuleTable(format!("rule {i} ({}) {channel}: {e}", rule.category))
                })?;
            }
        }
        Ok(Self { rules })
    }

    pub fn from_json(json: &str) -> Result<Self, SkinToneError> {
        let rules: Vec<ToneRule> =
            serde_json::from_str(json).map_err(|e| SkinToneError::RuleTable(e.to_string()))?;
        Self::new(rules)
    }

    pub fn from_path(path: &Path) -> Result<Self, SkinToneError> {
        let json = fs::read_to_string(path).map_err(|e| SkinToneError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let rules: Vec<ToneRule> = serde_json::from_str(&json).map_err(|e| SkinToneError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table = Self::new(rules)?;
        log::info!("Loaded {} tone rules from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn rules(&self) -> &[ToneRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Index of the first rule matching the estimate.
    pub fn matching_rule(&self, estimate: &ColorEstimate) -> Option<usize> {
        self.rules.iter().position(|r| r.matches(estimate))
    }

    pub fn classify(&self, estimate: &ColorEstimate) -> ToneCategory {
        self.matching_rule(estimate)
            .map(|i| self.rules[i].category)
            .unwrap_or(ToneCategory::Unknown)
    }
}

/// First-match classification of `estimate` against `table`.
pub fn classify(estimate: &ColorEstimate, table: &RuleTable) -> ToneCategory {
    table.classify(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::hsv::Hsv;
    use rstest::rstest;

    #[rstest]
    #[case::fair_only(Hsv::new(5.0, 20.0, 200.0), ToneCategory::Fair)]
    #[case::light_only(Hsv::new(45.0, 80.0, 150.0), ToneCategory::Light)]
    #[case::medium_only(Hsv::new(15.0, 110.0, 60.0), ToneCategory::Medium)]
    #[case::dark_only(Hsv::new(5.0, 140.0, 30.0), ToneCategory::Dark)]
    #[case::overlap_resolves_to_first(Hsv::new(20.0, 40.0, 90.0), ToneCategory::Fair)]
    #[case::light_before_medium(Hsv::new(20.0, 80.0, 150.0), ToneCategory::Light)]
    #[case::medium_before_dark(Hsv::new(20.0, 100.0, 80.0), ToneCategory::Medium)]
    #[case::black(Hsv::new(0.0, 0.0, 0.0), ToneCategory::Unknown)]
    #[case::blue(Hsv::new(240.0, 255.0, 255.0), ToneCategory::Unknown)]
    #[case::fair_value_floor_is_open(Hsv::new(5.0, 20.0, 80.0), ToneCategory::Unknown)]
    #[case::fair_value_ceiling(Hsv::new(5.0, 20.0, 255.0), ToneCategory::Fair)]
    #[case::nan_hue(Hsv::new(f64::NAN, 40.0, 150.0), ToneCategory::Unknown)]
    #[case::nan_value(Hsv::new(20.0, 40.0, f64::NAN), ToneCategory::Unknown)]
    fn test_default_table(#[case] estimate: Hsv, #[case] expected: ToneCategory) {
        assert_eq!(classify(&estimate, &RuleTable::default()), expected);
    }

    #[test]
    fn test_classification_is_repeatable() {
        let table = RuleTable::default();
        let estimate = Hsv::new(25.0, 70.0, 120.0);
        let first = table.classify(&estimate);
        assert!((0..10).all(|_| table.classify(&estimate) == first));
    }

    #[test]
    fn test_matching_rule_index() {
        let table = RuleTable::default();
        assert_eq!(table.matching_rule(&Hsv::new(20.0, 40.0, 90.0)), Some(0));
        assert_eq!(table.matching_rule(&Hsv::new(45.0, 80.0, 150.0)), Some(1));
        assert_eq!(table.matching_rule(&Hsv::new(0.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_custom_order_changes_result() {
        let mut rules = RuleTable::default().rules().to_vec();
        rules.swap(0, 1);
        let table = RuleTable::new(rules).unwrap();
        assert_eq!(table.classify(&Hsv::new(20.0, 40.0, 90.0)), ToneCategory::Light);
    }

    #[test]
    fn test_json_roundtrip_keeps_order() {
        let json = serde_json::to_string(&RuleTable::default()).unwrap();
        assert_eq!(RuleTable::from_json(&json).unwrap(), RuleTable::default());
    }

    #[test]
    fn test_rejects_unknown_target() {
        let json = r#"[ { "category": "UNKNOWN",
            "hue": { "min": 0, "max": 1 },
            "saturation": { "min": 0, "max": 1 },
            "value": { "min": 0, "max": 1 } } ]"#;
        let err = RuleTable::from_json(json).unwrap_err();
        assert!(err.to_string().contains("maps to UNKNOWN"));
    }

    #[test]
    fn test_rejects_inverted_interval() {
        let json = r#"[ { "category": "DARK",
            "hue": { "min": 30, "max": 0 },
            "saturation": { "min": 0, "max": 1 },
            "value": { "min": 0, "max": 1 } } ]"#;
        let err = RuleTable::from_json(json).unwrap_err();
        assert!(err.to_string().contains("hue"));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(&path, serde_json::to_string(&RuleTable::default()).unwrap()).unwrap();
        assert_eq!(RuleTable::from_path(&path).unwrap().len(), 4);
    }

    #[test]
    fn test_empty_table_classifies_unknown() {
        let table = RuleTable::new(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.classify(&Hsv::new(20.0, 40.0, 150.0)), ToneCategory::Unknown);
    }
}
