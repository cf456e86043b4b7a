use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::classification::rule_table::RuleTable;
use crate::classification::tone_category::ToneCategory;
use crate::color::color_reducer::{ColorEstimate, ColorReducer, Reduction};
use crate::detection::domain::face_locator::FaceLocator;
use crate::sampling::skin_sampler::SkinSampler;
use crate::shared::error::SkinToneError;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

use super::pipeline_logger::{
    NullPipelineLogger, PipelineLogger, STAGE_CLASSIFY, STAGE_DETECT, STAGE_REDUCE, STAGE_SAMPLE,
};

/// What to do when no face is found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoFacePolicy {
    /// Sample the center of the image instead.
    WholeImage,
    /// Report `Unknown` without sampling.
    #[default]
    Refuse,
}

impl fmt::Display for NoFacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoFacePolicy::WholeImage => write!(f, "whole-image"),
            NoFacePolicy::Refuse => write!(f, "refuse"),
        }
    }
}

impl FromStr for NoFacePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whole-image" => Ok(NoFacePolicy::WholeImage),
            "refuse" => Ok(NoFacePolicy::Refuse),
            other => Err(format!(
                "no-face policy must be 'whole-image' or 'refuse', got '{other}'"
            )),
        }
    }
}

/// Result of one detect + classify run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub face: Option<FaceBox>,
    /// Rectangle the color estimate was taken from; `None` when sampling
    /// was skipped.
    pub sample_region: Option<FaceBox>,
    pub reduction: Option<Reduction>,
    pub category: ToneCategory,
}

impl Analysis {
    pub fn estimate(&self) -> Option<ColorEstimate> {
        self.reduction.map(|r| r.estimate)
    }
}

/// Face locator, skin sampler, color reducer and rule table wired together.
///
/// Holds no per-request state and is `Sync`, so one analyzer can serve
/// several threads.
pub struct SkinToneAnalyzer {
    locator: FaceLocator,
    sampler: SkinSampler,
    reducer: ColorReducer,
    rules: RuleTable,
}

impl SkinToneAnalyzer {
    pub fn new(locator: FaceLocator, reducer: ColorReducer, rules: RuleTable) -> Self {
        Self {
            locator,
            sampler: SkinSampler::new(),
            reducer,
            rules,
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn detect_face(&self, frame: &Frame) -> Result<Option<FaceBox>, SkinToneError> {
        self.locator.locate(frame)
    }

    /// Samples around `face` (or the image center without one) and maps the
    /// median color to a category. Never fails: an empty sample or an
    /// out-of-table color both give `Unknown`.
    pub fn classify_skin_tone(&self, frame: &Frame, face: Option<&FaceBox>) -> ToneCategory {
        self.classify_region(frame, face, &mut NullPipelineLogger).category
    }

    pub fn analyze(&self, frame: &Frame, policy: NoFacePolicy) -> Result<Analysis, SkinToneError> {
        self.analyze_logged(frame, policy, &mut NullPipelineLogger)
    }

    /// [`analyze`](Self::analyze) with per-stage timings reported to `logger`.
    pub fn analyze_logged(
        &self,
        frame: &Frame,
        policy: NoFacePolicy,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Analysis, SkinToneError> {
        let start = Instant::now();
        let face = self.detect_face(frame)?;
        logger.timing(STAGE_DETECT, elapsed_ms(start));
        logger.metric("faces_selected", if face.is_some() { 1.0 } else { 0.0 });

        if face.is_none() && policy == NoFacePolicy::Refuse {
            log::info!("No face detected, refusing to classify");
            return Ok(Analysis {
                face: None,
                sample_region: None,
                reduction: None,
                category: ToneCategory::Unknown,
            });
        }

        let mut analysis = self.classify_region(frame, face.as_ref(), logger);
        analysis.face = face;
        Ok(analysis)
    }

    fn classify_region(
        &self,
        frame: &Frame,
        face: Option<&FaceBox>,
        logger: &mut dyn PipelineLogger,
    ) -> Analysis {
        let start = Instant::now();
        let sample = self.sampler.sample(frame, face);
        logger.timing(STAGE_SAMPLE, elapsed_ms(start));

        let start = Instant::now();
        let reduction = self.reducer.reduce(&sample.pixels);
        logger.timing(STAGE_REDUCE, elapsed_ms(start));
        if let Some(r) = &reduction {
            logger.metric("sample_pixels", r.pixel_count as f64);
        }

        let start = Instant::now();
        let category = reduction
            .map(|r| self.rules.classify(&r.estimate))
            .unwrap_or(ToneCategory::Unknown);
        logger.timing(STAGE_CLASSIFY, elapsed_ms(start));

        Analysis {
            face: face.copied(),
            sample_region: sample.region,
            reduction,
            category,
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
