use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;

use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::overlay::domain::frame_annotator::FrameAnnotator;
use crate::shared::error::SkinToneError;

use super::pipeline_logger::PipelineLogger;
use super::skin_tone_analyzer::{Analysis, NoFacePolicy, SkinToneAnalyzer};

/// Where and how face overlays are written.
///
/// Every overlay path handed out is unique for the lifetime of the output,
/// so inputs sharing a file name never overwrite each other.
pub struct OverlayOutput {
    dir: PathBuf,
    annotator: Box<dyn FrameAnnotator>,
    writer: Box<dyn ImageWriter>,
    claimed: Mutex<HashSet<PathBuf>>,
}

impl OverlayOutput {
    pub fn new(
        dir: impl Into<PathBuf>,
        annotator: Box<dyn FrameAnnotator>,
        writer: Box<dyn ImageWriter>,
    ) -> Self {
        Self {
            dir: dir.into(),
            annotator,
            writer,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// `<dir>/<input file name>_face.png`, with `_2`, `_3`, ... appended
    /// when an earlier input already took that name.
    pub fn path_for(&self, input: &Path) -> PathBuf {
        let name = input
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        let mut path = self.dir.join(format!("{name}_face.png"));
        let mut n = 2;
        while !claimed.insert(path.clone()) {
            path = self.dir.join(format!("{name}_face_{n}.png"));
            n += 1;
        }
        path
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageOutcome {
    pub analysis: Analysis,
    /// Written only when a face was found.
    pub overlay: Option<PathBuf>,
}

/// Single-image pipeline: read → analyze → (annotate → write).
pub struct ClassifyImageUseCase {
    reader: Box<dyn ImageReader>,
    analyzer: SkinToneAnalyzer,
    policy: NoFacePolicy,
    overlay: Option<OverlayOutput>,
}

impl ClassifyImageUseCase {
    pub fn new(
        reader: Box<dyn ImageReader>,
        analyzer: SkinToneAnalyzer,
        policy: NoFacePolicy,
        overlay: Option<OverlayOutput>,
    ) -> Self {
        Self {
            reader,
            analyzer,
            policy,
            overlay,
        }
    }

    pub fn execute(
        &self,
        input: &Path,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ImageOutcome, SkinToneError> {
        let mut frame = self.reader.read_path(input)?;
        let analysis = self.analyzer.analyze_logged(&frame, self.policy, logger)?;

        let overlay = match (&self.overlay, analysis.face) {
            (Some(out), Some(face)) => {
                out.annotator.annotate(&mut frame, &[face]);
                let path = out.path_for(input);
                out.writer.write(&path, &frame)?;
                Some(path)
            }
            _ => None,
        };

        logger.info(&format!("{}: {}", input.display(), analysis.category));
        Ok(ImageOutcome { analysis, overlay })
    }
}
