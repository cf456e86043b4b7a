use std::path::PathBuf;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::classify_image_use_case::{ClassifyImageUseCase, ImageOutcome};
use super::pipeline_logger::PipelineLogger;

/// Outcome for one input of a batch. Failures carry the error message so
/// one bad file never aborts the rest.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchItem {
    pub path: PathBuf,
    pub outcome: Result<ImageOutcome, String>,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Flat JSON object: `path` plus either the outcome fields or `error`.
impl Serialize for BatchItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("path", &self.path)?;
        match &self.outcome {
            Ok(o) => {
                map.serialize_entry("analysis", &o.analysis)?;
                map.serialize_entry("overlay", &o.overlay)?;
            }
            Err(e) => map.serialize_entry("error", e)?,
        }
        map.end()
    }
}

/// Runs the single-image use case over many inputs.
///
/// Results come back in input order regardless of how the work is scheduled.
pub trait BatchExecutor: Send + Sync {
    fn execute(
        &self,
        use_case: &ClassifyImageUseCase,
        inputs: &[PathBuf],
        logger: &mut dyn PipelineLogger,
    ) -> Vec<BatchItem>;
}

/// One image at a time on the calling thread.
pub struct SequentialBatchExecutor;

impl BatchExecutor for SequentialBatchExecutor {
    fn execute(
        &self,
        use_case: &ClassifyImageUseCase,
        inputs: &[PathBuf],
        logger: &mut dyn PipelineLogger,
    ) -> Vec<BatchItem> {
        let total = inputs.len();
        inputs
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let outcome = use_case.execute(path, logger).map_err(|e| {
                    log::warn!("{}: {e}", path.display());
                    e.to_string()
                });
                logger.progress(i + 1, total);
                BatchItem {
                    path: path.clone(),
                    outcome,
                }
            })
            .collect()
    }
}
