use std::path::PathBuf;
use std::thread;

use crate::pipeline::batch_executor::{BatchExecutor, BatchItem};
use crate::pipeline::classify_image_use_case::ClassifyImageUseCase;
use crate::pipeline::pipeline_logger::{BufferedPipelineLogger, PipelineLogger};

/// Fans images out to a fixed pool of worker threads.
///
/// Layout: `main [feed] → workers [read/analyze] → main [collect/log]`
///
/// Each worker buffers its log events; the main thread replays them into
/// the run's logger so the logger itself never crosses threads.
pub struct ThreadedBatchExecutor {
    workers: usize,
}

impl ThreadedBatchExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// One worker per available core.
    pub fn with_available_parallelism() -> Self {
        Self::new(thread::available_parallelism().map_or(1, |n| n.get()))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedBatchExecutor {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

type Done = (usize, BatchItem, BufferedPipelineLogger);

impl BatchExecutor for ThreadedBatchExecutor {
    fn execute(
        &self,
        use_case: &ClassifyImageUseCase,
        inputs: &[PathBuf],
        logger: &mut dyn PipelineLogger,
    ) -> Vec<BatchItem> {
        let total = inputs.len();
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, &PathBuf)>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Done>();

        for job in inputs.iter().enumerate() {
            // Receiver is alive until the scope below ends.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let mut slots: Vec<Option<BatchItem>> = (0..total).map(|_| None).collect();

        thread::scope(|scope| {
            for _ in 0..self.workers.min(total) {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for (index, path) in job_rx {
                        let mut events = BufferedPipelineLogger::new();
                        let outcome = use_case.execute(path, &mut events).map_err(|e| {
                            log::warn!("{}: {e}", path.display());
                            e.to_string()
                        });
                        let item = BatchItem {
                            path: path.clone(),
                            outcome,
                        };
                        if done_tx.send((index, item, events)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(done_tx);

            for (completed, (index, item, events)) in done_rx.iter().enumerate() {
                events.replay_into(logger);
                logger.progress(completed + 1, total);
                slots[index] = Some(item);
            }
        });

        slots.into_iter().flatten().collect()
    }
}
