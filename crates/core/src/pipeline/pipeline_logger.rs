use std::collections::HashMap;
use std::time::Instant;

/// Stage names reported by the analyzer.
pub const STAGE_DETECT: &str = "detect";
pub const STAGE_SAMPLE: &str = "sample";
pub const STAGE_REDUCE: &str = "reduce";
pub const STAGE_CLASSIFY: &str = "classify";

/// Cross-cutting logger for pipeline events.
///
/// Keeps the analyzer and batch executors free of any particular output
/// mechanism: the CLI logs through the `log` crate, tests discard events.
pub trait PipelineLogger: Send {
    /// Report image-level progress through a batch.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one image.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. face count, sample size).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Forwards events to the `log` crate and aggregates per-stage timings
/// and metrics for a summary at the end of the run.
pub struct LogPipelineLogger {
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    total_images: usize,
}

impl LogPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            total_images: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Pipeline summary ({} images, {:.2}s total):",
            self.total_images,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:7.2}ms  total {total_ms:8.1}ms  ({} runs)",
                durations.len()
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.1}", mean(&self.metrics[name])));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_images = total;
        if total > 1 {
            log::info!("Classified {current}/{total} images");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        log::debug!("{stage}: {duration_ms:.2}ms");
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

enum Event {
    Timing(String, f64),
    Metric(String, f64),
    Info(String),
}

/// Buffers events so a worker thread can hand them to the run's logger
/// once its image is done.
#[derive(Default)]
pub struct BufferedPipelineLogger {
    events: Vec<Event>,
}

impl BufferedPipelineLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Forwards buffered events in arrival order. Progress is not buffered;
    /// the executor reports it itself.
    pub fn replay_into(self, target: &mut dyn PipelineLogger) {
        for event in self.events {
            match event {
                Event::Timing(stage, ms) => target.timing(&stage, ms),
                Event::Metric(name, value) => target.metric(&name, value),
                Event::Info(message) => target.info(&message),
            }
        }
    }
}

impl PipelineLogger for BufferedPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.events.push(Event::Timing(stage.to_string(), duration_ms));
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.events.push(Event::Metric(name.to_string(), value));
    }

    fn info(&mut self, message: &str) {
        self.events.push(Event::Info(message.to_string()));
    }
}
