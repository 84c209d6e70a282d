//! Progress reporting from inside the analysis passes.
//!
//! Sinks are called synchronously from the analysis thread and must not
//! block.  Any `Fn(usize, &str, f64, f64, Option<&AudioMeasurements>)`
//! closure is a sink.

use crate::analysis::AudioMeasurements;

/// Receives progress updates while a file is analysed.
pub trait ProgressSink: Send + Sync {
    /// * `pass_index`: 0-based pass number.
    /// * `pass_name`: stable pass name (`"silence_scan"`, …).
    /// * `progress`: fraction of the pass completed, 0 to 1.
    /// * `level_db`: level of the window just visited, dBFS.
    /// * `measurements`: results so far, once any exist.
    fn on_progress(
        &self,
        pass_index: usize,
        pass_name: &str,
        progress: f64,
        level_db: f64,
        measurements: Option<&AudioMeasurements>,
    );
}

impl<F> ProgressSink for F
where
    F: Fn(usize, &str, f64, f64, Option<&AudioMeasurements>) + Send + Sync,
{
    fn on_progress(
        &self,
        pass_index: usize,
        pass_name: &str,
        progress: f64,
        level_db: f64,
        measurements: Option<&AudioMeasurements>,
    ) {
        self(pass_index, pass_name, progress, level_db, measurements)
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _: usize, _: &str, _: f64, _: f64, _: Option<&AudioMeasurements>) {}
}

/// Logs pass completion at debug level, tagged with the file name.
#[derive(Debug, Clone)]
pub struct LogProgress {
    pub source: String,
}

impl ProgressSink for LogProgress {
    fn on_progress(
        &self,
        pass_index: usize,
        pass_name: &str,
        progress: f64,
        _level_db: f64,
        _measurements: Option<&AudioMeasurements>,
    ) {
        if progress >= 1.0 {
            log::debug!("{}: pass {pass_index} ({pass_name}) done", self.source);
        }
    }
}
