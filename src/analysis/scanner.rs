//! Run detection over the windowed measurement stream.
//!
//! [`RegionScanner`] walks the pre-scanned windows once, classifies each
//! with a [`WindowClassifier`] and groups consecutive qualifying windows
//! into runs.  Every run that is long enough becomes a scored
//! [`RegionCandidate`].
//!
//! ## Algorithm
//!
//! 1. A run starts at the first qualifying window.
//! 2. It extends while windows qualify; up to `max_gap_windows`
//!    non-qualifying windows are bridged (pauses between words).  Trailing
//!    gap windows are never part of the run.
//! 3. Invalid windows (non-finite values, non-positive duration) end the
//!    current run and are skipped.
//! 4. Runs shorter than `min_windows` are discarded; runs longer than
//!    `max_windows` are split into consecutive chunks and a short remainder
//!    is dropped.
//!
//! The output is in scan order and candidates never overlap.  No qualifying
//! window means an empty list, not an error.

use std::ops::{ControlFlow, Range};

use super::measurements::WindowMeasurement;
use super::region::{RegionCandidate, RegionKind, RegionMetrics, Window};
use super::scoring::CandidateScorer;

// ---------------------------------------------------------------------------
// WindowClassifier
// ---------------------------------------------------------------------------

/// Decides whether a single analysis window belongs to a class.
pub trait WindowClassifier: Send + Sync {
    fn kind(&self) -> RegionKind;
    fn qualifies(&self, window: &WindowMeasurement) -> bool;
}

/// A window is silence when its RMS is at or below `threshold_db`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceClassifier {
    pub threshold_db: f64,
}

impl WindowClassifier for SilenceClassifier {
    fn kind(&self) -> RegionKind {
        RegionKind::Silence
    }

    fn qualifies(&self, window: &WindowMeasurement) -> bool {
        window.rms_db <= self.threshold_db
    }
}

/// A window is speech when its RMS is at or above `threshold_db`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechClassifier {
    pub threshold_db: f64,
}

impl WindowClassifier for SpeechClassifier {
    fn kind(&self) -> RegionKind {
        RegionKind::Speech
    }

    fn qualifies(&self, window: &WindowMeasurement) -> bool {
        window.rms_db >= self.threshold_db
    }
}

// ---------------------------------------------------------------------------
// RunLimits
// ---------------------------------------------------------------------------

/// Length constraints for a run of qualifying windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunLimits {
    /// Shortest qualifying run, in windows (at least 1).
    pub min_windows: usize,
    /// Longest candidate, in windows; longer runs are split.
    pub max_windows: usize,
    /// Non-qualifying windows that may be bridged inside a run.
    pub max_gap_windows: usize,
}

impl RunLimits {
    fn normalised(self) -> Self {
        let min_windows = self.min_windows.max(1);
        Self {
            min_windows,
            max_windows: self.max_windows.max(min_windows),
            max_gap_windows: self.max_gap_windows,
        }
    }
}

/// The scan was stopped by its observer before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanInterrupted {
    /// Index of the window being visited when the observer stopped the scan.
    pub at_window: usize,
}

// ---------------------------------------------------------------------------
// RegionScanner
// ---------------------------------------------------------------------------

/// Emits scored candidates for one class.
pub struct RegionScanner<'a> {
    classifier: &'a dyn WindowClassifier,
    scorer: &'a dyn CandidateScorer,
    limits: RunLimits,
}

impl<'a> RegionScanner<'a> {
    pub fn new(
        classifier: &'a dyn WindowClassifier,
        scorer: &'a dyn CandidateScorer,
        limits: RunLimits,
    ) -> Self {
        Self {
            classifier,
            scorer,
            limits: limits.normalised(),
        }
    }

    pub fn kind(&self) -> RegionKind {
        self.classifier.kind()
    }

    /// Scan the whole stream.
    pub fn scan(&self, windows: &[WindowMeasurement]) -> Vec<RegionCandidate> {
        match self.scan_observed(windows, &mut |_, _| ControlFlow::Continue(())) {
            Ok(candidates) => candidates,
            // The no-op observer never breaks.
            Err(_) => Vec::new(),
        }
    }

    /// Scan the stream, calling `observer` once per window before it is
    /// classified.  Returning [`ControlFlow::Break`] stops the scan.
    pub fn scan_observed(
        &self,
        windows: &[WindowMeasurement],
        observer: &mut dyn FnMut(usize, &WindowMeasurement) -> ControlFlow<()>,
    ) -> Result<Vec<RegionCandidate>, ScanInterrupted> {
        let limits = self.limits;
        let mut runs: Vec<Range<usize>> = Vec::new();
        let mut run_start: Option<usize> = None;
        let mut last_hit = 0usize;
        let mut gap = 0usize;
        let mut invalid = 0usize;

        for (i, window) in windows.iter().enumerate() {
            if observer(i, window).is_break() {
                return Err(ScanInterrupted { at_window: i });
            }

            if !window.is_valid() {
                invalid += 1;
                if let Some(start) = run_start.take() {
                    runs.push(start..last_hit + 1);
                }
                gap = 0;
                continue;
            }

            if self.classifier.qualifies(window) {
                if run_start.is_none() {
                    run_start = Some(i);
                }
                last_hit = i;
                gap = 0;
            } else if let Some(start) = run_start {
                gap += 1;
                if gap > limits.max_gap_windows {
                    runs.push(start..last_hit + 1);
                    run_start = None;
                    gap = 0;
                }
            }
        }
        if let Some(start) = run_start {
            runs.push(start..last_hit + 1);
        }

        if invalid > 0 {
            log::warn!(
                "{} scan: skipped {invalid} invalid window(s) of {}",
                self.kind(),
                windows.len()
            );
        }

        let candidates: Vec<RegionCandidate> = runs
            .into_iter()
            .flat_map(|run| split_run(run, limits))
            .filter_map(|frames| self.candidate(windows, frames))
            .collect();

        log::debug!(
            "{} scan: {} candidate(s) from {} window(s)",
            self.kind(),
            candidates.len(),
            windows.len()
        );

        Ok(candidates)
    }

    fn candidate(
        &self,
        windows: &[WindowMeasurement],
        frames: Range<usize>,
    ) -> Option<RegionCandidate> {
        let slice = windows.get(frames.clone())?;
        let window = Window::spanning(slice)?;
        let metrics = RegionMetrics::aggregate(slice);
        let score = self.scorer.score(&metrics, &window);
        Some(RegionCandidate::new(
            self.kind(),
            window,
            frames,
            metrics,
            score,
        ))
    }
}

/// Split `run` into chunks of at most `max_windows`, dropping anything
/// shorter than `min_windows`.
fn split_run(run: Range<usize>, limits: RunLimits) -> Vec<Range<usize>> {
    let mut chunks = Vec::new();
    let mut start = run.start;
    while start < run.end {
        let end = (start + limits.max_windows).min(run.end);
        if end - start >= limits.min_windows {
            chunks.push(start..end);
        }
        start = end;
    }
    chunks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
