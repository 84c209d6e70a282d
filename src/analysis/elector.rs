//! Election of the single most representative candidate per class.
//!
//! [`RegionElector::elect`] picks the highest-scoring candidate (earliest
//! wins ties) and then asks a [`RefinementStrategy`] for a golden
//! sub-region inside it.  The election result is an index into the
//! candidate list; the refinement is attached to that candidate with
//! [`RegionCandidate::refine`], which keeps the scanned bounds.

use std::ops::Range;

use super::measurements::WindowMeasurement;
use super::region::{RegionCandidate, RegionMetrics, Refinement, Window};
use super::scoring::CandidateScorer;

// ---------------------------------------------------------------------------
// RefinementStrategy
// ---------------------------------------------------------------------------

/// Searches an elected candidate for a tighter, more representative window.
pub trait RefinementStrategy: Send + Sync {
    /// Return a sub-region scoring strictly higher than `candidate`, or
    /// `None` to keep the candidate as scanned.
    fn refine(
        &self,
        candidate: &RegionCandidate,
        windows: &[WindowMeasurement],
        scorer: &dyn CandidateScorer,
    ) -> Option<Refinement>;
}

/// Never refines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefinement;

impl RefinementStrategy for NoRefinement {
    fn refine(
        &self,
        _candidate: &RegionCandidate,
        _windows: &[WindowMeasurement],
        _scorer: &dyn CandidateScorer,
    ) -> Option<Refinement> {
        None
    }
}

/// Slides a fixed-length sub-window across the candidate and keeps the
/// best-scoring position.
///
/// Positions advance by `step` windows from the candidate's first window
/// until the sub-window would pass its last one.  Ties keep the earliest
/// position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlidingRefiner {
    /// Sub-window length, in analysis windows.
    pub sub_windows: usize,
    /// Advance per position, in analysis windows.
    pub step: usize,
}

impl SlidingRefiner {
    pub fn new(sub_windows: usize) -> Self {
        Self {
            sub_windows: sub_windows.max(1),
            step: 1,
        }
    }
}

impl RefinementStrategy for SlidingRefiner {
    fn refine(
        &self,
        candidate: &RegionCandidate,
        windows: &[WindowMeasurement],
        scorer: &dyn CandidateScorer,
    ) -> Option<Refinement> {
        let frames = candidate.frames.clone();
        let sub = self.sub_windows.max(1);
        if frames.len() <= sub || frames.end > windows.len() {
            return None;
        }

        let mut best: Option<Refinement> = None;
        for start in (frames.start..=frames.end - sub).step_by(self.step.max(1)) {
            let range: Range<usize> = start..start + sub;
            let slice = &windows[range.clone()];
            let Some(window) = Window::spanning(slice) else {
                continue;
            };
            let metrics = RegionMetrics::aggregate(slice);
            let score = scorer.score(&metrics, &window);

            let better = match &best {
                Some(b) => score > b.score,
                None => score.is_finite(),
            };
            if better {
                best = Some(Refinement {
                    window,
                    frames: range,
                    metrics,
                    score,
                });
            }
        }

        best.filter(|b| b.score > candidate.score)
    }
}

// ---------------------------------------------------------------------------
// RegionElector
// ---------------------------------------------------------------------------

/// Elects and optionally refines one candidate per class.
pub struct RegionElector<'a> {
    scorer: &'a dyn CandidateScorer,
    refiner: &'a dyn RefinementStrategy,
}

impl<'a> RegionElector<'a> {
    pub fn new(scorer: &'a dyn CandidateScorer, refiner: &'a dyn RefinementStrategy) -> Self {
        Self { scorer, refiner }
    }

    /// Index of the highest-scoring candidate; the earliest wins ties.
    ///
    /// Non-finite scores rank below every finite one.  Returns `None` for an
    /// empty slice.
    pub fn select(candidates: &[RegionCandidate]) -> Option<usize> {
        let rank = |s: f64| if s.is_finite() { s } else { f64::NEG_INFINITY };
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in candidates.iter().enumerate() {
            let score = rank(c.score);
            match best {
                Some((_, b)) if score <= b => {}
                _ => best = Some((i, score)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Elect a candidate and try to refine it in place.
    ///
    /// `windows` must be the stream the candidates were scanned from.
    pub fn elect(
        &self,
        candidates: &mut [RegionCandidate],
        windows: &[WindowMeasurement],
    ) -> Option<usize> {
        let index = Self::select(candidates)?;
        let candidate = &mut candidates[index];

        log::debug!(
            "{} election: candidate {index} at {:.2}s (+{:.2}s), score {:.3}",
            candidate.kind,
            candidate.window.start,
            candidate.window.duration,
            candidate.score
        );

        if let Some(refinement) = self.refiner.refine(candidate, windows, self.scorer) {
            let refined = refinement.window;
            match candidate.refine(refinement) {
                Ok(()) => log::debug!(
                    "{} election: refined to {:.2}s (+{:.2}s), score {:.3}",
                    candidate.kind,
                    refined.start,
                    refined.duration,
                    candidate.effective_score()
                ),
                Err(e) => log::debug!("{} election: refinement rejected: {e}", candidate.kind),
            }
        }

        Some(index)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
