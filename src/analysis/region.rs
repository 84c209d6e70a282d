//! Region candidates: time windows that look like silence or speech.
//!
//! A [`RegionCandidate`] keeps the window it was scanned with.  When the
//! elector finds a tighter "golden" sub-region, the candidate gains a
//! [`Refinement`] instead of being overwritten, so both the refined and the
//! original bounds stay available:
//!
//! | Accessor | Unrefined | Refined |
//! |----------|-----------|---------|
//! | [`effective_window`](RegionCandidate::effective_window) | scanned window | refined window |
//! | [`original_window`](RegionCandidate::original_window) | `None` | scanned window |
//! | [`was_refined`](RegionCandidate::was_refined) | `false` | `true` |

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::measurements::{energy_mean_db, SpectralMetrics, WindowMeasurement, SILENCE_FLOOR_DB};

/// Voicing probability at or above which a window counts as voiced.
pub const VOICED_WINDOW_THRESHOLD: f64 = 0.5;

// ---------------------------------------------------------------------------
// RegionKind / Window
// ---------------------------------------------------------------------------

/// Class of a region candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Silence,
    Speech,
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionKind::Silence => write!(f, "silence"),
            RegionKind::Speech => write!(f, "speech"),
        }
    }
}

/// A time span within the file, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: f64,
    pub duration: f64,
}

impl Window {
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    /// Span covered by a contiguous run of analysis windows.
    ///
    /// Returns `None` for an empty slice.
    pub fn spanning(windows: &[WindowMeasurement]) -> Option<Self> {
        let first = windows.first()?;
        let last = windows.last()?;
        Some(Self::new(first.start, last.end() - first.start))
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// `other` lies within `self` (bounds inclusive).
    pub fn contains(&self, other: &Window) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }
}

// ---------------------------------------------------------------------------
// RegionMetrics
// ---------------------------------------------------------------------------

/// Amplitude and spectral metrics aggregated over a run of windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    /// Energy-mean RMS level, dBFS.
    pub rms_db: f64,
    /// Highest window peak, dBFS.
    pub peak_db: f64,
    /// `peak_db - rms_db`.
    pub crest_factor_db: f64,
    /// Standard deviation of the per-window RMS levels, dB.
    pub rms_spread_db: f64,
    /// Fraction of windows whose voicing is at least [`VOICED_WINDOW_THRESHOLD`].
    pub voicing_density: f64,
    pub spectral: SpectralMetrics,
}

impl RegionMetrics {
    /// Aggregate a contiguous run of windows.  Empty input gives silence.
    pub fn aggregate(windows: &[WindowMeasurement]) -> Self {
        if windows.is_empty() {
            return Self {
                rms_db: SILENCE_FLOOR_DB,
                peak_db: SILENCE_FLOOR_DB,
                ..Default::default()
            };
        }

        let n = windows.len() as f64;
        let rms_db = energy_mean_db(windows.iter().map(|w| w.rms_db));
        let peak_db = windows
            .iter()
            .map(|w| w.peak_db)
            .fold(SILENCE_FLOOR_DB, f64::max);

        let mean_rms = windows.iter().map(|w| w.rms_db).sum::<f64>() / n;
        let variance = windows
            .iter()
            .map(|w| (w.rms_db - mean_rms).powi(2))
            .sum::<f64>()
            / n;

        let voiced = windows
            .iter()
            .filter(|w| w.voicing >= VOICED_WINDOW_THRESHOLD)
            .count();

        Self {
            rms_db,
            peak_db,
            crest_factor_db: (peak_db - rms_db).max(0.0),
            rms_spread_db: variance.sqrt(),
            voicing_density: voiced as f64 / n,
            spectral: SpectralMetrics::mean(windows.iter().map(|w| &w.spectral)),
        }
    }
}

// ---------------------------------------------------------------------------
// Refinement
// ---------------------------------------------------------------------------

/// A narrower, better-scoring sub-region of an elected candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refinement {
    pub window: Window,
    /// Indices of the sub-region's windows in the scanned stream.
    pub frames: Range<usize>,
    pub metrics: RegionMetrics,
    pub score: f64,
}

/// Why a refinement was not applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefinementError {
    #[error("refined window {refined:?} is not inside {original:?}")]
    NotInside { original: Window, refined: Window },

    #[error("refined window ({refined:.3}s) is not narrower than the original ({original:.3}s)")]
    NotNarrower { original: f64, refined: f64 },

    #[error("refined score {refined:.4} does not beat {original:.4}")]
    NotBetter { original: f64, refined: f64 },

    #[error("candidate is already refined")]
    AlreadyRefined,
}

// ---------------------------------------------------------------------------
// RegionCandidate
// ---------------------------------------------------------------------------

/// A scanned window that qualifies as silence or speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCandidate {
    pub kind: RegionKind,
    /// The window as originally scanned.
    pub window: Window,
    /// Indices of the scanned windows in the measurement stream.
    pub frames: Range<usize>,
    pub metrics: RegionMetrics,
    /// Composite heuristic score of the scanned window, 0–1.
    pub score: f64,
    /// Golden sub-region, when the elector found one.
    #[serde(default)]
    pub refinement: Option<Refinement>,
}

impl RegionCandidate {
    /// Create an unrefined candidate.
    pub fn new(
        kind: RegionKind,
        window: Window,
        frames: Range<usize>,
        metrics: RegionMetrics,
        score: f64,
    ) -> Self {
        Self {
            kind,
            window,
            frames,
            metrics,
            score,
            refinement: None,
        }
    }

    /// Window to report: refined if present, otherwise as scanned.
    pub fn effective_window(&self) -> Window {
        self.refinement
            .as_ref()
            .map_or(self.window, |r| r.window)
    }

    /// Metrics of [`effective_window`](Self::effective_window).
    pub fn effective_metrics(&self) -> &RegionMetrics {
        self.refinement
            .as_ref()
            .map_or(&self.metrics, |r| &r.metrics)
    }

    /// Score of [`effective_window`](Self::effective_window).
    pub fn effective_score(&self) -> f64 {
        self.refinement.as_ref().map_or(self.score, |r| r.score)
    }

    /// Pre-refinement bounds; `None` unless refined.
    pub fn original_window(&self) -> Option<Window> {
        self.refinement.as_ref().map(|_| self.window)
    }

    pub fn was_refined(&self) -> bool {
        self.refinement.is_some()
    }

    /// Attach a golden sub-region.
    ///
    /// The refinement must lie inside the scanned window, be strictly
    /// narrower and score strictly higher; otherwise the candidate is left
    /// untouched.
    pub fn refine(&mut self, refinement: Refinement) -> Result<(), RefinementError> {
        if self.refinement.is_some() {
            return Err(RefinementError::AlreadyRefined);
        }
        if !self.window.contains(&refinement.window) {
            return Err(RefinementError::NotInside {
                original: self.window,
                refined: refinement.window,
            });
        }
        if refinement.window.duration >= self.window.duration {
            return Err(RefinementError::NotNarrower {
                original: self.window.duration,
                refined: refinement.window.duration,
            });
        }
        if !(refinement.score > self.score) {
            return Err(RefinementError::NotBetter {
                original: self.score,
                refined: refinement.score,
            });
        }
        self.refinement = Some(refinement);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
