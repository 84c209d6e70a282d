//! Composite scores used to rank region candidates.
//!
//! [`CandidateScorer`] is the seam: the scanner scores every candidate with
//! it and the elector reuses it for sub-window refinement, so a replacement
//! heuristic changes both consistently.  Scores are in `[0, 1]`.
//!
//! ## Silence
//!
//! | Term | Weight | 1.0 when |
//! |------|--------|----------|
//! | quietness | 0.40 | RMS at or below −80 dBFS |
//! | stability | 0.25 | per-window RMS does not vary |
//! | duration | 0.20 | at least `reference_secs` long |
//! | steadiness | 0.15 | zero spectral flux |
//!
//! ## Speech
//!
//! | Term | Weight | 1.0 when |
//! |------|--------|----------|
//! | voicing | 0.40 | every window voiced |
//! | level | 0.25 | RMS on `target_rms_db` |
//! | duration | 0.20 | at least `reference_secs` long |
//! | consistency | 0.15 | per-window RMS does not vary |

use super::region::{RegionKind, RegionMetrics, Window};

/// Ranks a region by how representative it is of its class.
pub trait CandidateScorer: Send + Sync {
    /// Class this scorer ranks.
    fn kind(&self) -> RegionKind;

    /// Score in `[0, 1]`; higher is more representative.
    fn score(&self, metrics: &RegionMetrics, window: &Window) -> f64;
}

fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

fn duration_term(window: &Window, reference_secs: f64) -> f64 {
    if reference_secs <= 0.0 {
        return 1.0;
    }
    unit(window.duration / reference_secs)
}

// ---------------------------------------------------------------------------
// SilenceScorer
// ---------------------------------------------------------------------------

/// Prefers quiet, steady, hum-like stretches over breaths and room swells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceScorer {
    /// Duration beyond which length stops adding to the score, seconds.
    pub reference_secs: f64,
}

impl Default for SilenceScorer {
    fn default() -> Self {
        Self {
            reference_secs: 1.0,
        }
    }
}

impl CandidateScorer for SilenceScorer {
    fn kind(&self) -> RegionKind {
        RegionKind::Silence
    }

    fn score(&self, metrics: &RegionMetrics, window: &Window) -> f64 {
        let quietness = unit((-20.0 - metrics.rms_db) / 60.0);
        let stability = 1.0 / (1.0 + metrics.rms_spread_db.max(0.0));
        let steadiness = 1.0 - unit(metrics.spectral.flux);
        let duration = duration_term(window, self.reference_secs);

        unit(0.40 * quietness + 0.25 * stability + 0.20 * duration + 0.15 * steadiness)
    }
}

// ---------------------------------------------------------------------------
// SpeechScorer
// ---------------------------------------------------------------------------

/// Prefers densely voiced, evenly delivered speech near a nominal level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechScorer {
    /// Duration beyond which length stops adding to the score, seconds.
    pub reference_secs: f64,
    /// Level at which the level term peaks, dBFS.
    pub target_rms_db: f64,
}

impl Default for SpeechScorer {
    fn default() -> Self {
        Self {
            reference_secs: 2.0,
            target_rms_db: -24.0,
        }
    }
}

impl CandidateScorer for SpeechScorer {
    fn kind(&self) -> RegionKind {
        RegionKind::Speech
    }

    fn score(&self, metrics: &RegionMetrics, window: &Window) -> f64 {
        let voicing = unit(metrics.voicing_density);
        let level = 1.0 - unit((metrics.rms_db - self.target_rms_db).abs() / 24.0);
        let consistency = 1.0 / (1.0 + metrics.rms_spread_db.max(0.0) / 3.0);
        let duration = duration_term(window, self.reference_secs);

        unit(0.40 * voicing + 0.25 * level + 0.20 * duration + 0.15 * consistency)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
