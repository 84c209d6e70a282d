//! Noise and speech profiles built from elected candidates.
//!
//! A profile is the materialised, immutable view of an elected candidate:
//! the level of its effective (possibly refined) window, its spectral
//! shape, and the original bounds when refinement narrowed it.  `None` from
//! either builder means "no candidate qualified, use whole-file
//! aggregates", never an error.

use serde::{Deserialize, Serialize};

use super::measurements::SpectralMetrics;
use super::region::{RegionCandidate, RegionKind, Window};

/// Representative silence: what the room sounds like with nobody talking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    /// Effective window (refined when refinement applied).
    pub window: Window,
    /// Scanned bounds before refinement; `None` when not refined.
    pub original_window: Option<Window>,
    /// Measured noise floor (RMS of the window), dBFS.
    pub floor_db: f64,
    pub peak_db: f64,
    pub crest_factor_db: f64,
    pub spectral: SpectralMetrics,
}

impl NoiseProfile {
    pub fn was_refined(&self) -> bool {
        self.original_window.is_some()
    }
}

/// Representative speech: the talker at their typical delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechProfile {
    /// Effective window (refined when refinement applied).
    pub window: Window,
    /// Scanned bounds before refinement; `None` when not refined.
    pub original_window: Option<Window>,
    /// RMS level of the window, dBFS.
    pub rms_db: f64,
    pub peak_db: f64,
    pub crest_factor_db: f64,
    pub voicing_density: f64,
    pub spectral: SpectralMetrics,
}

impl SpeechProfile {
    pub fn was_refined(&self) -> bool {
        self.original_window.is_some()
    }
}

/// Build the noise profile from the elected silence candidate.
///
/// Returns `None` when there is no candidate or it is not a silence one.
pub fn build_noise_profile(candidate: Option<&RegionCandidate>) -> Option<NoiseProfile> {
    let c = candidate?;
    if c.kind != RegionKind::Silence {
        log::warn!("noise profile requested from a {} candidate; ignoring it", c.kind);
        return None;
    }
    let m = c.effective_metrics();
    Some(NoiseProfile {
        window: c.effective_window(),
        original_window: c.original_window(),
        floor_db: m.rms_db,
        peak_db: m.peak_db,
        crest_factor_db: m.crest_factor_db,
        spectral: m.spectral,
    })
}

/// Build the speech profile from the elected speech candidate.
///
/// Returns `None` when there is no candidate or it is not a speech one.
pub fn build_speech_profile(candidate: Option<&RegionCandidate>) -> Option<SpeechProfile> {
    let c = candidate?;
    if c.kind != RegionKind::Speech {
        log::warn!("speech profile requested from a {} candidate; ignoring it", c.kind);
        return None;
    }
    let m = c.effective_metrics();
    Some(SpeechProfile {
        window: c.effective_window(),
        original_window: c.original_window(),
        rms_db: m.rms_db,
        peak_db: m.peak_db,
        crest_factor_db: m.crest_factor_db,
        voicing_density: m.voicing_density,
        spectral: m.spectral,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::region::{RegionMetrics, Refinement};

    fn candidate(kind: RegionKind, rms_db: f64) -> RegionCandidate {
        RegionCandidate::new(
            kind,
            Window::new(4.0, 3.0),
            16..28,
            RegionMetrics {
                rms_db,
                peak_db: rms_db + 12.0,
                crest_factor_db: 12.0,
                voicing_density: 0.75,
                ..Default::default()
            },
            0.4,
        )
    }

    #[test]
    fn none_in_none_out() {
        assert!(build_noise_profile(None).is_none());
        assert!(build_speech_profile(None).is_none());
    }

    #[test]
    fn noise_profile_takes_floor_from_rms() {
        let c = candidate(RegionKind::Silence, -62.0);
        let p = build_noise_profile(Some(&c)).unwrap();
        assert_eq!(p.floor_db, -62.0);
        assert_eq!(p.window, Window::new(4.0, 3.0));
        assert!(!p.was_refined());
    }

    #[test]
    fn speech_profile_carries_voicing() {
        let c = candidate(RegionKind::Speech, -26.0);
        let p = build_speech_profile(Some(&c)).unwrap();
        assert_eq!(p.rms_db, -26.0);
        assert_eq!(p.crest_factor_db, 12.0);
        assert_eq!(p.voicing_density, 0.75);
    }

    #[test]
    fn refined_candidate_exposes_both_windows() {
        let mut c = candidate(RegionKind::Silence, -58.0);
        c.refine(Refinement {
            window: Window::new(5.0, 1.0),
            frames: 20..24,
            metrics: RegionMetrics {
                rms_db: -66.0,
                ..Default::default()
            },
            score: 0.9,
        })
        .unwrap();

        let p = build_noise_profile(Some(&c)).unwrap();
        assert!(p.was_refined());
        assert_eq!(p.window, Window::new(5.0, 1.0));
        assert_eq!(p.original_window, Some(Window::new(4.0, 3.0)));
        assert_eq!(p.floor_db, -66.0);
    }

    #[test]
    fn wrong_class_is_rejected() {
        let speech = candidate(RegionKind::Speech, -20.0);
        assert!(build_noise_profile(Some(&speech)).is_none());
        let silence = candidate(RegionKind::Silence, -70.0);
        assert!(build_speech_profile(Some(&silence)).is_none());
    }
}
