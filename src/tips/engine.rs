//! Tip evaluation: rules → exclusions → priority sort → truncate.
//!
//! ```text
//! RULES ──▶ fired tips ──▶ EXCLUSIONS (by fired rule ids) ──▶ stable sort by priority ──▶ top 5
//! ```

use std::collections::HashSet;

use crate::analysis::AudioMeasurements;
use crate::configurator::FilterChainConfig;
use crate::thresholds::Thresholds;

use super::rules::{RecordingTip, RuleId, TipContext, RULES};

/// Upper bound on tips returned per file.
pub const MAX_RECORDING_TIPS: usize = 5;

// ---------------------------------------------------------------------------
// Exclusion table
// ---------------------------------------------------------------------------

/// Drop `drop` tips when `when_fired` fired, unless `unless_fired` fired too.
pub struct Exclusion {
    pub drop: &'static [RuleId],
    pub when_fired: RuleId,
    pub unless_fired: Option<RuleId>,
}

const LEVEL_LOW: &[RuleId] = &[RuleId::LevelTooQuiet, RuleId::LevelQuiet];

/// Overlaps between rules.  A quiet average with loud peaks (high crest
/// factor) is a compound problem, so clipping alone does not hide the level
/// tip in that case.
pub static EXCLUSIONS: &[Exclusion] = &[
    Exclusion {
        drop: LEVEL_LOW,
        when_fired: RuleId::TooFarFromMic,
        unless_fired: None,
    },
    Exclusion {
        drop: LEVEL_LOW,
        when_fired: RuleId::LevelClipping,
        unless_fired: Some(RuleId::HighCrestFactor),
    },
    Exclusion {
        drop: LEVEL_LOW,
        when_fired: RuleId::LevelNearClipping,
        unless_fired: Some(RuleId::HighCrestFactor),
    },
    Exclusion {
        drop: &[RuleId::PoorSnr],
        when_fired: RuleId::TooFarFromMic,
        unless_fired: None,
    },
];

impl Exclusion {
    fn excludes(&self, rule: RuleId, fired: &HashSet<RuleId>) -> bool {
        self.drop.contains(&rule)
            && fired.contains(&self.when_fired)
            && !self.unless_fired.is_some_and(|u| fired.contains(&u))
    }
}

// ---------------------------------------------------------------------------
// TipEngine
// ---------------------------------------------------------------------------

/// Turns measurements into at most [`MAX_RECORDING_TIPS`] ordered tips.
///
/// ```rust
/// use voice_autoclean::analysis::AudioMeasurements;
/// use voice_autoclean::tips::{RuleId, TipEngine};
///
/// let mut m = AudioMeasurements::default();
/// m.loudness.integrated_lufs = -35.0;
/// m.loudness.true_peak_dbtp = -10.0;
///
/// let tips = TipEngine::default().evaluate(Some(&m), None);
/// assert_eq!(tips[0].rule_id, RuleId::LevelTooQuiet);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TipEngine {
    thresholds: Thresholds,
}

impl TipEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Evaluate every rule.  `None` measurements yield no tips.
    pub fn evaluate(
        &self,
        measurements: Option<&AudioMeasurements>,
        config: Option<&FilterChainConfig>,
    ) -> Vec<RecordingTip> {
        let Some(measurements) = measurements else {
            return Vec::new();
        };
        let ctx = TipContext {
            thresholds: &self.thresholds,
            measurements,
            config,
        };

        let fired_tips: Vec<RecordingTip> =
            RULES.iter().filter_map(|rule| (rule.evaluate)(&ctx)).collect();
        let fired: HashSet<RuleId> = fired_tips.iter().map(|t| t.rule_id).collect();

        let mut tips: Vec<RecordingTip> = fired_tips
            .into_iter()
            .filter(|tip| {
                let excluded = EXCLUSIONS.iter().any(|e| e.excludes(tip.rule_id, &fired));
                if excluded {
                    log::debug!("tips: {} suppressed by exclusion", tip.rule_id);
                }
                !excluded
            })
            .collect();

        // Stable: equal priorities keep registration order.
        tips.sort_by(|a, b| b.priority.cmp(&a.priority));
        tips.truncate(MAX_RECORDING_TIPS);
        tips
    }
}

/// Evaluate with the default thresholds.
pub fn evaluate_tips(
    measurements: Option<&AudioMeasurements>,
    config: Option<&FilterChainConfig>,
) -> Vec<RecordingTip> {
    TipEngine::default().evaluate(measurements, config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{NoiseProfile, SpectralMetrics, SpeechProfile, Window};
    use crate::configurator::configure;

    fn ids(tips: &[RecordingTip]) -> Vec<RuleId> {
        tips.iter().map(|t| t.rule_id).collect()
    }

    fn file(integrated: f64, true_peak: f64, crest: f64) -> AudioMeasurements {
        let mut m = AudioMeasurements::default();
        m.loudness.integrated_lufs = integrated;
        m.loudness.true_peak_dbtp = true_peak;
        m.amplitude.crest_factor_db = crest;
        m
    }

    fn speech(rms_db: f64, crest_db: f64, spectral: SpectralMetrics) -> SpeechProfile {
        SpeechProfile {
            window: Window::new(3.0, 4.0),
            original_window: None,
            rms_db,
            peak_db: rms_db + crest_db,
            crest_factor_db: crest_db,
            voicing_density: 0.85,
            spectral,
        }
    }

    fn noise(floor_db: f64, entropy: f64, flatness: f64) -> NoiseProfile {
        NoiseProfile {
            window: Window::new(0.5, 1.0),
            original_window: None,
            floor_db,
            peak_db: floor_db + 9.0,
            crest_factor_db: 9.0,
            spectral: SpectralMetrics {
                entropy,
                flatness,
                ..Default::default()
            },
        }
    }

    /// A recording with nothing to complain about.
    fn clean() -> AudioMeasurements {
        let mut m = file(-20.0, -3.0, 12.0);
        m.loudness.range_lu = 8.0;
        m.noise.floor_db = -62.0;
        m.noise.reduction_headroom_db = 40.0;
        m.spectral = SpectralMetrics {
            centroid: 2200.0,
            rolloff: 6000.0,
            ..Default::default()
        };
        m
    }

    #[test]
    fn none_measurements_give_no_tips() {
        assert!(evaluate_tips(None, None).is_empty());
    }

    #[test]
    fn clean_recording_gives_no_tips() {
        let m = clean();
        let config = configure(&m);
        assert!(evaluate_tips(Some(&m), Some(&config)).is_empty());
    }

    #[test]
    fn clean_boundaries_stay_silent() {
        for (integrated, peak, lra, floor, crest, headroom) in [
            (-24.0, -1.0, 18.0, -55.0, 6.0, 10.0),
            (-10.0, -4.0, 0.5, -80.0, 20.0, 60.0),
        ] {
            let mut m = file(integrated, peak, crest);
            m.loudness.range_lu = lra;
            m.noise.floor_db = floor;
            m.noise.reduction_headroom_db = headroom;
            let tips = evaluate_tips(Some(&m), None);
            assert!(tips.is_empty(), "{:?}", ids(&tips));
        }
    }

    #[test]
    fn scenario_quiet_with_headroom_limit() {
        let tips = evaluate_tips(Some(&file(-35.0, -10.0, 12.0)), None);
        let level = tips
            .iter()
            .find(|t| t.rule_id == RuleId::LevelTooQuiet)
            .expect("level_too_quiet");
        assert!(level.message.contains("17 dB"), "{}", level.message);
    }

    #[test]
    fn scenario_clipping_hides_quiet_level() {
        let tips = evaluate_tips(Some(&file(-35.0, 0.5, 12.0)), None);
        let clip = tips
            .iter()
            .find(|t| t.rule_id == RuleId::LevelClipping)
            .expect("level_clipping");
        assert!(clip.message.contains("Clipping while quiet"));
        assert!(!ids(&tips).contains(&RuleId::LevelTooQuiet));
    }

    #[test]
    fn scenario_crest_factor_keeps_both() {
        let ids = ids(&evaluate_tips(Some(&file(-35.0, 0.5, 25.0)), None));
        assert!(ids.contains(&RuleId::LevelClipping));
        assert!(ids.contains(&RuleId::LevelTooQuiet));
        assert!(ids.contains(&RuleId::HighCrestFactor));
    }

    #[test]
    fn near_clipping_also_hides_quiet_level() {
        let ids = ids(&evaluate_tips(Some(&file(-26.0, -0.5, 12.0)), None));
        assert!(ids.contains(&RuleId::LevelNearClipping));
        assert!(!ids.contains(&RuleId::LevelQuiet));
    }

    #[test]
    fn too_far_from_mic_suppresses_level_and_snr() {
        let mut m = file(-38.0, -12.0, 12.0);
        m.noise_profile = Some(noise(-60.0, 0.7, 0.6));
        m.speech_profile = Some(speech(-52.0, 12.0, SpectralMetrics::default()));
        m.noise.reduction_headroom_db = 8.0;

        let ids = ids(&evaluate_tips(Some(&m), None));
        assert!(ids.contains(&RuleId::TooFarFromMic));
        assert!(!ids.contains(&RuleId::LevelTooQuiet));
        assert!(!ids.contains(&RuleId::LevelQuiet));
        assert!(!ids.contains(&RuleId::PoorSnr));
    }

    #[test]
    fn everything_wrong_keeps_top_five_in_order() {
        let bright_boomy = SpectralMetrics {
            centroid: 4500.0,
            rolloff: 11_000.0,
            decrease: -0.2,
            ..Default::default()
        };
        let mut m = file(-35.0, 0.5, 25.0);
        m.loudness.range_lu = 22.0;
        m.noise_profile = Some(noise(-40.0, 0.2, 0.1));
        m.speech_profile = Some(speech(-45.0, 25.0, bright_boomy));
        m.noise.reduction_headroom_db = 5.0;
        let config = configure(&m);
        assert!(config.deess_intensity > 0.5);

        let tips = evaluate_tips(Some(&m), Some(&config));
        assert_eq!(tips.len(), MAX_RECORDING_TIPS);
        assert_eq!(
            ids(&tips),
            vec![
                RuleId::LevelClipping,
                RuleId::BackgroundNoiseHigh,
                RuleId::TooFarFromMic,
                RuleId::MainsHum,
                RuleId::HighCrestFactor,
            ]
        );
        assert!(tips.windows(2).all(|w| w[0].priority >= w[1].priority));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let m = file(-35.0, 0.5, 25.0);
        assert_eq!(evaluate_tips(Some(&m), None), evaluate_tips(Some(&m), None));
    }
}
