//! Adaptive filter-chain derivation.
//!
//! [`AdaptiveConfigurator::configure`] resolves two reference levels once
//! (noise floor and speech level) and then folds the [`DERIVATIONS`] table:
//! each row fills one stage of the [`FilterChainConfig`] from the part of
//! the measurements it cares about.  The per-stage functions take plain
//! values so their thresholds can be tested on their own.
//!
//! | Reference | Source order |
//! |-----------|--------------|
//! | noise floor | noise profile → astats → pre-scan → −60 dBFS |
//! | speech level | speech profile RMS → integrated loudness → file RMS → −24 dBFS |

use crate::analysis::measurements::measured;
use crate::analysis::{db_to_linear, linear_to_db, AudioMeasurements, SpectralMetrics};
use crate::thresholds::Thresholds;

use super::filter_chain::{FilterChainConfig, NormalizationMode};

/// Noise floor assumed when nothing was measured, dBFS.
pub const FALLBACK_NOISE_FLOOR_DB: f64 = -60.0;

const HIGHPASS_BASE_HZ: f64 = 80.0;
const HIGHPASS_DARK_HZ: f64 = 70.0;
const HIGHPASS_PROXIMITY_HZ: f64 = 110.0;
const HIGHPASS_HUM_MIN_HZ: f64 = 90.0;

const GATE_OPEN_ABOVE_FLOOR_DB: f64 = 6.0;
const GATE_MIN_DB: f64 = -70.0;
const GATE_MAX_DB: f64 = -30.0;
/// Gate and expander thresholds stay at least this far below speech, dB.
const SPEECH_CLEARANCE_DB: f64 = 10.0;

const COMP_ABOVE_SPEECH_DB: f64 = 4.0;
const COMP_MIN_DB: f64 = -40.0;
const COMP_MAX_DB: f64 = -10.0;
const COMP_MODERATE_LRA_LU: f64 = 12.0;
const COMP_MAX_MAKEUP_DB: f64 = 6.0;

const DEESS_MIN_CENTROID_HZ: f64 = 2500.0;
const DEESS_CENTROID_SPAN_HZ: f64 = 1500.0;
const DEESS_MIN_ROLLOFF_HZ: f64 = 6000.0;
const DEESS_ROLLOFF_SPAN_HZ: f64 = 4000.0;

const SPEECHNORM_MAX_EXPANSION: f64 = 10.0;
const SPEECHNORM_NOISY_MAX_EXPANSION: f64 = 3.0;

/// Floor rise above the moderate cutoff at which the neural mix reaches 1.0, dB.
const NEURAL_STRENGTH_SPAN_DB: f64 = 20.0;

const PATCH_STRENGTH: f64 = 0.002;
const PATCH_HUM_STRENGTH: f64 = 0.005;
const PATCH_ABOVE_FLOOR_DB: f64 = 3.0;

fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Ratio ladder shared by the gate and the expander.
fn ratio_for_floor(t: &Thresholds, floor_db: f64) -> f64 {
    if floor_db > t.noise_high_db {
        4.0
    } else if floor_db > t.noise_moderate_db {
        3.0
    } else {
        2.0
    }
}

// ---------------------------------------------------------------------------
// Reference levels
// ---------------------------------------------------------------------------

/// Noise floor every derivation works from, dBFS.
pub fn noise_floor_reference(m: &AudioMeasurements) -> f64 {
    m.noise_floor_db()
        .or_else(|| measured(m.noise.prescan_floor_db))
        .unwrap_or(FALLBACK_NOISE_FLOOR_DB)
}

/// Typical speech level every derivation works from, dBFS (or LUFS when
/// only integrated loudness is available).
pub fn speech_level_reference(t: &Thresholds, m: &AudioMeasurements) -> f64 {
    match &m.speech_profile {
        Some(p) => p.rms_db,
        None => measured(m.loudness.integrated_lufs)
            .or_else(|| measured(m.amplitude.rms_db))
            .unwrap_or(t.speech_target_rms_db),
    }
}

// ---------------------------------------------------------------------------
// DerivationContext
// ---------------------------------------------------------------------------

/// Everything a derivation row may read.
pub struct DerivationContext<'a> {
    pub thresholds: &'a Thresholds,
    pub measurements: &'a AudioMeasurements,
    pub noise_floor_db: f64,
    pub speech_level_db: f64,
}

impl<'a> DerivationContext<'a> {
    pub fn new(thresholds: &'a Thresholds, measurements: &'a AudioMeasurements) -> Self {
        Self {
            thresholds,
            measurements,
            noise_floor_db: noise_floor_reference(measurements),
            speech_level_db: speech_level_reference(thresholds, measurements),
        }
    }

    fn speech_spectral(&self) -> &SpectralMetrics {
        self.measurements.speech_spectral()
    }

    /// Tonal hum in the elected silence; same test as the mains-hum tip.
    fn tonal_hum(&self) -> bool {
        self.measurements.noise_profile.as_ref().is_some_and(|p| {
            self.thresholds
                .is_tonal_hum(p.spectral.entropy, p.spectral.flatness, p.floor_db)
        })
    }

    /// Loudest speech peak available, dBFS.
    fn speech_peak_db(&self) -> f64 {
        let m = self.measurements;
        match &m.speech_profile {
            Some(p) => p.peak_db,
            None => measured(m.amplitude.peak_db)
                .or_else(|| measured(m.loudness.true_peak_dbtp))
                .unwrap_or(self.speech_level_db),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-stage rules
// ---------------------------------------------------------------------------

/// Highpass cutoff, Hz.
pub fn highpass_hz(t: &Thresholds, speech: &SpectralMetrics, tonal_hum: bool) -> f64 {
    let mut hz = HIGHPASS_BASE_HZ;
    if speech.centroid > 0.0 && speech.centroid < t.dark_centroid_hz {
        hz = HIGHPASS_DARK_HZ;
    }
    if t.is_proximity_effect(speech.decrease, speech.skewness) {
        hz = HIGHPASS_PROXIMITY_HZ;
    }
    if tonal_hum {
        hz = hz.max(HIGHPASS_HUM_MIN_HZ);
    }
    hz
}

/// Gate threshold as linear amplitude.
///
/// `suggested` is the collaborator's linear suggestion; `0.0` means none.
pub fn gate_threshold(suggested: f64, floor_db: f64, speech_db: f64) -> f64 {
    let raw_db = if suggested > 0.0 && suggested.is_finite() {
        linear_to_db(suggested)
    } else {
        floor_db + GATE_OPEN_ABOVE_FLOOR_DB
    };
    let db = raw_db
        .clamp(GATE_MIN_DB, GATE_MAX_DB)
        .min(speech_db - SPEECH_CLEARANCE_DB);
    db_to_linear(db)
}

/// Gate ratio by noise floor.
pub fn gate_ratio(t: &Thresholds, floor_db: f64) -> f64 {
    ratio_for_floor(t, floor_db)
}

/// Gate `(attack, release)` in ms.
pub fn gate_timing_ms(t: &Thresholds, floor_db: f64, crest_db: Option<f64>) -> (f64, f64) {
    let attack = if crest_db.is_some_and(|c| c > t.crest_high_db) {
        5.0
    } else {
        10.0
    };
    let release = if floor_db > t.noise_moderate_db {
        300.0
    } else {
        200.0
    };
    (attack, release)
}

/// Compressor threshold, dBFS.
pub fn comp_threshold_db(speech_db: f64) -> f64 {
    (speech_db + COMP_ABOVE_SPEECH_DB).clamp(COMP_MIN_DB, COMP_MAX_DB)
}

/// Compressor ratio by loudness range; already-compressed material gets 1.5.
pub fn comp_ratio(t: &Thresholds, range_lu: f64, crest_db: Option<f64>) -> f64 {
    if crest_db.is_some_and(|c| c < t.crest_low_db) {
        return 1.5;
    }
    if range_lu > t.loudness_range_high_lu {
        4.0
    } else if range_lu > COMP_MODERATE_LRA_LU {
        3.0
    } else {
        2.0
    }
}

/// Compressor `(attack, release)` in ms.
pub fn comp_timing_ms(t: &Thresholds, range_lu: f64, crest_db: Option<f64>) -> (f64, f64) {
    let attack = if crest_db.is_some_and(|c| c > t.crest_high_db) {
        5.0
    } else {
        20.0
    };
    let release = if range_lu > t.loudness_range_high_lu {
        250.0
    } else {
        150.0
    };
    (attack, release)
}

/// Makeup gain: half the gain reduction the loudest peak would see.
pub fn comp_makeup_db(peak_db: f64, threshold_db: f64, ratio: f64) -> f64 {
    let overshoot = (peak_db - threshold_db).max(0.0);
    let reduction = overshoot * (1.0 - 1.0 / ratio.max(1.0));
    (reduction / 2.0).clamp(0.0, COMP_MAX_MAKEUP_DB)
}

/// De-esser intensity, 0–1.
pub fn deess_intensity(t: &Thresholds, speech: &SpectralMetrics) -> f64 {
    if speech.centroid < DEESS_MIN_CENTROID_HZ {
        return 0.0;
    }
    let mut intensity = 0.4 * unit((speech.centroid - DEESS_MIN_CENTROID_HZ) / DEESS_CENTROID_SPAN_HZ)
        + 0.3 * unit((speech.rolloff - DEESS_MIN_ROLLOFF_HZ) / DEESS_ROLLOFF_SPAN_HZ);
    if t.is_bright(speech.centroid, speech.rolloff) {
        intensity += 0.2;
    }
    intensity.min(1.0)
}

/// Expander ratio; 1.0 when the floor is already inaudible.
pub fn nr_expansion(t: &Thresholds, floor_db: f64, headroom_db: Option<f64>) -> f64 {
    if floor_db <= t.noise_audible_db {
        return 1.0;
    }
    let ratio = ratio_for_floor(t, floor_db);
    match headroom_db {
        Some(h) if h < t.snr_poor_db => ratio.min(2.0),
        _ => ratio,
    }
}

/// Expander threshold, dBFS.
pub fn nr_threshold_db(floor_db: f64, speech_db: f64) -> f64 {
    (floor_db + GATE_OPEN_ABOVE_FLOOR_DB).min(speech_db - SPEECH_CLEARANCE_DB)
}

/// Speechnorm expansion factor (linear gain toward the speech RMS target).
pub fn speechnorm_expansion(t: &Thresholds, speech_db: f64, floor_db: f64) -> f64 {
    let gain = db_to_linear(t.speech_target_rms_db - speech_db).clamp(1.0, SPEECHNORM_MAX_EXPANSION);
    if floor_db > t.noise_moderate_db {
        gain.min(SPEECHNORM_NOISY_MAX_EXPANSION)
    } else {
        gain
    }
}

/// Neural denoiser `(enabled, strength)` for broadband noise above the
/// moderate cutoff.  `flatness` is the noise profile's, `None` without one.
pub fn neural_denoise(t: &Thresholds, floor_db: f64, flatness: Option<f64>) -> (bool, f64) {
    let broadband = flatness.map_or(true, |f| f >= t.tonal_flatness_max);
    if floor_db <= t.noise_moderate_db || !broadband {
        return (false, 0.0);
    }
    let strength = 0.5 + 0.5 * unit((floor_db - t.noise_moderate_db) / NEURAL_STRENGTH_SPAN_DB);
    (true, strength)
}

/// Patch-based denoiser `(enabled, strength)`.
pub fn patch_denoise(t: &Thresholds, tonal_hum: bool, headroom_db: Option<f64>) -> (bool, f64) {
    let low_snr = headroom_db.is_some_and(|h| h > 0.0 && h < t.snr_margin_db);
    if tonal_hum {
        (true, PATCH_HUM_STRENGTH)
    } else if low_snr {
        (true, PATCH_STRENGTH)
    } else {
        (false, 0.0)
    }
}

// ---------------------------------------------------------------------------
// Derivation table
// ---------------------------------------------------------------------------

/// One row of the derivation table.
pub struct Derivation {
    pub name: &'static str,
    pub apply: fn(&DerivationContext<'_>, &mut FilterChainConfig),
}

/// Stage derivations, applied in order.  Rows write disjoint fields, except
/// that the makeup row reads the compressor threshold and ratio.
pub static DERIVATIONS: &[Derivation] = &[
    Derivation {
        name: "highpass",
        apply: |ctx, cfg| {
            cfg.highpass_hz = highpass_hz(ctx.thresholds, ctx.speech_spectral(), ctx.tonal_hum());
        },
    },
    Derivation {
        name: "gate",
        apply: |ctx, cfg| {
            let t = ctx.thresholds;
            let m = ctx.measurements;
            cfg.gate_threshold = gate_threshold(
                m.noise.suggested_gate_threshold,
                ctx.noise_floor_db,
                ctx.speech_level_db,
            );
            cfg.gate_ratio = gate_ratio(t, ctx.noise_floor_db);
            (cfg.gate_attack_ms, cfg.gate_release_ms) =
                gate_timing_ms(t, ctx.noise_floor_db, m.crest_factor_db());
        },
    },
    Derivation {
        name: "compressor",
        apply: |ctx, cfg| {
            let t = ctx.thresholds;
            let m = ctx.measurements;
            let crest = m.crest_factor_db();
            cfg.comp_threshold_db = comp_threshold_db(ctx.speech_level_db);
            cfg.comp_ratio = comp_ratio(t, m.loudness.range_lu, crest);
            (cfg.comp_attack_ms, cfg.comp_release_ms) =
                comp_timing_ms(t, m.loudness.range_lu, crest);
        },
    },
    Derivation {
        name: "makeup",
        apply: |ctx, cfg| {
            cfg.comp_makeup_db =
                comp_makeup_db(ctx.speech_peak_db(), cfg.comp_threshold_db, cfg.comp_ratio);
        },
    },
    Derivation {
        name: "deesser",
        apply: |ctx, cfg| {
            cfg.deess_intensity = deess_intensity(ctx.thresholds, ctx.speech_spectral());
        },
    },
    Derivation {
        name: "expander",
        apply: |ctx, cfg| {
            cfg.nr_expansion = nr_expansion(
                ctx.thresholds,
                ctx.noise_floor_db,
                ctx.measurements.headroom_db(),
            );
            cfg.nr_threshold_db = nr_threshold_db(ctx.noise_floor_db, ctx.speech_level_db);
        },
    },
    Derivation {
        name: "loudness",
        apply: |ctx, cfg| {
            let t = ctx.thresholds;
            cfg.target_lufs = t.target_lufs;
            cfg.normalization_mode = if ctx.measurements.speech_profile.is_some() {
                NormalizationMode::Speechnorm
            } else {
                NormalizationMode::Dynaudnorm
            };
            cfg.speechnorm_expansion =
                speechnorm_expansion(t, ctx.speech_level_db, ctx.noise_floor_db);
            cfg.speechnorm_rms_target = db_to_linear(t.speech_target_rms_db);
        },
    },
    Derivation {
        name: "neural_denoise",
        apply: |ctx, cfg| {
            let flatness = ctx
                .measurements
                .noise_profile
                .as_ref()
                .map(|p| p.spectral.flatness);
            (cfg.neural_denoise_enabled, cfg.neural_denoise_strength) =
                neural_denoise(ctx.thresholds, ctx.noise_floor_db, flatness);
            cfg.neural_denoise_threshold_db = ctx.noise_floor_db;
        },
    },
    Derivation {
        name: "patch_denoise",
        apply: |ctx, cfg| {
            (cfg.patch_denoise_enabled, cfg.patch_denoise_strength) = patch_denoise(
                ctx.thresholds,
                ctx.tonal_hum(),
                ctx.measurements.headroom_db(),
            );
            cfg.patch_denoise_threshold_db = ctx.noise_floor_db + PATCH_ABOVE_FLOOR_DB;
        },
    },
];

// ---------------------------------------------------------------------------
// AdaptiveConfigurator
// ---------------------------------------------------------------------------

/// Maps [`AudioMeasurements`] to a [`FilterChainConfig`].
///
/// ```rust
/// use voice_autoclean::analysis::AudioMeasurements;
/// use voice_autoclean::configurator::AdaptiveConfigurator;
/// use voice_autoclean::thresholds::Thresholds;
///
/// let configurator = AdaptiveConfigurator::new(Thresholds::default());
/// let config = configurator.configure(&AudioMeasurements::default());
/// assert_eq!(config.target_lufs, -18.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AdaptiveConfigurator {
    thresholds: Thresholds,
}

impl AdaptiveConfigurator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Derive the full chain.  Total and deterministic.
    pub fn configure(&self, measurements: &AudioMeasurements) -> FilterChainConfig {
        let ctx = DerivationContext::new(&self.thresholds, measurements);
        log::debug!(
            "configure: floor {:.1} dB, speech {:.1} dB (noise profile: {}, speech profile: {})",
            ctx.noise_floor_db,
            ctx.speech_level_db,
            measurements.noise_profile.is_some(),
            measurements.speech_profile.is_some()
        );

        let mut config = FilterChainConfig {
            thresholds_version: self.thresholds.version(),
            ..Default::default()
        };
        for row in DERIVATIONS {
            (row.apply)(&ctx, &mut config);
            log::trace!("configure: applied {}", row.name);
        }
        log::debug!(
            "configure: gate {:.1} dBFS, de-esser {}, expander {}, {:?}",
            config.gate_threshold_db(),
            if config.deess_enabled() { "on" } else { "off" },
            if config.expander_enabled() { "on" } else { "off" },
            config.normalization_mode
        );
        config
    }
}

/// Configure with the default thresholds.
pub fn configure(measurements: &AudioMeasurements) -> FilterChainConfig {
    AdaptiveConfigurator::default().configure(measurements)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{NoiseProfile, SpeechProfile, Window};

    const T: Thresholds = Thresholds::STANDARD;

    fn noise_profile(floor_db: f64, entropy: f64, flatness: f64) -> NoiseProfile {
        NoiseProfile {
            window: Window::new(1.0, 1.0),
            original_window: None,
            floor_db,
            peak_db: floor_db + 8.0,
            crest_factor_db: 8.0,
            spectral: SpectralMetrics {
                entropy,
                flatness,
                ..Default::default()
            },
        }
    }

    fn speech_profile(rms_db: f64, crest_db: f64) -> SpeechProfile {
        SpeechProfile {
            window: Window::new(4.0, 3.0),
            original_window: None,
            rms_db,
            peak_db: rms_db + crest_db,
            crest_factor_db: crest_db,
            voicing_density: 0.9,
            spectral: SpectralMetrics {
                centroid: 2000.0,
                rolloff: 5000.0,
                ..Default::default()
            },
        }
    }

    fn typical() -> AudioMeasurements {
        let mut m = AudioMeasurements::default();
        m.loudness.integrated_lufs = -22.0;
        m.loudness.true_peak_dbtp = -3.0;
        m.loudness.range_lu = 10.0;
        m.amplitude.rms_db = -24.0;
        m.amplitude.crest_factor_db = 14.0;
        m.noise.reduction_headroom_db = 38.0;
        m.noise_profile = Some(noise_profile(-62.0, 0.6, 0.5));
        m.speech_profile = Some(speech_profile(-24.0, 14.0));
        m
    }

    #[test]
    fn configure_is_deterministic() {
        let m = typical();
        let c = AdaptiveConfigurator::new(T);
        assert_eq!(c.configure(&m), c.configure(&m));
    }

    #[test]
    fn injected_table_version_is_stamped() {
        let custom = Thresholds {
            version: 3,
            ..Thresholds::STANDARD
        };
        let c = AdaptiveConfigurator::new(custom);
        assert_eq!(c.thresholds().version(), 3);
        assert_eq!(c.configure(&typical()).thresholds_version, 3);
    }

    #[test]
    fn empty_measurements_still_yield_a_complete_chain() {
        let cfg = configure(&AudioMeasurements::default());
        assert_eq!(cfg.highpass_hz, 80.0);
        assert!(cfg.gate_threshold > 0.0);
        assert!(cfg.gate_ratio >= 2.0);
        assert!(cfg.comp_ratio >= 1.5);
        assert_eq!(cfg.target_lufs, -18.0);
        assert_eq!(cfg.normalization_mode, NormalizationMode::Dynaudnorm);
        assert_eq!(cfg.nr_threshold_db, FALLBACK_NOISE_FLOOR_DB + 6.0);
        assert!(cfg.speechnorm_expansion >= 1.0);
        assert!(!cfg.neural_denoise_enabled);
        assert!(!cfg.patch_denoise_enabled);
        assert_eq!(cfg.thresholds_version, Thresholds::VERSION);
    }

    #[test]
    fn reference_levels_fall_back_in_order() {
        let mut m = AudioMeasurements::default();
        assert_eq!(noise_floor_reference(&m), -60.0);
        m.noise.prescan_floor_db = -58.0;
        assert_eq!(noise_floor_reference(&m), -58.0);
        m.noise.floor_db = -52.0;
        assert_eq!(noise_floor_reference(&m), -52.0);
        m.noise_profile = Some(noise_profile(-66.0, 0.5, 0.5));
        assert_eq!(noise_floor_reference(&m), -66.0);

        let mut m = AudioMeasurements::default();
        assert_eq!(speech_level_reference(&T, &m), -24.0);
        m.amplitude.rms_db = -31.0;
        assert_eq!(speech_level_reference(&T, &m), -31.0);
        m.loudness.integrated_lufs = -27.0;
        assert_eq!(speech_level_reference(&T, &m), -27.0);
        m.speech_profile = Some(speech_profile(-29.0, 12.0));
        assert_eq!(speech_level_reference(&T, &m), -29.0);
    }

    #[test]
    fn speech_profile_selects_speechnorm() {
        let cfg = configure(&typical());
        assert_eq!(cfg.normalization_mode, NormalizationMode::Speechnorm);
        assert!((cfg.speechnorm_rms_target - db_to_linear(-24.0)).abs() < 1e-12);
        assert_eq!(cfg.speechnorm_expansion, 1.0);
    }

    #[test]
    fn highpass_cases() {
        let neutral = SpectralMetrics {
            centroid: 2000.0,
            ..Default::default()
        };
        assert_eq!(highpass_hz(&T, &neutral, false), 80.0);
        assert_eq!(highpass_hz(&T, &neutral, true), 90.0);

        let dark = SpectralMetrics {
            centroid: 1200.0,
            ..Default::default()
        };
        assert_eq!(highpass_hz(&T, &dark, false), 70.0);
        assert_eq!(highpass_hz(&T, &dark, true), 90.0);

        let boomy = SpectralMetrics {
            centroid: 1200.0,
            decrease: -0.2,
            ..Default::default()
        };
        assert_eq!(highpass_hz(&T, &boomy, true), 110.0);
    }

    #[test]
    fn gate_threshold_is_clamped_and_clears_speech() {
        let db = |lin: f64| linear_to_db(lin);
        // Floor + 6.
        assert!((db(gate_threshold(0.0, -60.0, -20.0)) + 54.0).abs() < 1e-9);
        // Clamp range.
        assert!((db(gate_threshold(0.0, -90.0, -20.0)) + 70.0).abs() < 1e-9);
        assert!((db(gate_threshold(0.0, -30.0, 0.0)) + 30.0).abs() < 1e-9);
        // 10 dB under speech.
        assert!((db(gate_threshold(0.0, -50.0, -50.0)) + 60.0).abs() < 1e-9);
        // Suggested value wins when present.
        assert!((db(gate_threshold(db_to_linear(-48.0), -60.0, -20.0)) + 48.0).abs() < 1e-9);
    }

    #[test]
    fn gate_and_expander_ladders() {
        assert_eq!(gate_ratio(&T, -40.0), 4.0);
        assert_eq!(gate_ratio(&T, -50.0), 3.0);
        assert_eq!(gate_ratio(&T, -60.0), 2.0);
        assert_eq!(gate_timing_ms(&T, -60.0, Some(12.0)), (10.0, 200.0));
        assert_eq!(gate_timing_ms(&T, -50.0, Some(22.0)), (5.0, 300.0));

        assert_eq!(nr_expansion(&T, -70.0, None), 1.0);
        assert_eq!(nr_expansion(&T, -65.0, None), 1.0);
        assert_eq!(nr_expansion(&T, -40.0, None), 4.0);
        assert_eq!(nr_expansion(&T, -40.0, Some(8.0)), 2.0);
        assert_eq!(nr_expansion(&T, -60.0, Some(30.0)), 2.0);
        assert_eq!(nr_threshold_db(-60.0, -24.0), -54.0);
        assert_eq!(nr_threshold_db(-40.0, -45.0), -55.0);
    }

    #[test]
    fn compressor_rules() {
        assert_eq!(comp_threshold_db(-24.0), -20.0);
        assert_eq!(comp_threshold_db(-60.0), -40.0);
        assert_eq!(comp_threshold_db(-2.0), -10.0);

        assert_eq!(comp_ratio(&T, 20.0, Some(12.0)), 4.0);
        assert_eq!(comp_ratio(&T, 14.0, Some(12.0)), 3.0);
        assert_eq!(comp_ratio(&T, 8.0, None), 2.0);
        assert_eq!(comp_ratio(&T, 20.0, Some(5.0)), 1.5);

        assert_eq!(comp_timing_ms(&T, 20.0, Some(25.0)), (5.0, 250.0));
        assert_eq!(comp_timing_ms(&T, 10.0, Some(12.0)), (20.0, 150.0));

        // 12 dB over a 2:1 threshold → 6 dB reduction → 3 dB makeup.
        assert_eq!(comp_makeup_db(-8.0, -20.0, 2.0), 3.0);
        assert_eq!(comp_makeup_db(-30.0, -20.0, 4.0), 0.0);
        assert_eq!(comp_makeup_db(10.0, -40.0, 4.0), 6.0);
    }

    #[test]
    fn deesser_scales_with_brightness() {
        let dull = SpectralMetrics {
            centroid: 2400.0,
            rolloff: 12_000.0,
            ..Default::default()
        };
        assert_eq!(deess_intensity(&T, &dull), 0.0);

        let mid = SpectralMetrics {
            centroid: 3250.0,
            rolloff: 8000.0,
            ..Default::default()
        };
        assert!((deess_intensity(&T, &mid) - 0.35).abs() < 1e-9);

        let bright = SpectralMetrics {
            centroid: 4500.0,
            rolloff: 11_000.0,
            ..Default::default()
        };
        assert!((deess_intensity(&T, &bright) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn speechnorm_expansion_is_capped_in_noise() {
        // 12 dB short of target → ~3.98x.
        let quiet = speechnorm_expansion(&T, -36.0, -70.0);
        assert!((quiet - db_to_linear(12.0)).abs() < 1e-9);
        assert_eq!(speechnorm_expansion(&T, -36.0, -50.0), 3.0);
        assert_eq!(speechnorm_expansion(&T, -70.0, -80.0), 10.0);
        assert_eq!(speechnorm_expansion(&T, -10.0, -80.0), 1.0);
    }

    #[test]
    fn neural_denoise_needs_loud_broadband_noise() {
        assert_eq!(neural_denoise(&T, -60.0, None), (false, 0.0));
        assert_eq!(neural_denoise(&T, -50.0, Some(0.1)), (false, 0.0));
        let (on, strength) = neural_denoise(&T, -45.0, Some(0.5));
        assert!(on);
        assert!((strength - 0.75).abs() < 1e-9);
        assert_eq!(neural_denoise(&T, -20.0, None), (true, 1.0));
    }

    #[test]
    fn patch_denoise_triggers() {
        assert_eq!(patch_denoise(&T, true, None), (true, 0.005));
        assert_eq!(patch_denoise(&T, false, Some(12.0)), (true, 0.002));
        assert_eq!(patch_denoise(&T, false, Some(25.0)), (false, 0.0));
        assert_eq!(patch_denoise(&T, false, None), (false, 0.0));
    }

    #[test]
    fn hum_in_noise_profile_drives_highpass_and_patch() {
        let mut m = typical();
        m.noise_profile = Some(noise_profile(-58.0, 0.2, 0.1));
        let cfg = configure(&m);
        assert_eq!(cfg.highpass_hz, 90.0);
        assert!(cfg.patch_denoise_enabled);
        assert_eq!(cfg.patch_denoise_strength, 0.005);
        assert_eq!(cfg.patch_denoise_threshold_db, -55.0);
        assert!(!cfg.neural_denoise_enabled);
    }

    #[test]
    fn derivation_names_are_unique() {
        let mut names: Vec<_> = DERIVATIONS.iter().map(|d| d.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DERIVATIONS.len());
    }
}
