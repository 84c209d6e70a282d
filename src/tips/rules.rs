//! Recording-technique rules.
//!
//! Each rule looks at its own slice of the measurements and returns at most
//! one [`RecordingTip`].  Rules never see each other's output; overlap
//! between them is resolved afterwards by the exclusion table in
//! [`engine`](super::engine).
//!
//! | Rule | Priority | Fires when |
//! |------|----------|------------|
//! | `level_too_quiet` / `level_quiet` | 10 / 8 | speech RMS < −42 / −36 dBFS (else integrated < −30 / −24 LUFS) |
//! | `level_clipping` / `level_near_clipping` | 10 / 9 | true peak > 0 / > −1 dBTP |
//! | `background_noise_high` / `_moderate` | 9 / 6 | noise floor > −45 / −55 dBFS |
//! | `mains_hum` | 7 | tonal noise profile above −65 dBFS |
//! | `too_far_from_mic` | 8 | headroom < 15 dB and speech RMS < −30 dBFS |
//! | `proximity_effect` | 5 | bass build-up in the spectral decrease |
//! | `sibilance` | 4 | de-ess > 0.5 and a bright spectrum |
//! | `dynamic_range` | 5 | loudness range > 18 LU |
//! | `over_compressed` / `high_crest_factor` | 6 / 7 | crest < 6 / > 20 dB |
//! | `poor_snr` | 7 | headroom < 10 dB |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::measurements::measured;
use crate::analysis::AudioMeasurements;
use crate::configurator::FilterChainConfig;
use crate::thresholds::Thresholds;

// ---------------------------------------------------------------------------
// RuleId / RecordingTip
// ---------------------------------------------------------------------------

/// Stable identifier of the rule that produced a tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    LevelTooQuiet,
    LevelQuiet,
    LevelClipping,
    LevelNearClipping,
    BackgroundNoiseHigh,
    BackgroundNoiseModerate,
    MainsHum,
    TooFarFromMic,
    ProximityEffect,
    Sibilance,
    DynamicRange,
    OverCompressed,
    HighCrestFactor,
    PoorSnr,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::LevelTooQuiet => "level_too_quiet",
            RuleId::LevelQuiet => "level_quiet",
            RuleId::LevelClipping => "level_clipping",
            RuleId::LevelNearClipping => "level_near_clipping",
            RuleId::BackgroundNoiseHigh => "background_noise_high",
            RuleId::BackgroundNoiseModerate => "background_noise_moderate",
            RuleId::MainsHum => "mains_hum",
            RuleId::TooFarFromMic => "too_far_from_mic",
            RuleId::ProximityEffect => "proximity_effect",
            RuleId::Sibilance => "sibilance",
            RuleId::DynamicRange => "dynamic_range",
            RuleId::OverCompressed => "over_compressed",
            RuleId::HighCrestFactor => "high_crest_factor",
            RuleId::PoorSnr => "poor_snr",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of advice for the person holding the microphone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingTip {
    /// 1 (minor) – 10 (fix this first).
    pub priority: u8,
    pub rule_id: RuleId,
    pub message: String,
}

impl RecordingTip {
    fn new(priority: u8, rule_id: RuleId, message: impl Into<String>) -> Self {
        Self {
            priority,
            rule_id,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TipContext / rule table
// ---------------------------------------------------------------------------

/// Inputs every rule may read.
pub struct TipContext<'a> {
    pub thresholds: &'a Thresholds,
    pub measurements: &'a AudioMeasurements,
    pub config: Option<&'a FilterChainConfig>,
}

/// One row of the rule table.
pub struct TipRule {
    pub name: &'static str,
    pub evaluate: fn(&TipContext<'_>) -> Option<RecordingTip>,
}

/// Rules in registration order; this order breaks priority ties.
pub static RULES: &[TipRule] = &[
    TipRule { name: "level", evaluate: level },
    TipRule { name: "clipping", evaluate: clipping },
    TipRule { name: "background_noise", evaluate: background_noise },
    TipRule { name: "mains_hum", evaluate: mains_hum },
    TipRule { name: "too_far_from_mic", evaluate: too_far_from_mic },
    TipRule { name: "proximity_effect", evaluate: proximity_effect },
    TipRule { name: "sibilance", evaluate: sibilance },
    TipRule { name: "dynamic_range", evaluate: dynamic_range },
    TipRule { name: "over_compressed", evaluate: over_compressed },
    TipRule { name: "high_crest_factor", evaluate: high_crest_factor },
    TipRule { name: "poor_snr", evaluate: poor_snr },
];

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Gain recommendation after clamping to the available peak headroom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GainAdvice {
    /// Whole-dB gain that would reach the target.
    pub needed_db: f64,
    /// Whole-dB gain that is safe to apply; never above the headroom.
    pub gain_db: f64,
}

impl GainAdvice {
    pub(crate) fn new(needed_db: f64, headroom_db: f64) -> Self {
        let needed_db = needed_db.round();
        Self {
            needed_db,
            gain_db: needed_db.min(headroom_db).floor(),
        }
    }

    pub(crate) fn clamped(&self) -> bool {
        self.gain_db < self.needed_db
    }
}

fn level(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let t = ctx.thresholds;
    let m = ctx.measurements;

    let (level, too_quiet, quiet, target, unit) = match &m.speech_profile {
        Some(p) => (
            p.rms_db,
            t.speech_too_quiet_db,
            t.speech_quiet_db,
            t.speech_target_rms_db,
            "dBFS speech RMS",
        ),
        None => (
            measured(m.loudness.integrated_lufs)?,
            t.lufs_too_quiet,
            t.lufs_quiet,
            t.target_lufs,
            "LUFS",
        ),
    };

    let (priority, rule_id, label) = if level < too_quiet {
        (10, RuleId::LevelTooQuiet, "Recording is too quiet")
    } else if level < quiet {
        (8, RuleId::LevelQuiet, "Recording is a little quiet")
    } else {
        return None;
    };

    let headroom = t.peak_ceiling_dbtp - m.loudness.true_peak_dbtp;
    let advice = GainAdvice::new(target - level, headroom);

    let message = if advice.gain_db < t.min_gain_change_db {
        format!(
            "{label} ({level:.0} {unit}), but peaks are already near the ceiling. \
             Check for plosives or handling noise before raising the gain."
        )
    } else if advice.clamped() {
        format!(
            "{label} ({level:.0} {unit}). Raise input gain by about {:.0} dB; \
             {:.0} dB would be needed to reach the target, but peaks would pass {:.0} dBTP.",
            advice.gain_db, advice.needed_db, t.peak_ceiling_dbtp
        )
    } else {
        format!(
            "{label} ({level:.0} {unit}). Raise input gain by about {:.0} dB.",
            advice.gain_db
        )
    };
    Some(RecordingTip::new(priority, rule_id, message))
}

fn clipping(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let t = ctx.thresholds;
    let m = ctx.measurements;
    let peak = m.loudness.true_peak_dbtp;
    if !(peak > t.peak_ceiling_dbtp) {
        return None;
    }

    let quiet = measured(m.loudness.integrated_lufs).filter(|i| *i < t.clipping_quiet_lufs);
    if peak > t.clipping_dbtp {
        if let Some(integrated) = quiet {
            return Some(RecordingTip::new(
                10,
                RuleId::LevelClipping,
                format!(
                    "Clipping while quiet: peaks reach {peak:+.1} dBTP although the recording \
                     averages {integrated:.0} LUFS. This is likely transient (plosives, bumps), \
                     not gain; use a pop filter or move the mic slightly off-axis."
                ),
            ));
        }
    }

    let excess = peak - t.peak_reduction_target_dbtp;
    let reduction = excess.ceil();
    if peak > t.clipping_dbtp {
        Some(RecordingTip::new(
            10,
            RuleId::LevelClipping,
            format!(
                "Recording clips (true peak {peak:+.1} dBTP). Reduce input gain by about \
                 {reduction:.0} dB."
            ),
        ))
    } else if excess < 3.0 {
        Some(RecordingTip::new(
            9,
            RuleId::LevelNearClipping,
            format!("Peaks come close to clipping ({peak:+.1} dBTP). Reduce input gain slightly."),
        ))
    } else {
        Some(RecordingTip::new(
            9,
            RuleId::LevelNearClipping,
            format!(
                "Peaks come close to clipping ({peak:+.1} dBTP). Reduce input gain by about \
                 {reduction:.0} dB."
            ),
        ))
    }
}

// ---------------------------------------------------------------------------
// Noise
// ---------------------------------------------------------------------------

fn background_noise(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let t = ctx.thresholds;
    let floor = ctx.measurements.noise_floor_db()?;
    if floor > t.noise_high_db {
        Some(RecordingTip::new(
            9,
            RuleId::BackgroundNoiseHigh,
            format!(
                "Background noise is high ({floor:.0} dBFS). Turn off fans or air \
                 conditioning, or record in a quieter room."
            ),
        ))
    } else if floor > t.noise_moderate_db {
        Some(RecordingTip::new(
            6,
            RuleId::BackgroundNoiseModerate,
            format!(
                "Some background noise is audible ({floor:.0} dBFS). Soft furnishings or a \
                 closer mic position will help."
            ),
        ))
    } else {
        None
    }
}

fn mains_hum(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let p = ctx.measurements.noise_profile.as_ref()?;
    ctx.thresholds
        .is_tonal_hum(p.spectral.entropy, p.spectral.flatness, p.floor_db)
        .then(|| {
            RecordingTip::new(
                7,
                RuleId::MainsHum,
                "Tonal hum detected in the pauses. Check for ground loops, unbalanced cables \
                 or nearby power supplies.",
            )
        })
}

fn too_far_from_mic(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let t = ctx.thresholds;
    let m = ctx.measurements;
    m.noise_profile.as_ref()?;
    let speech = m.speech_profile.as_ref()?;
    let headroom = m.headroom_db()?;
    (headroom < t.snr_distant_db && speech.rms_db < t.distant_speech_rms_db).then(|| {
        RecordingTip::new(
            8,
            RuleId::TooFarFromMic,
            format!(
                "Voice sits only {headroom:.0} dB above the room at {:.0} dBFS. Move closer \
                 to the microphone.",
                speech.rms_db
            ),
        )
    })
}

// ---------------------------------------------------------------------------
// Tone
// ---------------------------------------------------------------------------

fn proximity_effect(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let s = ctx.measurements.speech_spectral();
    ctx.thresholds
        .is_proximity_effect(s.decrease, s.skewness)
        .then(|| {
            RecordingTip::new(
                5,
                RuleId::ProximityEffect,
                "Voice sounds boomy from being very close to the mic. Back off a few \
                 centimetres or speak slightly across it.",
            )
        })
}

fn sibilance(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let config = ctx.config?;
    let s = ctx.measurements.speech_spectral();
    (config.deess_intensity > ctx.thresholds.sibilance_deess_intensity
        && ctx.thresholds.is_bright(s.centroid, s.rolloff))
    .then(|| {
        RecordingTip::new(
            4,
            RuleId::Sibilance,
            "Strong sibilance. Angle the mic slightly away from your mouth.",
        )
    })
}

// ---------------------------------------------------------------------------
// Dynamics
// ---------------------------------------------------------------------------

fn dynamic_range(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let lra = ctx.measurements.loudness.range_lu;
    (lra > ctx.thresholds.loudness_range_high_lu).then(|| {
        RecordingTip::new(
            5,
            RuleId::DynamicRange,
            format!(
                "Loudness varies a lot ({lra:.0} LU). Keep a steady distance from the mic \
                 and an even speaking volume."
            ),
        )
    })
}

fn over_compressed(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let crest = ctx.measurements.crest_factor_db()?;
    (crest < ctx.thresholds.crest_low_db).then(|| {
        RecordingTip::new(
            6,
            RuleId::OverCompressed,
            format!(
                "Audio looks heavily compressed (crest factor {crest:.0} dB). Disable \
                 automatic gain control or compression in the recording chain."
            ),
        )
    })
}

fn high_crest_factor(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let crest = ctx.measurements.crest_factor_db()?;
    (crest > ctx.thresholds.crest_high_db).then(|| {
        RecordingTip::new(
            7,
            RuleId::HighCrestFactor,
            format!(
                "Sharp peaks well above the average level (crest factor {crest:.0} dB). \
                 Use a pop filter and avoid touching the mic or desk."
            ),
        )
    })
}

fn poor_snr(ctx: &TipContext<'_>) -> Option<RecordingTip> {
    let headroom = ctx.measurements.headroom_db()?;
    (headroom < ctx.thresholds.snr_poor_db).then(|| {
        RecordingTip::new(
            7,
            RuleId::PoorSnr,
            format!(
                "Speech is only {headroom:.0} dB above the noise. Reduce background noise \
                 or raise your voice relative to it."
            ),
        )
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
