//! The flat parameter bag handed to the DSP-execution collaborator.
//!
//! | Stage | Fields |
//! |-------|--------|
//! | Highpass | `highpass_hz` |
//! | Noise gate | `gate_threshold` (linear), `gate_ratio`, `gate_attack_ms`, `gate_release_ms` |
//! | Compressor | `comp_threshold_db`, `comp_ratio`, `comp_attack_ms`, `comp_release_ms`, `comp_makeup_db` |
//! | De-esser | `deess_intensity` (0 disables) |
//! | Expander | `nr_expansion` (1 disables), `nr_threshold_db` |
//! | Loudness | `target_lufs`, `normalization_mode`, `speechnorm_expansion`, `speechnorm_rms_target` |
//! | Neural denoise | `neural_denoise_enabled`, `neural_denoise_strength`, `neural_denoise_threshold_db` |
//! | Patch denoise | `patch_denoise_enabled`, `patch_denoise_strength`, `patch_denoise_threshold_db` |

use serde::{Deserialize, Serialize};

/// Which loudness normaliser the chain should run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// Cycle-based speech normaliser, driven by the speech profile.
    Speechnorm,
    /// Peak-based dynamic normaliser, used without a speech profile.
    #[default]
    Dynaudnorm,
}

/// Fully determined filter-chain parameters for one file.
///
/// Every field is a deterministic function of the measurements and the
/// [`Thresholds`](crate::thresholds::Thresholds) table identified by
/// `thresholds_version`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterChainConfig {
    pub highpass_hz: f64,

    /// Gate open threshold, linear amplitude.
    pub gate_threshold: f64,
    pub gate_ratio: f64,
    pub gate_attack_ms: f64,
    pub gate_release_ms: f64,

    pub comp_threshold_db: f64,
    pub comp_ratio: f64,
    pub comp_attack_ms: f64,
    pub comp_release_ms: f64,
    pub comp_makeup_db: f64,

    /// De-esser intensity, 0–1.
    pub deess_intensity: f64,

    /// Downward expansion ratio; 1.0 leaves the signal untouched.
    pub nr_expansion: f64,
    pub nr_threshold_db: f64,

    pub target_lufs: f64,
    pub normalization_mode: NormalizationMode,
    /// Maximum speechnorm expansion factor (linear gain).
    pub speechnorm_expansion: f64,
    /// Speechnorm RMS target, linear amplitude.
    pub speechnorm_rms_target: f64,

    pub neural_denoise_enabled: bool,
    /// Wet/dry mix, 0–1.
    pub neural_denoise_strength: f64,
    pub neural_denoise_threshold_db: f64,

    pub patch_denoise_enabled: bool,
    pub patch_denoise_strength: f64,
    pub patch_denoise_threshold_db: f64,

    /// Version of the [`Thresholds`](crate::thresholds::Thresholds) table
    /// used to derive this config.
    pub thresholds_version: u32,
}

impl FilterChainConfig {
    /// Gate threshold in dBFS.
    pub fn gate_threshold_db(&self) -> f64 {
        crate::analysis::linear_to_db(self.gate_threshold)
    }

    /// `true` when the de-esser stage should run.
    pub fn deess_enabled(&self) -> bool {
        self.deess_intensity > 0.0
    }

    /// `true` when the expander stage should run.
    pub fn expander_enabled(&self) -> bool {
        self.nr_expansion > 1.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
