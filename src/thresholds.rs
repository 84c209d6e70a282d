//! Shared decision thresholds.
//!
//! Every cutoff that both the [`AdaptiveConfigurator`] and the [`TipEngine`]
//! look at lives here, so "what the processor does" and "what the tips say"
//! cannot drift apart.  Both components take a [`Thresholds`] by value in
//! their constructors; [`Thresholds::default`] is the current version.
//!
//! | Group | Values |
//! |-------|--------|
//! | Level | speech RMS −42 / −36 dBFS (target −24), integrated −30 / −24 LUFS (target −18) |
//! | Peaks | ceiling −1 dBTP, clipping 0 dBTP, reduction target −3 dBTP |
//! | Noise | high −45 dBFS, moderate −55 dBFS, audible −65 dBFS |
//! | Tonal | entropy < 0.30, flatness < 0.3 |
//! | Brightness | centroid > 4000 Hz, rolloff > 10000 Hz |
//! | Dynamics | crest 6–20 dB, LRA 18 LU |
//! | SNR | poor < 10 dB, distant < 15 dB, margin 20 dB |
//!
//! [`AdaptiveConfigurator`]: crate::configurator::AdaptiveConfigurator
//! [`TipEngine`]: crate::tips::TipEngine

use serde::{Deserialize, Serialize};

/// Versioned set of decision thresholds.
///
/// Bump [`Thresholds::VERSION`] whenever a default value changes.  A
/// table's `version` is stamped into every [`FilterChainConfig`] so
/// regression fixtures can tell which table produced them; custom tables
/// carry their own number.
///
/// [`FilterChainConfig`]: crate::configurator::FilterChainConfig
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Table version, [`Thresholds::VERSION`] for the standard table.
    pub version: u32,

    // -- Level (speech RMS, dBFS) -------------------------------------------
    pub speech_too_quiet_db: f64,
    pub speech_quiet_db: f64,
    pub speech_target_rms_db: f64,

    // -- Level (integrated loudness fallback, LUFS) -------------------------
    pub lufs_too_quiet: f64,
    pub lufs_quiet: f64,
    pub target_lufs: f64,

    // -- Peaks (dBTP) -------------------------------------------------------
    pub peak_ceiling_dbtp: f64,
    pub clipping_dbtp: f64,
    pub peak_reduction_target_dbtp: f64,
    /// Integrated loudness below which positive clipping is treated as a
    /// transient problem rather than a gain problem.
    pub clipping_quiet_lufs: f64,
    /// Smallest gain change worth recommending, dB.
    pub min_gain_change_db: f64,

    // -- Noise floor (dBFS) -------------------------------------------------
    pub noise_high_db: f64,
    pub noise_moderate_db: f64,
    pub noise_audible_db: f64,

    // -- Tonal noise --------------------------------------------------------
    pub tonal_entropy_max: f64,
    pub tonal_flatness_max: f64,

    // -- Spectral shape -----------------------------------------------------
    pub proximity_decrease: f64,
    pub proximity_decrease_soft: f64,
    pub proximity_skewness: f64,
    pub bright_centroid_hz: f64,
    pub bright_rolloff_hz: f64,
    pub dark_centroid_hz: f64,
    /// De-ess intensity above which the sibilance tip may fire.
    pub sibilance_deess_intensity: f64,

    // -- Dynamics -----------------------------------------------------------
    pub crest_low_db: f64,
    pub crest_high_db: f64,
    pub loudness_range_high_lu: f64,

    // -- Signal-to-noise (noise-reduction headroom, dB) ---------------------
    pub snr_poor_db: f64,
    pub snr_distant_db: f64,
    pub snr_margin_db: f64,
    /// Speech RMS below which a poor SNR points at mic distance, dBFS.
    pub distant_speech_rms_db: f64,
}

impl Thresholds {
    /// Version of the default table.
    pub const VERSION: u32 = 1;

    /// The current default table.
    pub const STANDARD: Thresholds = Thresholds {
        version: Self::VERSION,

        speech_too_quiet_db: -42.0,
        speech_quiet_db: -36.0,
        speech_target_rms_db: -24.0,

        lufs_too_quiet: -30.0,
        lufs_quiet: -24.0,
        target_lufs: -18.0,

        peak_ceiling_dbtp: -1.0,
        clipping_dbtp: 0.0,
        peak_reduction_target_dbtp: -3.0,
        clipping_quiet_lufs: -28.0,
        min_gain_change_db: 2.0,

        noise_high_db: -45.0,
        noise_moderate_db: -55.0,
        noise_audible_db: -65.0,

        tonal_entropy_max: 0.30,
        tonal_flatness_max: 0.3,

        proximity_decrease: -0.10,
        proximity_decrease_soft: -0.05,
        proximity_skewness: 2.5,
        bright_centroid_hz: 4000.0,
        bright_rolloff_hz: 10_000.0,
        dark_centroid_hz: 1500.0,
        sibilance_deess_intensity: 0.5,

        crest_low_db: 6.0,
        crest_high_db: 20.0,
        loudness_range_high_lu: 18.0,

        snr_poor_db: 10.0,
        snr_distant_db: 15.0,
        snr_margin_db: 20.0,
        distant_speech_rms_db: -30.0,
    };

    /// Version of this table.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Tonal (hum-like) rather than broadband noise, and loud enough to hear.
    pub fn is_tonal_hum(&self, entropy: f64, flatness: f64, floor_db: f64) -> bool {
        entropy < self.tonal_entropy_max
            && flatness < self.tonal_flatness_max
            && floor_db > self.noise_audible_db
    }

    /// Bass build-up from a close microphone.
    pub fn is_proximity_effect(&self, decrease: f64, skewness: f64) -> bool {
        decrease < self.proximity_decrease
            || (decrease < self.proximity_decrease_soft && skewness > self.proximity_skewness)
    }

    /// Both brightness cutoffs exceeded.
    pub fn is_bright(&self, centroid_hz: f64, rolloff_hz: f64) -> bool {
        centroid_hz > self.bright_centroid_hz && rolloff_hz > self.bright_rolloff_hz
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::STANDARD
    }
}
