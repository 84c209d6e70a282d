//! Measurement data model.
//!
//! The decoding collaborator delivers an [`AnalysisInput`]: whole-file
//! [`FileStatistics`] plus a stream of fixed-size [`WindowMeasurement`]s.
//! The pipeline scans the stream, elects region profiles and merges them
//! with the statistics into an [`AudioMeasurements`], the single value both
//! the configurator and the tip engine read.
//!
//! ```text
//! AnalysisInput ──▶ scan / elect / profile ──▶ AudioMeasurements
//!   statistics ─────────────────────────────▶   loudness, amplitude, spectral, noise
//!   windows ──▶ candidates ──▶ election ────▶   candidates, elections, profiles
//! ```
//!
//! A value of exactly `0.0` in the noise-floor, crest-factor and headroom
//! fields means *not measured*.  The accessors on [`AudioMeasurements`]
//! return `None` for those instead of a misleading zero.

use serde::{Deserialize, Serialize};

use super::profile::{NoiseProfile, SpeechProfile};
use super::region::RegionCandidate;

/// Level used in place of `-inf` for silent windows, dBFS.
pub const SILENCE_FLOOR_DB: f64 = -120.0;

// ---------------------------------------------------------------------------
// dB helpers
// ---------------------------------------------------------------------------

/// Convert a dB value to linear amplitude.
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Convert linear amplitude to dB, floored at [`SILENCE_FLOOR_DB`].
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        return SILENCE_FLOOR_DB;
    }
    (20.0 * linear.log10()).max(SILENCE_FLOOR_DB)
}

/// Energy mean of a set of dB levels (mean power, back to dB).
///
/// Returns [`SILENCE_FLOOR_DB`] for an empty input.
pub fn energy_mean_db<I>(levels: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = levels
        .into_iter()
        .fold((0.0_f64, 0usize), |(sum, n), db| (sum + 10f64.powf(db / 10.0), n + 1));
    if count == 0 || sum <= 0.0 {
        return SILENCE_FLOOR_DB;
    }
    (10.0 * (sum / count as f64).log10()).max(SILENCE_FLOOR_DB)
}

/// Treat an exact zero as "not measured".
pub(crate) fn measured(value: f64) -> Option<f64> {
    if value == 0.0 || !value.is_finite() {
        None
    } else {
        Some(value)
    }
}

// ---------------------------------------------------------------------------
// SpectralMetrics
// ---------------------------------------------------------------------------

/// Frequency-domain shape descriptors of a windowed spectrum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralMetrics {
    /// Spectral centroid, Hz.
    pub centroid: f64,
    /// Spectral spread, Hz.
    pub spread: f64,
    /// 85 % rolloff frequency, Hz.
    pub rolloff: f64,
    /// Spectral flatness, 0 (tonal) – 1 (white noise).
    pub flatness: f64,
    pub kurtosis: f64,
    pub skewness: f64,
    pub crest: f64,
    pub slope: f64,
    /// Spectral decrease; strongly negative means energy piled into the bass.
    pub decrease: f64,
    /// Normalised spectral entropy, 0 (single tone) – 1 (broadband).
    pub entropy: f64,
    pub flux: f64,
}

impl SpectralMetrics {
    /// Arithmetic mean of every descriptor.  Empty input yields all zeros.
    pub fn mean<'a, I>(metrics: I) -> Self
    where
        I: IntoIterator<Item = &'a SpectralMetrics>,
    {
        let mut acc = SpectralMetrics::default();
        let mut n = 0usize;
        for m in metrics {
            acc.centroid += m.centroid;
            acc.spread += m.spread;
            acc.rolloff += m.rolloff;
            acc.flatness += m.flatness;
            acc.kurtosis += m.kurtosis;
            acc.skewness += m.skewness;
            acc.crest += m.crest;
            acc.slope += m.slope;
            acc.decrease += m.decrease;
            acc.entropy += m.entropy;
            acc.flux += m.flux;
            n += 1;
        }
        if n == 0 {
            return acc;
        }
        let k = n as f64;
        SpectralMetrics {
            centroid: acc.centroid / k,
            spread: acc.spread / k,
            rolloff: acc.rolloff / k,
            flatness: acc.flatness / k,
            kurtosis: acc.kurtosis / k,
            skewness: acc.skewness / k,
            crest: acc.crest / k,
            slope: acc.slope / k,
            decrease: acc.decrease / k,
            entropy: acc.entropy / k,
            flux: acc.flux / k,
        }
    }

    fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("spectral.centroid", self.centroid),
            ("spectral.spread", self.spread),
            ("spectral.rolloff", self.rolloff),
            ("spectral.flatness", self.flatness),
            ("spectral.kurtosis", self.kurtosis),
            ("spectral.skewness", self.skewness),
            ("spectral.crest", self.crest),
            ("spectral.slope", self.slope),
            ("spectral.decrease", self.decrease),
            ("spectral.entropy", self.entropy),
            ("spectral.flux", self.flux),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

// ---------------------------------------------------------------------------
// Whole-file aggregates
// ---------------------------------------------------------------------------

/// EBU R128 loudness statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Loudness {
    /// Integrated loudness, LUFS.
    pub integrated_lufs: f64,
    /// True peak, dBTP.
    pub true_peak_dbtp: f64,
    /// Loudness range, LU.
    pub range_lu: f64,
}

/// Sample-level amplitude statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amplitude {
    pub rms_db: f64,
    pub peak_db: f64,
    pub dynamic_range_db: f64,
    /// Peak-to-RMS ratio, dB.  `0.0` = not measured.
    pub crest_factor_db: f64,
}

/// Noise and silence context from the pre-scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseContext {
    /// Aggregate (astats) noise-floor estimate, dBFS.  `0.0` = not measured.
    pub floor_db: f64,
    /// Pre-scan noise-floor estimate, dBFS.  `0.0` = not measured.
    pub prescan_floor_db: f64,
    /// Threshold the silence detector ran with, dBFS.  `0.0` = not measured.
    pub silence_threshold_db: f64,
    /// Suggested gate threshold as linear amplitude.  `0.0` = not measured.
    pub suggested_gate_threshold: f64,
    /// Gap between noise floor and speech level, dB.  `0.0` = not measured.
    pub reduction_headroom_db: f64,
}

/// Whole-file aggregate statistics as delivered by the decoding collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStatistics {
    pub loudness: Loudness,
    pub amplitude: Amplitude,
    pub spectral: SpectralMetrics,
    pub noise: NoiseContext,
}

impl FileStatistics {
    /// Name of the first non-finite field, if any.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("loudness.integrated_lufs", self.loudness.integrated_lufs),
            ("loudness.true_peak_dbtp", self.loudness.true_peak_dbtp),
            ("loudness.range_lu", self.loudness.range_lu),
            ("amplitude.rms_db", self.amplitude.rms_db),
            ("amplitude.peak_db", self.amplitude.peak_db),
            ("amplitude.dynamic_range_db", self.amplitude.dynamic_range_db),
            ("amplitude.crest_factor_db", self.amplitude.crest_factor_db),
            ("noise.floor_db", self.noise.floor_db),
            ("noise.prescan_floor_db", self.noise.prescan_floor_db),
            ("noise.silence_threshold_db", self.noise.silence_threshold_db),
            ("noise.suggested_gate_threshold", self.noise.suggested_gate_threshold),
            ("noise.reduction_headroom_db", self.noise.reduction_headroom_db),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
        .or_else(|| self.spectral.first_non_finite())
    }
}

// ---------------------------------------------------------------------------
// WindowMeasurement / AnalysisInput
// ---------------------------------------------------------------------------

/// One fixed-size analysis window of the pre-scan stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowMeasurement {
    /// Window start, seconds from the beginning of the file.
    pub start: f64,
    /// Window length, seconds.
    pub duration: f64,
    pub rms_db: f64,
    pub peak_db: f64,
    /// Voiced-frame probability for this window, 0–1.
    #[serde(default)]
    pub voicing: f64,
    #[serde(default)]
    pub spectral: SpectralMetrics,
}

impl WindowMeasurement {
    /// End of the window, seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// `false` for windows the scanner must skip (non-finite values or a
    /// non-positive duration).
    pub fn is_valid(&self) -> bool {
        self.start.is_finite()
            && self.duration.is_finite()
            && self.duration > 0.0
            && self.rms_db.is_finite()
            && self.peak_db.is_finite()
    }
}

/// Everything the decoding collaborator delivers for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// Source file the measurements were taken from.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub statistics: FileStatistics,
    #[serde(default)]
    pub windows: Vec<WindowMeasurement>,
}

// ---------------------------------------------------------------------------
// AudioMeasurements
// ---------------------------------------------------------------------------

/// Full measurement set for one file: aggregates, region candidates, the
/// elected candidate per class and the profiles built from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioMeasurements {
    pub loudness: Loudness,
    pub amplitude: Amplitude,
    pub spectral: SpectralMetrics,
    pub noise: NoiseContext,
    /// Silence-like candidates in scan order.
    pub silence_candidates: Vec<RegionCandidate>,
    /// Speech-like candidates in scan order.
    pub speech_candidates: Vec<RegionCandidate>,
    /// Index of the elected entry in `silence_candidates`.
    pub silence_election: Option<usize>,
    /// Index of the elected entry in `speech_candidates`.
    pub speech_election: Option<usize>,
    pub noise_profile: Option<NoiseProfile>,
    pub speech_profile: Option<SpeechProfile>,
}

impl AudioMeasurements {
    /// Measurements carrying only whole-file aggregates.
    pub fn from_statistics(stats: &FileStatistics) -> Self {
        Self {
            loudness: stats.loudness,
            amplitude: stats.amplitude,
            spectral: stats.spectral,
            noise: stats.noise,
            ..Default::default()
        }
    }

    /// The elected silence candidate, if any.
    pub fn elected_silence(&self) -> Option<&RegionCandidate> {
        self.silence_election
            .and_then(|i| self.silence_candidates.get(i))
    }

    /// The elected speech candidate, if any.
    pub fn elected_speech(&self) -> Option<&RegionCandidate> {
        self.speech_election.and_then(|i| self.speech_candidates.get(i))
    }

    /// Noise floor: the profile's measured floor, else the astats estimate.
    pub fn noise_floor_db(&self) -> Option<f64> {
        match &self.noise_profile {
            Some(p) => Some(p.floor_db),
            None => measured(self.noise.floor_db),
        }
    }

    /// Noise-reduction headroom, `None` when unmeasured.
    pub fn headroom_db(&self) -> Option<f64> {
        measured(self.noise.reduction_headroom_db)
    }

    /// Crest factor, speech profile first, `None` when unmeasured.
    pub fn crest_factor_db(&self) -> Option<f64> {
        match &self.speech_profile {
            Some(p) => measured(p.crest_factor_db),
            None => measured(self.amplitude.crest_factor_db),
        }
    }

    /// Spectral descriptors of speech when a profile exists, else whole-file.
    pub fn speech_spectral(&self) -> &SpectralMetrics {
        match &self.speech_profile {
            Some(p) => &p.spectral,
            None => &self.spectral,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_linear_conversions() {
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-12);
        assert!((linear_to_db(0.1) + 20.0).abs() < 1e-9);
        assert_eq!(linear_to_db(0.0), SILENCE_FLOOR_DB);
    }

    #[test]
    fn energy_mean_weights_loud_windows() {
        // Mean of -20 and -40 dB power is dominated by the louder window.
        let mean = energy_mean_db([-20.0, -40.0]);
        assert!(mean > -23.1 && mean < -22.9, "mean = {mean}");
        assert_eq!(energy_mean_db(std::iter::empty()), SILENCE_FLOOR_DB);
    }

    #[test]
    fn spectral_mean_averages_each_field() {
        let a = SpectralMetrics {
            centroid: 1000.0,
            entropy: 0.2,
            ..Default::default()
        };
        let b = SpectralMetrics {
            centroid: 3000.0,
            entropy: 0.4,
            ..Default::default()
        };
        let m = SpectralMetrics::mean([&a, &b]);
        assert!((m.centroid - 2000.0).abs() < 1e-9);
        assert!((m.entropy - 0.3).abs() < 1e-9);
    }

    #[test]
    fn zero_sentinels_read_as_unmeasured() {
        let m = AudioMeasurements::default();
        assert_eq!(m.noise_floor_db(), None);
        assert_eq!(m.headroom_db(), None);
        assert_eq!(m.crest_factor_db(), None);
    }

    #[test]
    fn non_finite_statistic_is_reported_by_name() {
        let mut stats = FileStatistics::default();
        assert_eq!(stats.first_non_finite(), None);
        stats.spectral.flux = f64::NAN;
        assert_eq!(stats.first_non_finite(), Some("spectral.flux"));
        stats.loudness.true_peak_dbtp = f64::INFINITY;
        assert_eq!(stats.first_non_finite(), Some("loudness.true_peak_dbtp"));
    }

    #[test]
    fn input_document_parses_with_missing_fields() {
        let json = r#"{
            "source": "episode.wav",
            "statistics": { "loudness": { "integrated_lufs": -20.5 } },
            "windows": [ { "start": 0.0, "duration": 0.25, "rms_db": -60.0, "peak_db": -50.0 } ]
        }"#;
        let input: AnalysisInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.source, "episode.wav");
        assert_eq!(input.statistics.loudness.integrated_lufs, -20.5);
        assert_eq!(input.windows.len(), 1);
        assert_eq!(input.windows[0].voicing, 0.0);
    }
}
