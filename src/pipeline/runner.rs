//! Analysis pipeline: drives the full scan → elect → configure → tips run
//! for one file.
//!
//! # Passes
//!
//! | # | Name | Work | Cancellation checked |
//! |---|------|------|----------------------|
//! | 0 | `silence_scan` | silence candidates | before, and every [`CANCEL_CHECK_STRIDE`] windows |
//! | 1 | `speech_scan` | speech candidates | before, and every [`CANCEL_CHECK_STRIDE`] windows |
//! | 2 | `election` | elect + refine, build profiles, derive headroom | before |
//! | 3 | `configure` | filter chain + recording tips | before |
//!
//! Passes run strictly in order: each consumes what the previous one
//! produced.  The pipeline itself is synchronous and CPU-bound; callers in
//! async code push it onto `tokio::task::spawn_blocking`.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::analysis::measurements::{measured, SILENCE_FLOOR_DB};
use crate::analysis::{
    build_noise_profile, build_speech_profile, AnalysisInput, AudioMeasurements,
    CandidateScorer, NoRefinement, RefinementStrategy, RegionCandidate, RegionElector,
    RegionScanner, SilenceClassifier, SilenceScorer, SlidingRefiner, SpeechClassifier,
    SpeechScorer, WindowClassifier, WindowMeasurement,
};
use crate::config::{AnalysisConfig, RegionScanConfig};
use crate::configurator::{AdaptiveConfigurator, FilterChainConfig};
use crate::thresholds::Thresholds;
use crate::tips::{RecordingTip, TipEngine};

use super::progress::ProgressSink;

/// Windows visited between two cancellation checks inside a scan pass.
pub const CANCEL_CHECK_STRIDE: usize = 64;

/// Silence threshold when neither the config nor the input provides one.
pub const DEFAULT_SILENCE_THRESHOLD_DB: f64 = -50.0;

/// Speech threshold when the config leaves it unset.
pub const DEFAULT_SPEECH_THRESHOLD_DB: f64 = -35.0;

/// Derived headroom never drops to the `0.0` "unmeasured" sentinel.
const MIN_DERIVED_HEADROOM_DB: f64 = 0.1;

/// Slack for float rounding when checking that windows do not overlap.
const TIME_ORDER_TOLERANCE_SECS: f64 = 1e-6;

/// Pass names, indexed by pass number.
pub const PASSES: [&str; 4] = ["silence_scan", "speech_scan", "election", "configure"];

// ---------------------------------------------------------------------------
// AnalysisError
// ---------------------------------------------------------------------------

/// Errors that can surface inside the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The cancellation token fired.
    #[error("analysis cancelled")]
    Cancelled,
    /// The measurement document cannot be analysed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// ---------------------------------------------------------------------------
// AnalysisReport
// ---------------------------------------------------------------------------

/// Everything produced for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub source: String,
    pub measurements: AudioMeasurements,
    pub config: FilterChainConfig,
    pub tips: Vec<RecordingTip>,
}

// ---------------------------------------------------------------------------
// AnalysisPipeline
// ---------------------------------------------------------------------------

/// Runs every pass for one [`AnalysisInput`].
///
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use voice_autoclean::analysis::AnalysisInput;
/// use voice_autoclean::config::AnalysisConfig;
/// use voice_autoclean::pipeline::{AnalysisPipeline, NoProgress};
/// use voice_autoclean::thresholds::Thresholds;
///
/// let pipeline = AnalysisPipeline::new(AnalysisConfig::default(), Thresholds::default());
/// let report = pipeline
///     .analyze(&AnalysisInput::default(), &CancellationToken::new(), &NoProgress)
///     .unwrap();
/// assert!(report.measurements.noise_profile.is_none());
/// assert_eq!(report.config.target_lufs, -18.0);
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    configurator: AdaptiveConfigurator,
    tips: TipEngine,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig, thresholds: Thresholds) -> Self {
        Self {
            config,
            configurator: AdaptiveConfigurator::new(thresholds),
            tips: TipEngine::new(thresholds),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run all passes.
    pub fn analyze(
        &self,
        input: &AnalysisInput,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<AnalysisReport, AnalysisError> {
        let measurements = self.measure(input, cancel, progress)?;

        // ── Pass 3: configure + tips ─────────────────────────────────────
        check_cancelled(cancel)?;
        let config = self.configurator.configure(&measurements);
        let tips = self.tips.evaluate(Some(&measurements), Some(&config));
        progress.on_progress(
            3,
            PASSES[3],
            1.0,
            measurements.amplitude.rms_db,
            Some(&measurements),
        );

        log::info!(
            "{}: {} window(s), {} silence / {} speech candidate(s), {} tip(s)",
            display_source(input),
            input.windows.len(),
            measurements.silence_candidates.len(),
            measurements.speech_candidates.len(),
            tips.len()
        );

        Ok(AnalysisReport {
            source: input.source.clone(),
            measurements,
            config,
            tips,
        })
    }

    /// Run the scan and election passes only.
    pub fn measure(
        &self,
        input: &AnalysisInput,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<AudioMeasurements, AnalysisError> {
        if let Some(field) = input.statistics.first_non_finite() {
            return Err(AnalysisError::InvalidInput(format!(
                "statistic {field} is not finite"
            )));
        }
        check_time_order(&input.windows)?;
        let windows = input.windows.as_slice();
        let stats = &input.statistics;

        let silence_cfg = &self.config.silence;
        let speech_cfg = &self.config.speech;

        let silence_classifier = SilenceClassifier {
            threshold_db: silence_cfg
                .threshold_db
                .or_else(|| measured(stats.noise.silence_threshold_db))
                .unwrap_or(DEFAULT_SILENCE_THRESHOLD_DB),
        };
        let speech_classifier = SpeechClassifier {
            threshold_db: speech_cfg
                .threshold_db
                .unwrap_or(DEFAULT_SPEECH_THRESHOLD_DB),
        };
        let silence_scorer = SilenceScorer {
            reference_secs: silence_cfg.reference_secs,
        };
        let speech_scorer = SpeechScorer {
            reference_secs: speech_cfg.reference_secs,
            target_rms_db: self.configurator.thresholds().speech_target_rms_db,
        };

        // ── Pass 0 / 1: scans ────────────────────────────────────────────
        check_cancelled(cancel)?;
        let mut silence = scan_pass(
            0,
            windows,
            &silence_classifier,
            &silence_scorer,
            silence_cfg,
            cancel,
            progress,
        )?;

        check_cancelled(cancel)?;
        let mut speech = scan_pass(
            1,
            windows,
            &speech_classifier,
            &speech_scorer,
            speech_cfg,
            cancel,
            progress,
        )?;

        // ── Pass 2: election ─────────────────────────────────────────────
        check_cancelled(cancel)?;
        let mut m = AudioMeasurements::from_statistics(stats);

        let refiner = self.refiner(silence_cfg);
        m.silence_election =
            RegionElector::new(&silence_scorer, refiner.as_ref()).elect(&mut silence, windows);
        let refiner = self.refiner(speech_cfg);
        m.speech_election =
            RegionElector::new(&speech_scorer, refiner.as_ref()).elect(&mut speech, windows);

        m.silence_candidates = silence;
        m.speech_candidates = speech;

        let noise_profile = build_noise_profile(m.elected_silence());
        let speech_profile = build_speech_profile(m.elected_speech());
        m.noise_profile = noise_profile;
        m.speech_profile = speech_profile;

        if m.noise_profile.is_none() {
            log::debug!("{}: no silence elected, using whole-file noise floor", display_source(input));
        }
        if m.speech_profile.is_none() {
            log::debug!("{}: no speech elected, using whole-file levels", display_source(input));
        }

        let derived = match (&m.noise_profile, &m.speech_profile) {
            (Some(noise), Some(speech)) => {
                Some((speech.rms_db - noise.floor_db).max(MIN_DERIVED_HEADROOM_DB))
            }
            _ => None,
        };
        if let Some(headroom) = derived {
            m.noise.reduction_headroom_db = headroom;
        }

        progress.on_progress(2, PASSES[2], 1.0, m.amplitude.rms_db, Some(&m));
        Ok(m)
    }

    fn refiner(&self, scan: &RegionScanConfig) -> Box<dyn RefinementStrategy> {
        if self.config.refine {
            Box::new(SlidingRefiner::new(scan.refine_windows))
        } else {
            Box::new(NoRefinement)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_cancelled(cancel: &CancellationToken) -> Result<(), AnalysisError> {
    if cancel.is_cancelled() {
        Err(AnalysisError::Cancelled)
    } else {
        Ok(())
    }
}

/// Valid windows must run forward in time without overlapping.  Invalid
/// windows are left for the scanner to skip.
fn check_time_order(windows: &[WindowMeasurement]) -> Result<(), AnalysisError> {
    let mut previous: Option<(usize, &WindowMeasurement)> = None;
    for (i, w) in windows.iter().enumerate().filter(|(_, w)| w.is_valid()) {
        if let Some((j, p)) = previous {
            if w.start + TIME_ORDER_TOLERANCE_SECS < p.end() {
                return Err(AnalysisError::InvalidInput(format!(
                    "window {i} starts at {:.3} s, before window {j} ends at {:.3} s",
                    w.start,
                    p.end()
                )));
            }
        }
        previous = Some((i, w));
    }
    Ok(())
}

fn display_source(input: &AnalysisInput) -> &str {
    if input.source.is_empty() {
        "<unnamed>"
    } else {
        &input.source
    }
}

/// One scan pass with progress and cancellation every stride.
fn scan_pass(
    pass_index: usize,
    windows: &[WindowMeasurement],
    classifier: &dyn WindowClassifier,
    scorer: &dyn CandidateScorer,
    scan: &RegionScanConfig,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<Vec<RegionCandidate>, AnalysisError> {
    let name = PASSES[pass_index];
    let total = windows.len().max(1) as f64;

    let mut observer = |i: usize, window: &WindowMeasurement| {
        if i % CANCEL_CHECK_STRIDE == 0 {
            if cancel.is_cancelled() {
                return ControlFlow::Break(());
            }
            progress.on_progress(pass_index, name, i as f64 / total, window.rms_db, None);
        }
        ControlFlow::Continue(())
    };

    let candidates = RegionScanner::new(classifier, scorer, scan.run_limits())
        .scan_observed(windows, &mut observer)
        .map_err(|stop| {
            log::debug!("{name}: cancelled at window {}", stop.at_window);
            AnalysisError::Cancelled
        })?;

    let last_level = windows.last().map_or(SILENCE_FLOOR_DB, |w| w.rms_db);
    progress.on_progress(pass_index, name, 1.0, last_level, None);
    Ok(candidates)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FileStatistics, SpectralMetrics};
    use crate::configurator::NormalizationMode;
    use crate::pipeline::progress::NoProgress;
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn window(i: usize, rms_db: f64, voicing: f64) -> WindowMeasurement {
        WindowMeasurement {
            start: i as f64 * 0.25,
            duration: 0.25,
            rms_db,
            peak_db: rms_db + 10.0,
            voicing,
            spectral: SpectralMetrics {
                centroid: 2000.0,
                rolloff: 5000.0,
                entropy: 0.6,
                flatness: 0.5,
                ..Default::default()
            },
        }
    }

    /// Room tone, a long spoken passage, more room tone.
    fn episode(repeats: usize) -> AnalysisInput {
        let mut levels = Vec::new();
        for _ in 0..repeats {
            levels.extend(std::iter::repeat((-66.0, 0.0)).take(12));
            levels.extend(std::iter::repeat((-23.0, 0.9)).take(40));
        }
        levels.extend(std::iter::repeat((-64.0, 0.0)).take(8));

        let windows = levels
            .into_iter()
            .enumerate()
            .map(|(i, (rms, voicing))| window(i, rms, voicing))
            .collect();

        let mut statistics = FileStatistics::default();
        statistics.loudness.integrated_lufs = -21.0;
        statistics.loudness.true_peak_dbtp = -4.0;
        statistics.loudness.range_lu = 7.0;
        statistics.amplitude.rms_db = -26.0;
        statistics.amplitude.crest_factor_db = 13.0;

        AnalysisInput {
            source: "episode.wav".into(),
            statistics,
            windows,
        }
    }

    fn pipeline() -> AnalysisPipeline {
        AnalysisPipeline::new(AnalysisConfig::default(), Thresholds::default())
    }

    fn run(input: &AnalysisInput) -> Result<AnalysisReport, AnalysisError> {
        pipeline().analyze(input, &CancellationToken::new(), &NoProgress)
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    fn episode_builds_both_profiles() {
        let report = run(&episode(1)).unwrap();
        let m = &report.measurements;

        assert_eq!(report.source, "episode.wav");
        assert_eq!(m.silence_candidates.len(), 2);
        assert_eq!(m.speech_candidates.len(), 1);
        assert!(m.silence_election.is_some());
        assert_eq!(m.speech_election, Some(0));

        let noise = m.noise_profile.as_ref().unwrap();
        let speech = m.speech_profile.as_ref().unwrap();
        assert!((noise.floor_db + 66.0).abs() < 1e-6, "floor {}", noise.floor_db);
        assert!((speech.rms_db + 23.0).abs() < 1e-6, "speech {}", speech.rms_db);
        assert!((m.noise.reduction_headroom_db - 43.0).abs() < 1e-6);

        assert_eq!(report.config.normalization_mode, NormalizationMode::Speechnorm);
        assert!(report.tips.is_empty(), "{:?}", report.tips);
    }

    #[test]
    fn candidates_are_scan_ordered_and_disjoint() {
        let report = run(&episode(3)).unwrap();
        for list in [
            &report.measurements.silence_candidates,
            &report.measurements.speech_candidates,
        ] {
            for pair in list.windows(2) {
                assert!(pair[0].window.end() <= pair[1].window.start + 1e-9);
            }
        }
    }

    #[test]
    fn empty_stream_still_configures() {
        let report = run(&AnalysisInput::default()).unwrap();
        let m = &report.measurements;
        assert!(m.silence_candidates.is_empty());
        assert!(m.speech_candidates.is_empty());
        assert!(m.noise_profile.is_none());
        assert!(m.speech_profile.is_none());
        assert_eq!(m.noise.reduction_headroom_db, 0.0);
        assert_eq!(report.config.normalization_mode, NormalizationMode::Dynaudnorm);
        assert!(report.config.highpass_hz > 0.0);
    }

    #[test]
    fn non_finite_statistic_is_rejected() {
        let mut input = episode(1);
        input.statistics.loudness.range_lu = f64::NAN;
        match run(&input) {
            Err(AnalysisError::InvalidInput(msg)) => assert!(msg.contains("loudness.range_lu")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn reversed_windows_are_rejected() {
        let mut input = AnalysisInput {
            windows: (0..24)
                .map(|i| if i < 12 { window(i, -66.0, 0.0) } else { window(i, -23.0, 0.9) })
                .collect(),
            ..Default::default()
        };
        input.windows.reverse();

        match run(&input) {
            Err(AnalysisError::InvalidInput(msg)) => assert!(msg.contains("window 1")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn overlapping_windows_are_rejected() {
        let mut input = episode(1);
        input.windows[5].start -= 0.1;
        assert!(matches!(run(&input), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn invalid_windows_do_not_break_time_order() {
        let mut input = episode(1);
        input.windows[5].start = f64::NAN;
        let report = run(&input).unwrap();
        assert!(report
            .measurements
            .silence_candidates
            .iter()
            .chain(&report.measurements.speech_candidates)
            .all(|c| c.window.duration > 0.0));
    }

    #[test]
    fn empty_stream_reports_finite_levels() {
        let levels = Mutex::new(Vec::new());
        let sink = |_: usize, _: &str, _: f64, level: f64, _: Option<&AudioMeasurements>| {
            levels.lock().unwrap().push(level);
        };
        pipeline()
            .analyze(&AnalysisInput::default(), &CancellationToken::new(), &sink)
            .unwrap();

        let levels = levels.into_inner().unwrap();
        assert_eq!(levels.len(), PASSES.len());
        assert!(levels.iter().all(|l| l.is_finite()));
        assert_eq!(levels[0], SILENCE_FLOOR_DB);
    }

    #[test]
    fn pre_cancelled_token_aborts() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = pipeline().analyze(&episode(1), &cancel, &NoProgress);
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }

    #[test]
    fn cancel_during_scan_stops_within_a_stride() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let calls = Mutex::new(0usize);
        let sink = |pass: usize, _: &str, _: f64, _: f64, _: Option<&AudioMeasurements>| {
            *calls.lock().unwrap() += 1;
            if pass == 0 {
                trigger.cancel();
            }
        };

        let result = pipeline().analyze(&episode(4), &cancel, &sink);
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        // One report at window 0, then the check at the next stride stops it.
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn progress_is_monotonic_and_completes() {
        let seen: Mutex<Vec<(usize, f64, bool)>> = Mutex::new(Vec::new());
        let sink = |pass: usize, name: &str, p: f64, _: f64, m: Option<&AudioMeasurements>| {
            assert_eq!(name, PASSES[pass]);
            seen.lock().unwrap().push((pass, p, m.is_some()));
        };

        pipeline()
            .analyze(&episode(4), &CancellationToken::new(), &sink)
            .unwrap();

        let seen = seen.into_inner().unwrap();
        for pass in 0..PASSES.len() {
            let fractions: Vec<f64> = seen
                .iter()
                .filter(|(p, _, _)| *p == pass)
                .map(|(_, f, _)| *f)
                .collect();
            assert!(!fractions.is_empty(), "pass {pass} never reported");
            assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(*fractions.last().unwrap(), 1.0);
        }
        // Measurements are attached once the election has run.
        assert!(seen.iter().filter(|(p, _, _)| *p >= 2).all(|(_, _, m)| *m));
        // Passes arrive in order.
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn refinement_can_be_disabled() {
        let mut input = episode(1);
        // Keep a single pause, with a breath bump at its start.
        input.windows.truncate(52);
        input.windows[0].rms_db = -52.0;
        input.windows[1].rms_db = -51.0;

        let refined = run(&input).unwrap();
        assert!(refined
            .measurements
            .elected_silence()
            .is_some_and(|c| c.was_refined()));

        let config = AnalysisConfig {
            refine: false,
            ..AnalysisConfig::default()
        };
        let plain = AnalysisPipeline::new(config, Thresholds::default())
            .analyze(&input, &CancellationToken::new(), &NoProgress)
            .unwrap();
        let m = &plain.measurements;
        assert!(m.silence_candidates.iter().all(|c| !c.was_refined()));
        assert!(m.speech_candidates.iter().all(|c| !c.was_refined()));
    }

    #[test]
    fn measured_silence_threshold_drives_silence_scan() {
        let mut input = episode(1);
        // Room tone sits above this threshold, so nothing qualifies as silence.
        input.statistics.noise.silence_threshold_db = -70.0;
        let report = run(&input).unwrap();
        assert!(report.measurements.silence_candidates.is_empty());
        assert!(report.measurements.noise_profile.is_none());
    }
}
