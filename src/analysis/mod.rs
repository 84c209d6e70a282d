//! Region analysis: scan → elect → refine → profile.
//!
//! # Pipeline
//!
//! ```text
//! WindowMeasurement stream ─▶ RegionScanner (silence) ─▶ candidates ─▶ RegionElector ─▶ NoiseProfile
//!                          └▶ RegionScanner (speech)  ─▶ candidates ─▶ RegionElector ─▶ SpeechProfile
//! ```
//!
//! Every stage is a pure function of the measurement stream.  Empty
//! results (no candidates, no election, no profile) are normal outcomes and
//! consumers fall back to whole-file aggregates.
//!
//! # Quick Start
//!
//! ```rust
//! use voice_autoclean::analysis::{
//!     build_noise_profile, RegionElector, RegionScanner, RunLimits, SilenceClassifier,
//!     SilenceScorer, SlidingRefiner, WindowMeasurement,
//! };
//!
//! let windows: Vec<WindowMeasurement> = (0..12)
//!     .map(|i| WindowMeasurement {
//!         start: i as f64 * 0.25,
//!         duration: 0.25,
//!         rms_db: -68.0,
//!         peak_db: -60.0,
//!         ..Default::default()
//!     })
//!     .collect();
//!
//! let classifier = SilenceClassifier { threshold_db: -50.0 };
//! let scorer = SilenceScorer::default();
//! let limits = RunLimits { min_windows: 4, max_windows: 40, max_gap_windows: 0 };
//!
//! let mut candidates = RegionScanner::new(&classifier, &scorer, limits).scan(&windows);
//! let refiner = SlidingRefiner::new(4);
//! let elected = RegionElector::new(&scorer, &refiner).elect(&mut candidates, &windows);
//!
//! let profile = build_noise_profile(elected.map(|i| &candidates[i])).unwrap();
//! assert!(profile.floor_db < -60.0);
//! ```

pub mod elector;
pub mod measurements;
pub mod profile;
pub mod region;
pub mod scanner;
pub mod scoring;

pub use elector::{NoRefinement, RefinementStrategy, RegionElector, SlidingRefiner};
pub use measurements::{
    db_to_linear, linear_to_db, Amplitude, AnalysisInput, AudioMeasurements, FileStatistics,
    Loudness, NoiseContext, SpectralMetrics, WindowMeasurement,
};
pub use profile::{build_noise_profile, build_speech_profile, NoiseProfile, SpeechProfile};
pub use region::{RegionCandidate, RegionKind, RegionMetrics, Refinement, RefinementError, Window};
pub use scanner::{
    RegionScanner, RunLimits, ScanInterrupted, SilenceClassifier, SpeechClassifier,
    WindowClassifier,
};
pub use scoring::{CandidateScorer, SilenceScorer, SpeechScorer};
