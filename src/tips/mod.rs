//! Recording tips: advice on how to record better next time.
//!
//! Stateless: every call to [`TipEngine::evaluate`] starts from scratch and
//! returns at most [`MAX_RECORDING_TIPS`] tips, highest priority first.

pub mod engine;
pub mod rules;

pub use engine::{evaluate_tips, Exclusion, TipEngine, EXCLUSIONS, MAX_RECORDING_TIPS};
pub use rules::{RecordingTip, RuleId, TipContext, TipRule, RULES};
