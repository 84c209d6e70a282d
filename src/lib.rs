//! Adaptive voice-cleanup analysis.
//!
//! Takes pre-scanned measurements of a voice recording, finds the best
//! silence and speech regions, and derives a filter-chain configuration plus
//! advice on how to record better next time.
//!
//! | Module | Role |
//! |--------|------|
//! | [`analysis`] | scan → elect → refine → profile |
//! | [`configurator`] | measurements → [`configurator::FilterChainConfig`] |
//! | [`tips`] | measurements → ranked [`tips::RecordingTip`]s |
//! | [`thresholds`] | constants shared by the configurator and the tips |
//! | [`pipeline`] | per-file passes, cancellation, progress, batching |
//! | [`config`] | `settings.toml` and platform paths |

pub mod analysis;
pub mod config;
pub mod configurator;
pub mod pipeline;
pub mod thresholds;
pub mod tips;
