//! Configuration module for voice-autoclean.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for analysis,
//! batching and output, `AppPaths` for cross-platform directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AnalysisConfig, AppConfig, BatchConfig, OutputConfig, RegionScanConfig};
