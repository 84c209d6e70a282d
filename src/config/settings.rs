//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::analysis::RunLimits;

// ---------------------------------------------------------------------------
// RegionScanConfig
// ---------------------------------------------------------------------------

/// Scanner and elector knobs for one region class.
///
/// Counts are in analysis windows (the collaborator's fixed window size).
/// There is no `Default`: each class starts from its own preset, and fields
/// missing from `settings.toml` keep that class's preset value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionScanConfig {
    /// Classification threshold, dBFS.  `None` for silence means "use the
    /// measured silence-detector threshold, else −50 dBFS".
    pub threshold_db: Option<f64>,
    /// Shortest run that becomes a candidate.
    pub min_windows: usize,
    /// Longest candidate; longer runs are split.
    pub max_windows: usize,
    /// Non-qualifying windows bridged inside a run.
    pub max_gap_windows: usize,
    /// Sub-window length used when refining the elected candidate.
    pub refine_windows: usize,
    /// Duration at which a candidate earns full duration credit, seconds.
    pub reference_secs: f64,
}

impl RegionScanConfig {
    pub fn silence() -> Self {
        Self {
            threshold_db: None,
            min_windows: 4,
            max_windows: 80,
            max_gap_windows: 0,
            refine_windows: 4,
            reference_secs: 1.0,
        }
    }

    pub fn speech() -> Self {
        Self {
            threshold_db: Some(-35.0),
            min_windows: 8,
            max_windows: 120,
            max_gap_windows: 2,
            refine_windows: 8,
            reference_secs: 2.0,
        }
    }

    pub fn run_limits(&self) -> RunLimits {
        RunLimits {
            min_windows: self.min_windows,
            max_windows: self.max_windows,
            max_gap_windows: self.max_gap_windows,
        }
    }
}

/// A `[analysis.silence]` / `[analysis.speech]` table as written on disk.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegionScanTable {
    threshold_db: Option<f64>,
    min_windows: Option<usize>,
    max_windows: Option<usize>,
    max_gap_windows: Option<usize>,
    refine_windows: Option<usize>,
    reference_secs: Option<f64>,
}

impl RegionScanTable {
    fn over(self, preset: RegionScanConfig) -> RegionScanConfig {
        RegionScanConfig {
            threshold_db: self.threshold_db.or(preset.threshold_db),
            min_windows: self.min_windows.unwrap_or(preset.min_windows),
            max_windows: self.max_windows.unwrap_or(preset.max_windows),
            max_gap_windows: self.max_gap_windows.unwrap_or(preset.max_gap_windows),
            refine_windows: self.refine_windows.unwrap_or(preset.refine_windows),
            reference_secs: self.reference_secs.unwrap_or(preset.reference_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Settings for the scan → elect → refine passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AnalysisTable")]
pub struct AnalysisConfig {
    /// Search elected candidates for a tighter golden sub-region.
    pub refine: bool,
    pub silence: RegionScanConfig,
    pub speech: RegionScanConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            refine: true,
            silence: RegionScanConfig::silence(),
            speech: RegionScanConfig::speech(),
        }
    }
}

/// The `[analysis]` table as written on disk.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisTable {
    refine: Option<bool>,
    silence: RegionScanTable,
    speech: RegionScanTable,
}

impl From<AnalysisTable> for AnalysisConfig {
    fn from(table: AnalysisTable) -> Self {
        Self {
            refine: table.refine.unwrap_or(true),
            silence: table.silence.over(RegionScanConfig::silence()),
            speech: table.speech.over(RegionScanConfig::speech()),
        }
    }
}

// ---------------------------------------------------------------------------
// BatchConfig
// ---------------------------------------------------------------------------

/// Multi-file processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Files analysed concurrently (at least 1).
    pub max_parallel_files: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_parallel_files: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Where and how reports are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for `<stem>.report.json` files; `None` prints to stdout.
    pub output_dir: Option<PathBuf>,
    /// Indent JSON output.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            pretty: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_autoclean::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Region scan / election settings.
    pub analysis: AnalysisConfig,
    /// Parallelism across input files.
    pub batch: BatchConfig,
    /// Report destination and formatting.
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
