//! Pipeline orchestration: one file end to end, and many files at once.
//!
//! # Architecture
//!
//! ```text
//! <input>.json ──load_input──► AnalysisInput
//!                                   │
//!                                   ▼
//!        AnalysisPipeline::analyze()   ← spawn_blocking, one per file
//!                                   │
//!          ├─ silence_scan ─┐        (cancel checked every 64 windows)
//!          ├─ speech_scan  ─┤──► ProgressSink
//!          ├─ election     ─┤
//!          └─ configure    ─┘
//!                                   │
//!                                   ▼
//!                            AnalysisReport ──write_report──► <stem>.report.json
//!
//! BatchRunner::run()  ← async, Semaphore(max_parallel_files)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use tokio_util::sync::CancellationToken;
//! use voice_autoclean::config::AppConfig;
//! use voice_autoclean::pipeline::{AnalysisPipeline, BatchRunner};
//! use voice_autoclean::thresholds::Thresholds;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let pipeline = AnalysisPipeline::new(config.analysis.clone(), Thresholds::default());
//!     let runner = BatchRunner::new(pipeline, &config.batch, config.output.clone());
//!
//!     let summary = runner
//!         .run(vec![PathBuf::from("take1.json")], CancellationToken::new())
//!         .await;
//!     println!("{} ok, {} failed", summary.succeeded(), summary.failed());
//! }
//! ```

pub mod batch;
pub mod io;
pub mod progress;
pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use batch::{BatchError, BatchRunner, BatchSummary, FileOutcome};
pub use io::{load_input, render_report, report_path, write_report, InputError};
pub use progress::{LogProgress, NoProgress, ProgressSink};
pub use runner::{
    AnalysisError, AnalysisPipeline, AnalysisReport, CANCEL_CHECK_STRIDE,
    DEFAULT_SILENCE_THRESHOLD_DB, DEFAULT_SPEECH_THRESHOLD_DB, PASSES,
};
