//! Application entry point for `voice-autoclean`.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse arguments.
//! 3. Load [`AppConfig`] (explicit `--config`, else the platform file, else
//!    defaults) and apply command-line overrides.
//! 4. Create the [`tokio`] runtime.
//! 5. Install the Ctrl-C handler that cancels the batch.
//! 6. Run the [`BatchRunner`] and print reports that were not written to
//!    an output directory.
//!
//! Exits non-zero when every input failed.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use voice_autoclean::{
    config::AppConfig,
    pipeline::{render_report, AnalysisPipeline, BatchRunner},
    thresholds::Thresholds,
};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Derive voice-cleanup filter settings from pre-scanned measurements.
#[derive(Parser, Debug)]
#[command(name = "voice-autoclean")]
#[command(version)]
struct Args {
    /// Measurement documents (JSON), one per recording
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Settings file (defaults to the platform settings.toml)
    #[arg(short, long, env = "VOICE_AUTOCLEAN_CONFIG")]
    config: Option<PathBuf>,

    /// Write `<stem>.report.json` files here instead of printing them
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Keep elected regions as scanned
    #[arg(long)]
    no_refine: bool,

    /// Files analysed concurrently
    #[arg(short, long)]
    jobs: Option<usize>,
}

impl Args {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => {
                if AppConfig::is_first_run() {
                    log::info!("No settings file yet; using defaults");
                }
                AppConfig::load().context("failed to load settings")?
            }
        };

        if let Some(dir) = &self.output_dir {
            config.output.output_dir = Some(dir.clone());
        }
        if self.no_refine {
            config.analysis.refine = false;
        }
        if let Some(jobs) = self.jobs {
            config.batch.max_parallel_files = jobs;
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2–3. Arguments and configuration
    let args = Args::parse();
    let config = args.load_config()?;
    log::info!(
        "voice-autoclean starting: {} input(s), thresholds v{}",
        args.inputs.len(),
        Thresholds::VERSION
    );

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let pipeline = AnalysisPipeline::new(config.analysis.clone(), Thresholds::default());
    let runner = BatchRunner::new(pipeline, &config.batch, config.output.clone());
    let cancel = CancellationToken::new();

    let summary = rt.block_on(async {
        // 5. Ctrl-C cancels whatever is still running
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted; cancelling");
                on_signal.cancel();
            }
        });

        // 6. Batch
        runner.run(args.inputs.clone(), cancel.clone()).await
    });

    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(report) if outcome.written_to.is_none() => {
                let json = render_report(report, config.output.pretty)
                    .with_context(|| format!("{}: cannot render report", outcome.path.display()))?;
                println!("{json}");
            }
            Ok(_) => {}
            Err(e) => eprintln!("error: {e}"),
        }
    }

    if summary.all_failed() {
        bail!("all {} input(s) failed", summary.outcomes.len());
    }
    if summary.failed() > 0 {
        log::warn!(
            "{} of {} input(s) failed",
            summary.failed(),
            summary.outcomes.len()
        );
    }
    Ok(())
}
