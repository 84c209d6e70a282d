//! Multi-file driver.
//!
//! Every input file runs its own sequential pipeline on
//! `tokio::task::spawn_blocking`; at most `max_parallel_files` run at once.
//! A failing file is recorded in the [`BatchSummary`] and the rest carry
//! on.  Outcomes come back in input order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::{BatchConfig, OutputConfig};

use super::io::{load_input, report_path, write_report, InputError};
use super::progress::LogProgress;
use super::runner::{AnalysisError, AnalysisPipeline, AnalysisReport};

// ---------------------------------------------------------------------------
// BatchError / outcomes
// ---------------------------------------------------------------------------

/// Why one file of a batch produced no report.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("{}: {source}", path.display())]
    Analysis {
        path: PathBuf,
        #[source]
        source: AnalysisError,
    },
    /// The blocking worker panicked or was aborted.
    #[error("{}: worker failed: {message}", path.display())]
    Worker { path: PathBuf, message: String },
}

impl BatchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            BatchError::Analysis {
                source: AnalysisError::Cancelled,
                ..
            }
        )
    }
}

/// Result for one input file.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<AnalysisReport, BatchError>,
    /// Report file, when an output directory is configured.
    pub written_to: Option<PathBuf>,
}

impl FileOutcome {
    fn failed(path: PathBuf, error: BatchError) -> Self {
        Self {
            path,
            result: Err(error),
            written_to: None,
        }
    }
}

/// Outcomes of a whole batch, in input order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// `true` when there was at least one input and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }
}

// ---------------------------------------------------------------------------
// BatchRunner
// ---------------------------------------------------------------------------

/// Runs the analysis pipeline over many files with bounded parallelism.
pub struct BatchRunner {
    pipeline: Arc<AnalysisPipeline>,
    max_parallel: usize,
    output: OutputConfig,
}

impl BatchRunner {
    pub fn new(pipeline: AnalysisPipeline, batch: &BatchConfig, output: OutputConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            max_parallel: batch.max_parallel_files.max(1),
            output,
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Analyse every input.  Cancelling `cancel` stops running files at
    /// their next check and fails files that have not started.
    pub async fn run(&self, inputs: Vec<PathBuf>, cancel: CancellationToken) -> BatchSummary {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        log::info!(
            "batch: {} file(s), {} at a time, refinement {}",
            inputs.len(),
            self.max_parallel,
            if self.pipeline.config().refine { "on" } else { "off" }
        );

        let mut handles = Vec::with_capacity(inputs.len());
        for path in inputs {
            let semaphore = Arc::clone(&semaphore);
            let pipeline = Arc::clone(&self.pipeline);
            let output = self.output.clone();
            let cancel = cancel.clone();
            let task_path = path.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return FileOutcome::failed(
                            task_path.clone(),
                            BatchError::Worker {
                                path: task_path,
                                message: e.to_string(),
                            },
                        )
                    }
                };

                let worker_path = task_path.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    process_file(&pipeline, &worker_path, &output, &cancel)
                })
                .await;

                match joined {
                    Ok(outcome) => outcome,
                    Err(e) => FileOutcome::failed(
                        task_path.clone(),
                        BatchError::Worker {
                            path: task_path,
                            message: e.to_string(),
                        },
                    ),
                }
            });
            handles.push((path, handle));
        }

        let mut summary = BatchSummary::default();
        for (path, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => FileOutcome::failed(
                    path.clone(),
                    BatchError::Worker {
                        path,
                        message: e.to_string(),
                    },
                ),
            };
            summary.outcomes.push(outcome);
        }

        log::info!(
            "batch: {} succeeded, {} failed",
            summary.succeeded(),
            summary.failed()
        );
        summary
    }
}

/// Load → analyse → (write) for one file.  Runs on a blocking thread.
fn process_file(
    pipeline: &AnalysisPipeline,
    path: &Path,
    output: &OutputConfig,
    cancel: &CancellationToken,
) -> FileOutcome {
    match analyse_file(pipeline, path, output, cancel) {
        Ok((report, written_to)) => FileOutcome {
            path: path.to_path_buf(),
            result: Ok(report),
            written_to,
        },
        Err(e) => {
            if e.is_cancelled() {
                log::info!("{}: cancelled", path.display());
            } else {
                log::warn!("{e}");
            }
            FileOutcome::failed(path.to_path_buf(), e)
        }
    }
}

fn analyse_file(
    pipeline: &AnalysisPipeline,
    path: &Path,
    output: &OutputConfig,
    cancel: &CancellationToken,
) -> Result<(AnalysisReport, Option<PathBuf>), BatchError> {
    let analysis_err = |source| BatchError::Analysis {
        path: path.to_path_buf(),
        source,
    };
    if cancel.is_cancelled() {
        return Err(analysis_err(AnalysisError::Cancelled));
    }

    let input = load_input(path)?;
    let progress = LogProgress {
        source: input.source.clone(),
    };
    let report = pipeline
        .analyze(&input, cancel, &progress)
        .map_err(analysis_err)?;

    let written_to = match &output.output_dir {
        Some(dir) => {
            let out = report_path(dir, path);
            write_report(&report, &out, output.pretty)?;
            Some(out)
        }
        None => None,
    };
    Ok((report, written_to))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
