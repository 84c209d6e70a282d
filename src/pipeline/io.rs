//! Reading measurement documents and writing reports.
//!
//! This is the only place the crate touches the filesystem for analysis
//! data, and the only place a fatal per-file error can originate.

use std::io;
use std::path::{Path, PathBuf};

use crate::analysis::AnalysisInput;

use super::runner::AnalysisReport;

/// Fatal I/O or decoding failure for one file.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{}: cannot read: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: not a measurement document: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}: cannot write report: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InputError {
    /// The file the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            InputError::Read { path, .. }
            | InputError::Parse { path, .. }
            | InputError::Write { path, .. } => path,
        }
    }
}

/// Load an [`AnalysisInput`] JSON document.
///
/// An empty `source` field is filled in with `path`.
pub fn load_input(path: &Path) -> Result<AnalysisInput, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut input: AnalysisInput =
        serde_json::from_str(&content).map_err(|source| InputError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if input.source.is_empty() {
        input.source = path.display().to_string();
    }
    log::debug!(
        "{}: loaded {} window(s)",
        path.display(),
        input.windows.len()
    );
    Ok(input)
}

/// `<dir>/<input stem>.report.json`.
pub fn report_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".into());
    dir.join(format!("{stem}.report.json"))
}

/// Serialise a report to JSON text.
pub fn render_report(report: &AnalysisReport, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
}

/// Write a report to `path`, creating parent directories as needed.
pub fn write_report(report: &AnalysisReport, path: &Path, pretty: bool) -> Result<(), InputError> {
    let write_err = |source: io::Error| InputError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = render_report(report, pretty).map_err(|e| write_err(e.into()))?;
    std::fs::write(path, json).map_err(write_err)?;
    log::debug!("report written to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AudioMeasurements;
    use crate::configurator::configure;
    use tempfile::tempdir;

    #[test]
    fn load_fills_in_source() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("take1.json");
        std::fs::write(&path, r#"{ "windows": [] }"#).expect("write");

        let input = load_input(&path).expect("load");
        assert_eq!(input.source, path.display().to_string());
        assert!(input.windows.is_empty());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("missing.json");
        let err = load_input(&path).unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "RIFF....WAVEfmt ").expect("write");
        let err = load_input(&path).unwrap_err();
        assert!(matches!(err, InputError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn report_path_uses_input_stem() {
        let p = report_path(Path::new("/out"), Path::new("/in/interview.take2.json"));
        assert_eq!(p, PathBuf::from("/out/interview.take2.report.json"));
    }

    #[test]
    fn written_report_reads_back() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("a.report.json");
        let measurements = AudioMeasurements::default();
        let report = AnalysisReport {
            source: "a.wav".into(),
            config: configure(&measurements),
            measurements,
            tips: Vec::new(),
        };

        write_report(&report, &path, false).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        let back: AnalysisReport = serde_json::from_str(&text).expect("parse");
        assert_eq!(back.source, "a.wav");
        assert_eq!(back.config.highpass_hz, report.config.highpass_hz);
        assert_eq!(back.config.normalization_mode, report.config.normalization_mode);
        assert_eq!(back.config.thresholds_version, report.config.thresholds_version);
    }
}
