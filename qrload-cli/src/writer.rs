use qrload::core::RunReport;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Unable to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unable to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persists a [`RunReport`] as pretty-printed JSON.
#[derive(Debug, Clone, Default)]
pub struct ReportWriter {
    path: Option<PathBuf>,
}

impl ReportWriter {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// `qrload_results_<unix time>.json` in the working directory.
    pub fn default_path(report: &RunReport) -> PathBuf {
        PathBuf::from(format!(
            "qrload_results_{}.json",
            report.started_at.unix_timestamp()
        ))
    }

    pub fn path_for(&self, report: &RunReport) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| Self::default_path(report))
    }

    /// Returns where the report ended up.
    pub fn write(&self, report: &RunReport) -> Result<PathBuf, WriteError> {
        let path = self.path_for(report);
        let json = serde_json::to_vec_pretty(report)?;
        write_file(&path, &json)?;
        Ok(path)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), WriteError> {
    std::fs::write(path, contents).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}
