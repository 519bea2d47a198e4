//! Run output persistence.
//!
//! One run writes up to three files sharing a `%Y%m%d_%H%M%S` timestamp:
//! `risk_report_<ts>.json`, `annotated_contract_<ts>.md` and, when a summary
//! was produced, `executive_summary_<ts>.txt`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::StoreError;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Paths written by [`ReportStore::save_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRun {
    pub report: PathBuf,
    pub annotated: PathBuf,
    pub summary: Option<PathBuf>,
}

/// Output directory for analysis runs.
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    /// Open (creating if needed) the output directory.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_run<R: Serialize>(
        &self,
        report: &R,
        annotated: &str,
        summary: Option<&str>,
        at: DateTime<Local>,
    ) -> Result<SavedRun, StoreError> {
        let ts = at.format(TIMESTAMP_FORMAT).to_string();

        let report_path = self.dir.join(format!("risk_report_{ts}.json"));
        std::fs::write(&report_path, serde_json::to_string_pretty(report)?)?;
        info!(path = %report_path.display(), "saved risk report");

        let annotated_path = self.dir.join(format!("annotated_contract_{ts}.md"));
        std::fs::write(&annotated_path, annotated)?;
        info!(path = %annotated_path.display(), "saved annotated contract");

        let summary_path = match summary {
            Some(text) => {
                let path = self.dir.join(format!("executive_summary_{ts}.txt"));
                std::fs::write(&path, text)?;
                info!(path = %path.display(), "saved executive summary");
                Some(path)
            }
            None => None,
        };

        Ok(SavedRun {
            report: report_path,
            annotated: annotated_path,
            summary: summary_path,
        })
    }
}
