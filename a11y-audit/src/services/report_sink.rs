//! Report persistence
//!
//! [`JsonFileSink`] writes `audit_results_<YYYYMMDD_HHMMSS>.json` into the
//! output directory. Files are opened with create-new semantics, so an
//! artifact from another run is never overwritten; on a name collision a
//! numeric suffix is appended. [`ReportCatalog`] lists saved artifacts.

use crate::error::AuditResult;
use crate::models::report::{SavedReportInfo, SavedReportsStatus};
use crate::models::AuditReport;
use a11y_common::time::artifact_timestamp;
use chrono::{DateTime, Utc};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Artifact file name prefix
pub const ARTIFACT_PREFIX: &str = "audit_results_";

/// Upper bound on collision suffixes tried before giving up
const MAX_SUFFIX: usize = 1000;

/// Destination for a finished report
pub trait ReportSink: Send + Sync {
    /// Persist the report, returning where it was written
    fn persist(&self, report: &AuditReport) -> AuditResult<PathBuf>;
}

/// Pretty JSON files in a directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn candidate_path(&self, stem: &str, attempt: usize) -> PathBuf {
        let name = if attempt == 0 {
            format!("{}.json", stem)
        } else {
            format!("{}_{}.json", stem, attempt)
        };
        self.output_dir.join(name)
    }
}

impl ReportSink for JsonFileSink {
    fn persist(&self, report: &AuditReport) -> AuditResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let json = serde_json::to_vec_pretty(report)?;
        let stem = format!("{}{}", ARTIFACT_PREFIX, artifact_timestamp(&report.audit_timestamp));

        for attempt in 0..MAX_SUFFIX {
            let path = self.candidate_path(&stem, attempt);
            match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(&json)?;
                    file.sync_all()?;
                    tracing::info!(path = %path.display(), run_id = %report.run_id, "Audit report saved");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %path.display(), "Report name taken, trying next suffix");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("No free report name for {} after {} attempts", stem, MAX_SUFFIX),
        )
        .into())
    }
}

/// Saved artifacts in one directory
#[derive(Debug, Clone)]
pub struct ReportCatalog {
    output_dir: PathBuf,
}

impl ReportCatalog {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.output_dir
    }

    /// Saved reports, newest first (ties broken by name, descending)
    pub fn list(&self) -> AuditResult<(SavedReportsStatus, Vec<SavedReportInfo>)> {
        let entries = match std::fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok((SavedReportsStatus::NoDirectory, Vec::new()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !file_name.starts_with(ARTIFACT_PREFIX) || !file_name.ends_with(".json") {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            files.push(SavedReportInfo {
                file_name,
                size_bytes: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.file_name.cmp(&a.file_name)));

        let status = if files.is_empty() {
            SavedReportsStatus::NoFiles
        } else {
            SavedReportsStatus::Found
        };
        Ok((status, files))
    }
}
