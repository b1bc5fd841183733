use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{Local, NaiveDateTime};

use super::predictor::{DecisionStatus, PredictionResult, RiskTier};
use super::record::ApplicantRecord;
use super::schema::FEATURE_ORDER;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One decision as written to the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub recorded_at: NaiveDateTime,
    pub applicant: ApplicantRecord,
    pub status: DecisionStatus,
    pub risk_tier: RiskTier,
    pub confidence: f64,
}

impl AuditEntry {
    /// Entry stamped with the current local time.
    pub fn new(applicant: ApplicantRecord, result: &PredictionResult) -> Self {
        Self {
            recorded_at: Local::now().naive_local(),
            applicant,
            status: result.status,
            risk_tier: result.risk_tier,
            confidence: result.confidence,
        }
    }

    fn csv_row(&self) -> Vec<String> {
        let mut row: Vec<String> = FEATURE_ORDER
            .iter()
            .map(|feature| self.applicant.display_value(*feature))
            .collect();
        row.push(self.status.label().to_string());
        row.push(self.risk_tier.label().to_string());
        row.push(format!("{:.4}", self.confidence));
        row.push(self.recorded_at.format(DATE_FORMAT).to_string());
        row
    }
}

/// Append-only destination for decision records.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log {path} unavailable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write audit row: {0}")]
    Csv(#[from] csv::Error),
}

/// CSV history file with one row per decision. The header is written only
/// when the file is new or empty.
#[derive(Debug)]
pub struct CsvAuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header() -> Vec<&'static str> {
        let mut header: Vec<&'static str> =
            FEATURE_ORDER.iter().map(|feature| feature.name()).collect();
        header.extend(["Status", "Risk", "Confidence", "Date"]);
        header
    }

    fn io_error(&self, source: std::io::Error) -> AuditError {
        AuditError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl AuditSink for CsvAuditLog {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        // Writers only serialise file access; a panic elsewhere leaves nothing to repair.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        let needs_header = file
            .metadata()
            .map_err(|source| self.io_error(source))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(Self::header())?;
        }
        writer.write_record(entry.csv_row())?;
        writer.flush().map_err(|source| self.io_error(source))?;
        Ok(())
    }
}
