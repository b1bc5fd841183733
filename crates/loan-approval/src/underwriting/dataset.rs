//! Historical application CSV loader.
//!
//! Expects a header row naming the applicant fields plus `Loan_Status`; the
//! `Loan_ID` column and any other extra column is ignored. Header names are
//! matched case-insensitively. Rows that cannot be parsed are skipped and
//! reported in [`HistoricalDataset::row_errors`] instead of failing the load.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{info, warn};

use super::record::ApplicantRecord;
use super::schema::{Feature, FEATURE_ORDER};

const LABEL_COLUMN: &str = "Loan_Status";

/// One historical application with its recorded outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub record: ApplicantRecord,
    pub approved: bool,
}

/// A row that was skipped while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct HistoricalDataset {
    pub records: Vec<LabeledRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to open dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read dataset header: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset has no `{0}` column")]
    MissingColumn(&'static str),
    #[error("dataset contains no usable rows ({rows_read} read, {rejected} rejected)")]
    Empty { rows_read: usize, rejected: usize },
}

impl HistoricalDataset {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows_read = dataset.rows_read,
            rows_used = dataset.records.len(),
            rows_skipped = dataset.row_errors.len(),
            "historical dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let header_map = build_header_map(&headers);
        let label_index = *header_map
            .get(&normalize_header_name(LABEL_COLUMN))
            .ok_or(DatasetError::MissingColumn(LABEL_COLUMN))?;
        let columns: Vec<(Feature, usize)> = FEATURE_ORDER
            .iter()
            .filter_map(|feature| {
                header_map
                    .get(&normalize_header_name(feature.name()))
                    .map(|index| (*feature, *index))
            })
            .collect();

        let mut records = Vec::new();
        let mut row_errors = Vec::new();
        let mut rows_read = 0usize;

        for (idx, result) in reader.records().enumerate() {
            // Header occupies line 1.
            let line = idx + 2;
            rows_read += 1;

            let parsed = result
                .map_err(|error| format!("CSV parse error: {error}"))
                .and_then(|row| parse_row(&row, &columns, label_index));
            match parsed {
                Ok(labeled) => records.push(labeled),
                Err(message) => {
                    warn!(line, %message, "skipping dataset row");
                    row_errors.push(RowError { line, message });
                }
            }
        }

        if records.is_empty() {
            return Err(DatasetError::Empty {
                rows_read,
                rejected: row_errors.len(),
            });
        }

        Ok(Self {
            records,
            row_errors,
            rows_read,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_row(
    row: &StringRecord,
    columns: &[(Feature, usize)],
    label_index: usize,
) -> Result<LabeledRecord, String> {
    let approved = parse_label(row.get(label_index).unwrap_or_default())?;

    let mut record = ApplicantRecord::default();
    for &(feature, index) in columns {
        let cell = row.get(index).unwrap_or_default();
        if cell.is_empty() {
            continue;
        }
        match feature {
            Feature::Categorical(field) => record.set_categorical(field, Some(cell.to_string())),
            Feature::Numeric(field) => {
                let value = cell
                    .parse::<f64>()
                    .map_err(|_| format!("{} is not a number: '{cell}'", field.name()))?;
                if !value.is_finite() || value < 0.0 {
                    return Err(format!(
                        "{} must be a finite, non-negative number: '{cell}'",
                        field.name()
                    ));
                }
                record.set_numeric(field, Some(value));
            }
        }
    }

    Ok(LabeledRecord { record, approved })
}

fn parse_label(cell: &str) -> Result<bool, String> {
    match cell.to_ascii_uppercase().as_str() {
        "Y" | "YES" | "1" => Ok(true),
        "N" | "NO" | "0" => Ok(false),
        "" => Err(format!("{LABEL_COLUMN} is empty")),
        _ => Err(format!("{LABEL_COLUMN} must be Y or N: '{cell}'")),
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}
