//! CSV adapter: Implementation of TrainingSource.
//!
//! Reads a UTF-8 CSV with a header row. Feature columns are located by name,
//! so column order in the file is free and extra columns are ignored. Cells
//! are kept as raw strings; coercion happens in the preprocessor.

use std::path::{Path, PathBuf};

use crate::domain::{PatientRecord, RecordError, FIELD_COUNT, FIELD_NAMES, LABEL_COLUMN};
use crate::ports::{TrainingSource, TrainingTable};

/// Error type for dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to open dataset {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column in header: {0}")]
    MissingColumn(String),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("Row {row}: invalid {LABEL_COLUMN} label '{value}' (expected 0 or 1)")]
    InvalidLabel { row: usize, value: String },

    #[error("Dataset contains no rows")]
    Empty,
}

/// Training data read from a CSV file.
#[derive(Debug, Clone)]
pub struct CsvTrainingSource {
    path: PathBuf,
}

impl CsvTrainingSource {
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrainingSource for CsvTrainingSource {
    type Error = DatasetError;

    fn load(&self) -> Result<TrainingTable, DatasetError> {
        let file = std::fs::File::open(&self.path).map_err(|source| DatasetError::Open {
            path: self.path.display().to_string(),
            source,
        })?;
        let table = read_table(file)?;
        tracing::info!(
            "Loaded {} labelled records from {}",
            table.len(),
            self.path.display()
        );
        Ok(table)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Parse a labelled table from any reader.
///
/// # Errors
/// Returns `DatasetError` on malformed CSV, missing columns, bad labels or
/// an empty table.
pub fn read_table<R: std::io::Read>(reader: R) -> Result<TrainingTable, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let locate = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    };

    let mut columns = [0usize; FIELD_COUNT];
    for (slot, name) in columns.iter_mut().zip(FIELD_NAMES.iter()) {
        *slot = locate(*name)?;
    }
    let label_column = locate(LABEL_COLUMN)?;

    let mut records = Vec::new();
    let mut labels = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        // Row numbers in errors are 1-based data rows (header excluded).
        let row_number = i + 1;

        let raw_label = row.get(label_column).unwrap_or_default().trim();
        labels.push(parse_label(raw_label).ok_or_else(|| DatasetError::InvalidLabel {
            row: row_number,
            value: raw_label.to_string(),
        })?);

        let values = columns
            .iter()
            .map(|&c| row.get(c).unwrap_or_default().to_string())
            .collect();
        records.push(PatientRecord::from_values(values)?);
    }

    if records.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(TrainingTable::new(records, labels))
}

/// Labels are read as numbers, so "1", "1.0" and "0.0" are all accepted.
fn parse_label(raw: &str) -> Option<usize> {
    let value: f64 = raw.parse().ok()?;
    if value == 0.0 {
        Some(0)
    } else if value == 1.0 {
        Some(1)
    } else {
        None
    }
}
