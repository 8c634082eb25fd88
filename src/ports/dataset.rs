//! Training data port: Trait for loading labelled patient records.

use crate::domain::{PatientRecord, FIELD_NAMES};

/// Labelled records as read from a training source.
#[derive(Debug, Clone, Default)]
pub struct TrainingTable {
    /// Records in source order
    pub records: Vec<PatientRecord>,
    /// `Dementia` label per record (0 or 1)
    pub labels: Vec<usize>,
}

impl TrainingTable {
    /// Create a table; records and labels must have the same length.
    #[must_use]
    pub fn new(records: Vec<PatientRecord>, labels: Vec<usize>) -> Self {
        debug_assert_eq!(records.len(), labels.len());
        Self { records, labels }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw values of one column across all records.
    pub fn column<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let index = FIELD_NAMES.iter().position(|f| *f == name);
        self.records
            .iter()
            .filter_map(move |r| index.map(|i| r.value(i)))
    }
}

/// Trait for sources of training data.
pub trait TrainingSource {
    /// Error type for load operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load every labelled record.
    ///
    /// # Errors
    /// Returns error if the source cannot be read or is malformed.
    fn load(&self) -> Result<TrainingTable, Self::Error>;

    /// Short description for logs (e.g. the file path).
    fn describe(&self) -> String;
}
