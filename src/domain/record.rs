//! Patient record types for dementia risk screening.
//!
//! A record is the 22 raw attribute values of one patient, kept as strings
//! in the canonical field order. Coercion to numbers and category codes is
//! the preprocessor's job; this module only knows the layout.

use serde::{Deserialize, Serialize};

/// Number of feature fields in a record.
pub const FIELD_COUNT: usize = 22;

/// Feature names in canonical order.
///
/// This is both the order of a comma-joined prediction record and the column
/// order of every feature matrix the crate builds.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "Diabetic",
    "AlcoholLevel",
    "HeartRate",
    "BloodOxygenLevel",
    "BodyTemperature",
    "Weight",
    "MRI_Delay",
    "Prescription",
    "Dosage in mg",
    "Age",
    "Dominant_Hand",
    "Gender",
    "Family_History",
    "Smoking_Status",
    "APOE_ε4",
    "Physical_Activity",
    "Depression_Status",
    "Cognitive_Test_Scores",
    "Medication_History",
    "Nutrition_Diet",
    "Sleep_Quality",
    "Chronic_Health_Conditions",
];

/// Columns holding free-text categories. Every other field is numeric.
pub const CATEGORICAL_COLUMNS: [&str; 12] = [
    "Prescription",
    "Dominant_Hand",
    "Gender",
    "Family_History",
    "Smoking_Status",
    "APOE_ε4",
    "Physical_Activity",
    "Depression_Status",
    "Medication_History",
    "Nutrition_Diet",
    "Sleep_Quality",
    "Chronic_Health_Conditions",
];

/// Binary target column, present only in training data.
pub const LABEL_COLUMN: &str = "Dementia";

/// How a column is coerced before modelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Parsed as `f64`; unparsable values become missing.
    Numeric,
    /// Label-encoded against the training vocabulary.
    Categorical,
}

impl ColumnKind {
    /// Kind of the named column.
    #[must_use]
    pub fn of(name: &str) -> Self {
        if CATEGORICAL_COLUMNS.contains(&name) {
            Self::Categorical
        } else {
            Self::Numeric
        }
    }
}

/// Position of a field in the canonical order.
#[must_use]
pub fn field_index(name: &str) -> Option<usize> {
    FIELD_NAMES.iter().position(|f| *f == name)
}

/// Errors raised while assembling a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Expected {expected} comma-separated fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("Unknown field: {0}")]
    UnknownField(String),
}

/// Raw attribute values of one patient, in canonical order.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    values: Vec<String>,
}

impl PatientRecord {
    /// Build a record from values already in canonical order.
    ///
    /// # Errors
    /// Returns `RecordError::FieldCount` unless exactly 22 values are given.
    pub fn from_values(values: Vec<String>) -> Result<Self, RecordError> {
        if values.len() != FIELD_COUNT {
            return Err(RecordError::FieldCount {
                expected: FIELD_COUNT,
                actual: values.len(),
            });
        }
        Ok(Self { values })
    }

    /// Parse a comma-joined record line.
    ///
    /// The line is split on every comma with no quoting rules, so empty
    /// fields are kept as empty strings.
    ///
    /// # Errors
    /// Returns `RecordError::FieldCount` if the line does not split into
    /// exactly 22 fields.
    pub fn parse_line(line: &str) -> Result<Self, RecordError> {
        let values: Vec<String> = line
            .trim_end_matches(['\n', '\r'])
            .split(',')
            .map(str::to_string)
            .collect();
        Self::from_values(values)
    }

    /// Raw value at a canonical position.
    #[must_use]
    pub fn value(&self, index: usize) -> &str {
        &self.values[index]
    }

    /// Raw value of a named field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        field_index(field).map(|i| self.values[i].as_str())
    }

    /// All values in canonical order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Comma-joined form, the inverse of [`PatientRecord::parse_line`].
    #[must_use]
    pub fn to_line(&self) -> String {
        self.values.join(",")
    }
}

// Record values are patient data; keep them out of Debug output and logs.
impl std::fmt::Debug for PatientRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatientRecord")
            .field("fields", &self.values.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "0,0.000955737,84,99.84323059,36.03250039,84.81595461,38.72863817,,,49,Right,Female,No,Never Smoked,Negative,Mild Activity,No,10,No,Low-Carb Diet,Good,None";

    #[test]
    fn test_parse_line_keeps_empty_fields() {
        let record = PatientRecord::parse_line(SAMPLE).expect("Should parse");
        assert_eq!(record.values().len(), FIELD_COUNT);
        assert_eq!(record.get("Prescription"), Some(""));
        assert_eq!(record.get("Dosage in mg"), Some(""));
        assert_eq!(record.get("Gender"), Some("Female"));
        assert_eq!(record.get("Chronic_Health_Conditions"), Some("None"));
    }

    #[test]
    fn test_parse_line_rejects_short_record() {
        let err = PatientRecord::parse_line("0,1,2").expect_err("must fail");
        assert_eq!(
            err,
            RecordError::FieldCount {
                expected: 22,
                actual: 3
            }
        );
    }

    #[test]
    fn test_parse_line_rejects_long_record() {
        let line = format!("{SAMPLE},extra");
        assert!(PatientRecord::parse_line(&line).is_err());
    }

    #[test]
    fn test_line_roundtrip() {
        let record = PatientRecord::parse_line(SAMPLE).expect("Should parse");
        assert_eq!(record.to_line(), SAMPLE);
    }

    #[test]
    fn test_column_kinds() {
        let categorical = FIELD_NAMES
            .iter()
            .filter(|f| ColumnKind::of(f) == ColumnKind::Categorical)
            .count();
        assert_eq!(categorical, 12);
        assert_eq!(ColumnKind::of("Cognitive_Test_Scores"), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of("APOE_ε4"), ColumnKind::Categorical);
    }

    #[test]
    fn test_debug_hides_values() {
        let record = PatientRecord::parse_line(SAMPLE).expect("Should parse");
        let dbg = format!("{record:?}");
        assert!(!dbg.contains("Female"));
        assert!(dbg.contains("22"));
    }
}
