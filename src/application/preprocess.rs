//! Record preprocessing: category encoding, numeric coercion, mean
//! imputation and standard scaling.
//!
//! The [`Preprocessor`] is fitted exactly once on the training records. After
//! that its state is frozen and every prediction-time record is encoded with
//! the same vocabularies, means and scales. Feature matrices always use the
//! canonical field order of [`FIELD_NAMES`].

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::domain::{
    field_index, ColumnKind, PatientRecord, CATEGORICAL_COLUMNS, FIELD_COUNT, FIELD_NAMES,
};

/// Category used for missing and unseen categorical values.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Category substituted for a literal "None"/"none".
pub const NO_CONDITION_CATEGORY: &str = "No_Condition";

/// Errors raised by the preprocessor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreprocessError {
    #[error("Encoder for column {0} was never fitted")]
    EncoderNotFitted(String),

    #[error("Preprocessor is already fitted; fitting is single-shot")]
    AlreadyFitted,

    #[error("Cannot fit on an empty set of records")]
    EmptyInput,
}

/// Normalize a raw categorical cell before encoding.
#[must_use]
pub fn clean_category(raw: &str) -> &str {
    match raw.trim() {
        "" => UNKNOWN_CATEGORY,
        "None" | "none" => NO_CONDITION_CATEGORY,
        other => other,
    }
}

/// Parse a raw numeric cell; anything that is not a finite number is missing (NaN).
#[must_use]
pub fn coerce_numeric(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(f64::NAN)
}

/// Label encoder for one categorical column.
///
/// Codes are the ranks of the categories in sorted order, and the
/// vocabulary always contains [`UNKNOWN_CATEGORY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    fn fit<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let mut classes: BTreeSet<String> = values.map(str::to_string).collect();
        classes.insert(UNKNOWN_CATEGORY.to_string());
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    /// Sorted vocabulary.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code of a category, if it is in the vocabulary.
    #[must_use]
    pub fn code(&self, category: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(category))
            .ok()
    }

    /// Code of a cleaned category, falling back to the "Unknown" code.
    fn encode_lenient(&self, category: &str) -> (usize, bool) {
        match self.code(category) {
            Some(code) => (code, false),
            None => (self.unknown_code(), true),
        }
    }

    fn unknown_code(&self) -> usize {
        // Present by construction in `fit`.
        self.code(UNKNOWN_CATEGORY).unwrap_or(0)
    }
}

/// Per-column mean imputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanImputer {
    means: Vec<f64>,
}

impl MeanImputer {
    fn fit(matrix: &Array2<f64>) -> Self {
        let means = matrix
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(i, column)| {
                let observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
                if observed.is_empty() {
                    tracing::warn!("Column {} has no observed values; imputing 0.0", FIELD_NAMES[i]);
                    0.0
                } else {
                    observed.iter().sum::<f64>() / observed.len() as f64
                }
            })
            .collect();
        Self { means }
    }

    fn transform(&self, matrix: &mut Array2<f64>) {
        for (mut column, mean) in matrix.axis_iter_mut(Axis(1)).zip(self.means.iter()) {
            column.mapv_inplace(|v| if v.is_nan() { *mean } else { v });
        }
    }

    /// Imputation value per column.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }
}

/// Per-column standardization to zero mean and unit variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    fn fit(matrix: &Array2<f64>) -> Self {
        let n = matrix.nrows() as f64;
        let mut mean = Vec::with_capacity(matrix.ncols());
        let mut scale = Vec::with_capacity(matrix.ncols());

        for column in matrix.axis_iter(Axis(1)) {
            let m = column.sum() / n;
            // Population standard deviation; constant columns are left unscaled.
            let std = (column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n).sqrt();
            mean.push(m);
            scale.push(if std > 0.0 && std.is_finite() { std } else { 1.0 });
        }

        Self { mean, scale }
    }

    fn transform(&self, matrix: &mut Array2<f64>) {
        for (i, mut column) in matrix.axis_iter_mut(Axis(1)).enumerate() {
            let (m, s) = (self.mean[i], self.scale[i]);
            column.mapv_inplace(|v| (v - m) / s);
        }
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedState {
    encoders: BTreeMap<String, CategoryEncoder>,
    imputer: MeanImputer,
    scaler: StandardScaler,
}

/// Single-shot record preprocessor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    state: Option<FittedState>,
}

impl Preprocessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Fit every stage on the training records and return their scaled
    /// feature matrix (rows × 22).
    ///
    /// # Errors
    /// Returns `AlreadyFitted` on a second call and `EmptyInput` when there
    /// are no records.
    pub fn fit_transform(
        &mut self,
        records: &[PatientRecord],
    ) -> Result<Array2<f64>, PreprocessError> {
        if self.state.is_some() {
            return Err(PreprocessError::AlreadyFitted);
        }
        if records.is_empty() {
            return Err(PreprocessError::EmptyInput);
        }

        let encoders: BTreeMap<String, CategoryEncoder> = CATEGORICAL_COLUMNS
            .iter()
            .map(|&column| {
                let index = column_index(column);
                let encoder =
                    CategoryEncoder::fit(records.iter().map(|r| clean_category(r.value(index))));
                tracing::debug!(
                    "Fitted encoder for {} ({} categories)",
                    column,
                    encoder.classes().len()
                );
                (column.to_string(), encoder)
            })
            .collect();

        let mut matrix = encode(&encoders, records)?;

        let imputer = MeanImputer::fit(&matrix);
        imputer.transform(&mut matrix);

        let scaler = StandardScaler::fit(&matrix);
        scaler.transform(&mut matrix);

        tracing::info!(
            "Preprocessor fitted on {} records ({} features)",
            records.len(),
            FIELD_COUNT
        );

        self.state = Some(FittedState {
            encoders,
            imputer,
            scaler,
        });
        Ok(matrix)
    }

    /// Encode, impute and scale records with the frozen training state.
    ///
    /// Categories missing from a column's vocabulary are encoded as
    /// "Unknown".
    ///
    /// # Errors
    /// Returns `EncoderNotFitted` if [`Preprocessor::fit_transform`] has not
    /// run.
    pub fn transform(&self, records: &[PatientRecord]) -> Result<Array2<f64>, PreprocessError> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| PreprocessError::EncoderNotFitted(CATEGORICAL_COLUMNS[0].to_string()))?;

        let mut matrix = encode(&state.encoders, records)?;
        state.imputer.transform(&mut matrix);
        state.scaler.transform(&mut matrix);
        Ok(matrix)
    }

    /// Transform a single record into a 1 × 22 matrix.
    ///
    /// # Errors
    /// See [`Preprocessor::transform`].
    pub fn transform_one(&self, record: &PatientRecord) -> Result<Array2<f64>, PreprocessError> {
        self.transform(std::slice::from_ref(record))
    }

    /// Training vocabulary of a categorical column.
    #[must_use]
    pub fn vocabulary(&self, column: &str) -> Option<&[String]> {
        self.state
            .as_ref()
            .and_then(|s| s.encoders.get(column))
            .map(CategoryEncoder::classes)
    }

    /// Code a raw categorical value would be encoded as.
    ///
    /// # Errors
    /// Returns `EncoderNotFitted` for an unfitted preprocessor or a column
    /// without an encoder.
    pub fn category_code(&self, column: &str, raw: &str) -> Result<usize, PreprocessError> {
        let encoder = self
            .state
            .as_ref()
            .and_then(|s| s.encoders.get(column))
            .ok_or_else(|| PreprocessError::EncoderNotFitted(column.to_string()))?;
        Ok(encoder.encode_lenient(clean_category(raw)).0)
    }

    #[must_use]
    pub fn imputer(&self) -> Option<&MeanImputer> {
        self.state.as_ref().map(|s| &s.imputer)
    }

    #[must_use]
    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.state.as_ref().map(|s| &s.scaler)
    }
}

fn column_index(name: &str) -> usize {
    field_index(name).unwrap_or_else(|| unreachable!("{name} is a canonical field"))
}

/// Build the unimputed matrix: category codes and parsed numbers, NaN where
/// a numeric value is missing.
fn encode(
    encoders: &BTreeMap<String, CategoryEncoder>,
    records: &[PatientRecord],
) -> Result<Array2<f64>, PreprocessError> {
    let mut matrix = Array2::from_elem((records.len(), FIELD_COUNT), f64::NAN);

    for (col, name) in FIELD_NAMES.iter().enumerate() {
        match ColumnKind::of(name) {
            ColumnKind::Categorical => {
                let encoder = encoders
                    .get(*name)
                    .ok_or_else(|| PreprocessError::EncoderNotFitted((*name).to_string()))?;
                let mut unseen = 0usize;
                for (row, record) in records.iter().enumerate() {
                    let (code, was_unseen) = encoder.encode_lenient(clean_category(record.value(col)));
                    unseen += usize::from(was_unseen);
                    matrix[[row, col]] = code as f64;
                }
                if unseen > 0 {
                    tracing::debug!(
                        "{} value(s) of {} not in training vocabulary; encoded as {}",
                        unseen,
                        name,
                        UNKNOWN_CATEGORY
                    );
                }
            }
            ColumnKind::Numeric => {
                for (row, record) in records.iter().enumerate() {
                    matrix[[row, col]] = coerce_numeric(record.value(col));
                }
            }
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::csv::read_table;
    use crate::testing::{synthetic_csv, SAMPLE_RECORD};

    fn fitted() -> (Preprocessor, Array2<f64>) {
        let table = read_table(synthetic_csv(80, 11).as_bytes()).expect("table");
        let mut pre = Preprocessor::new();
        let matrix = pre.fit_transform(&table.records).expect("fit");
        (pre, matrix)
    }

    fn with_value(field: &str, value: &str) -> PatientRecord {
        let mut values: Vec<String> = SAMPLE_RECORD.split(',').map(str::to_string).collect();
        let index = column_index(field);
        values[index] = value.to_string();
        PatientRecord::from_values(values).expect("record")
    }

    #[test]
    fn test_clean_category() {
        assert_eq!(clean_category(""), UNKNOWN_CATEGORY);
        assert_eq!(clean_category("  "), UNKNOWN_CATEGORY);
        assert_eq!(clean_category("None"), NO_CONDITION_CATEGORY);
        assert_eq!(clean_category("none"), NO_CONDITION_CATEGORY);
        assert_eq!(clean_category(" Right "), "Right");
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric("84"), 84.0);
        assert_eq!(coerce_numeric(" 0.5 "), 0.5);
        assert!(coerce_numeric("").is_nan());
        assert!(coerce_numeric("abc").is_nan());
        assert!(coerce_numeric("inf").is_nan());
    }

    #[test]
    fn test_vocabulary_is_sorted_and_has_unknown() {
        let (pre, _) = fitted();
        let vocab = pre.vocabulary("Gender").expect("vocab");
        assert_eq!(vocab, ["Female", "Male", "Unknown"]);
        let chronic = pre.vocabulary("Chronic_Health_Conditions").expect("vocab");
        assert!(chronic.iter().any(|c| c == NO_CONDITION_CATEGORY));
        assert!(!chronic.iter().any(|c| c == "None"));
    }

    #[test]
    fn test_unseen_category_encodes_as_unknown() {
        let (pre, _) = fitted();
        for column in CATEGORICAL_COLUMNS {
            let unknown = pre.category_code(column, UNKNOWN_CATEGORY).expect("code");
            let unseen = pre.category_code(column, "Definitely Not Seen").expect("code");
            assert_eq!(unknown, unseen, "{column}");
        }

        let a = pre.transform_one(&with_value("Gender", "Other")).expect("transform");
        let b = pre.transform_one(&with_value("Gender", "Unknown")).expect("transform");
        assert_eq!(a, b);
    }

    #[test]
    fn test_training_matrix_is_standardized() {
        let (pre, matrix) = fitted();
        assert_eq!(matrix.dim(), (80, FIELD_COUNT));
        for column in matrix.axis_iter(Axis(1)) {
            assert!(column.iter().all(|v| v.is_finite()));
            assert!(column.mean().expect("mean").abs() < 1e-9);
        }
        assert_eq!(pre.scaler().expect("scaler").scale().len(), FIELD_COUNT);
    }

    #[test]
    fn test_missing_numeric_imputes_to_mean() {
        let (pre, _) = fitted();
        let row = pre.transform_one(&with_value("Dosage in mg", "")).expect("transform");
        // The training mean scales to zero.
        assert!(row[[0, column_index("Dosage in mg")]].abs() < 1e-9);

        let garbage = pre.transform_one(&with_value("Age", "old")).expect("transform");
        assert!(garbage[[0, column_index("Age")]].abs() < 1e-9);
    }

    #[test]
    fn test_sample_with_empty_fields_transforms() {
        let (pre, _) = fitted();
        let record = PatientRecord::parse_line(SAMPLE_RECORD).expect("record");
        let row = pre.transform_one(&record).expect("transform");
        assert_eq!(row.dim(), (1, FIELD_COUNT));
        assert!(row.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_fit_is_single_shot() {
        let (mut pre, _) = fitted();
        let table = read_table(synthetic_csv(10, 2).as_bytes()).expect("table");
        assert_eq!(
            pre.fit_transform(&table.records),
            Err(PreprocessError::AlreadyFitted)
        );
    }

    #[test]
    fn test_transform_requires_fit() {
        let pre = Preprocessor::new();
        let record = PatientRecord::parse_line(SAMPLE_RECORD).expect("record");
        assert!(matches!(
            pre.transform_one(&record),
            Err(PreprocessError::EncoderNotFitted(_))
        ));
        assert!(pre.category_code("Gender", "Male").is_err());
    }

    #[test]
    fn test_fit_rejects_empty_input() {
        let mut pre = Preprocessor::new();
        assert_eq!(pre.fit_transform(&[]), Err(PreprocessError::EmptyInput));
        assert!(!pre.is_fitted());
    }

    #[test]
    fn test_constant_column_is_not_scaled() {
        let records: Vec<PatientRecord> = (0..2)
            .map(|_| PatientRecord::parse_line(SAMPLE_RECORD).expect("record"))
            .collect();
        let mut pre = Preprocessor::new();
        let matrix = pre.fit_transform(&records).expect("fit");
        assert!(matrix.iter().all(|v| *v == 0.0));
        assert!(pre.scaler().expect("scaler").scale().iter().all(|s| *s == 1.0));
    }

    #[test]
    fn test_column_without_observed_values_imputes_zero() {
        let dosage = column_index("Dosage in mg");
        let age = column_index("Age");
        let records: Vec<PatientRecord> = (0..6)
            .map(|i| {
                let mut values: Vec<String> =
                    SAMPLE_RECORD.split(',').map(str::to_string).collect();
                values[age] = (60 + i).to_string();
                values[dosage] = String::new();
                PatientRecord::from_values(values).expect("record")
            })
            .collect();

        let mut pre = Preprocessor::new();
        let matrix = pre.fit_transform(&records).expect("fit");
        assert_eq!(pre.imputer().expect("imputer").means()[dosage], 0.0);
        assert_eq!(matrix.ncols(), FIELD_COUNT);
        assert!(matrix.iter().all(|v| v.is_finite()));
        assert!(matrix.column(dosage).iter().all(|v| *v == 0.0));

        let row = pre.transform_one(&with_value("Dosage in mg", "250")).expect("transform");
        assert_eq!(row[[0, dosage]], 250.0);
    }
}
