//! Domain layer: Core types for dementia risk screening.
//!
//! Plain data types with serde support and no model or I/O dependencies.

pub mod fields;
mod prediction;
mod record;
mod report;

pub use fields::{field_spec, FieldInput, FieldSpec, FormSection, FIELD_SPECS};
pub use prediction::{ClassProbabilities, EnsemblePrediction, ModelKind, RiskLevel};
pub use record::{
    field_index, ColumnKind, PatientRecord, RecordError, CATEGORICAL_COLUMNS, FIELD_COUNT,
    FIELD_NAMES, LABEL_COLUMN,
};
pub use report::{ClassMetrics, ClassificationReport, ModelEvaluation, TrainingReport};
