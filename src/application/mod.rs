//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement the
//! training, prediction, form and dataset-summary use cases.

mod analytics;
mod ensemble;
mod evaluation;
mod form;
pub mod preprocess;
mod service;

pub use analytics::{ColumnSummary, DatasetSummary};
pub use ensemble::TrainedEnsemble;
pub use evaluation::{classification_report, TrainTestSplit};
pub use form::{render_results, FormError, PredictionForm, PREDICTION_FAILED};
pub use preprocess::{PreprocessError, Preprocessor};
pub use service::{ModelState, PredictionService};
