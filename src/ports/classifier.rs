//! Classifier port: Trait for the probabilistic models of the ensemble.
//!
//! This trait abstracts the learning libraries (linfa, gbdt) from the
//! training and prediction use cases.

use ndarray::{ArrayView1, ArrayView2};

use crate::domain::{ClassProbabilities, ModelKind};

/// Errors raised by model fitting or scoring.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("{model} training failed: {reason}")]
    Fit { model: ModelKind, reason: String },

    #[error("{model}: expected {expected} features, got {actual}")]
    FeatureMismatch {
        model: ModelKind,
        expected: usize,
        actual: usize,
    },

    #[error("Training split contains a single class; both outcomes are required")]
    SingleClass,

    #[error("{model} evaluation failed: {reason}")]
    Evaluation { model: ModelKind, reason: String },

    #[error("Invalid {model} parameters: {reason}")]
    InvalidParams { model: ModelKind, reason: String },
}

/// A binary classifier producing `[P(no dementia), P(dementia)]` per row.
///
/// Labels are `0` (no dementia) and `1` (dementia). Feature matrices are
/// already preprocessed: rows are records, columns follow the canonical
/// field order.
pub trait Classifier: Send + Sync {
    /// Hyperparameters consumed by [`Classifier::fit`].
    type Params;

    /// Which ensemble slot this model fills.
    const KIND: ModelKind;

    /// Fit a model on a feature matrix and its labels.
    ///
    /// # Errors
    /// Returns `ModelError::Fit` if the underlying learner fails.
    fn fit(
        params: &Self::Params,
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, usize>,
    ) -> Result<Self, ModelError>
    where
        Self: Sized;

    /// Class probabilities for every row.
    ///
    /// # Errors
    /// Returns `ModelError::FeatureMismatch` if the column count differs
    /// from the one seen at fit time.
    fn predict_proba(
        &self,
        features: ArrayView2<'_, f64>,
    ) -> Result<Vec<ClassProbabilities>, ModelError>;

    /// Hard class predictions at the 0.5 threshold.
    ///
    /// # Errors
    /// Propagates [`Classifier::predict_proba`] errors.
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<usize>, ModelError> {
        Ok(self
            .predict_proba(features)?
            .iter()
            .map(ClassProbabilities::predicted_class)
            .collect())
    }
}

/// Fail with `FeatureMismatch` unless `actual == expected`.
pub(crate) fn check_feature_count(
    model: ModelKind,
    expected: usize,
    actual: usize,
) -> Result<(), ModelError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ModelError::FeatureMismatch {
            model,
            expected,
            actual,
        })
    }
}
