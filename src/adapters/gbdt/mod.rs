//! gbdt adapter: gradient-boosted trees (reported as "XGBoost").
//!
//! Wraps the pure-Rust `gbdt` crate with its log-likelihood loss. That loss
//! expects labels in {-1, +1} and yields P(label = +1) from `predict`, so
//! dementia maps to +1. Row and column sampling are disabled, which keeps
//! training deterministic.

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec, PredVec, ValueType};
use gbdt::gradient_boost::GBDT;
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::domain::{ClassProbabilities, ModelKind};
use crate::ports::{check_feature_count, Classifier, ModelError};

const LOSS: &str = "LogLikelyhood";

/// Boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Boosting rounds (one tree per round)
    pub iterations: usize,
    pub max_depth: u32,
    /// Learning rate
    pub shrinkage: f32,
    pub min_leaf_size: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            iterations: 100,
            max_depth: 6,
            shrinkage: 0.3,
            min_leaf_size: 1,
        }
    }
}

/// Fitted gradient-boosted trees.
#[derive(Serialize, Deserialize)]
pub struct BoostedTreesModel {
    inner: GBDT,
    n_features: usize,
}

impl std::fmt::Debug for BoostedTreesModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoostedTreesModel")
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

fn to_row(features: ArrayView1<'_, f64>) -> Vec<ValueType> {
    features.iter().map(|&v| v as ValueType).collect()
}

impl Classifier for BoostedTreesModel {
    type Params = BoostingParams;
    const KIND: ModelKind = ModelKind::GradientBoosting;

    fn fit(
        params: &BoostingParams,
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, usize>,
    ) -> Result<Self, ModelError> {
        if params.iterations == 0 || params.max_depth == 0 {
            return Err(ModelError::InvalidParams {
                model: Self::KIND,
                reason: "iterations and max_depth must be at least 1".into(),
            });
        }
        if features.nrows() == 0 || features.ncols() == 0 {
            return Err(ModelError::Fit {
                model: Self::KIND,
                reason: "empty feature matrix".into(),
            });
        }

        let n_features = features.ncols();
        let mut cfg = Config::new();
        cfg.set_feature_size(n_features);
        cfg.set_max_depth(params.max_depth);
        cfg.set_iterations(params.iterations);
        cfg.set_shrinkage(params.shrinkage);
        cfg.set_min_leaf_size(params.min_leaf_size);
        cfg.set_loss(LOSS);
        cfg.set_debug(false);
        cfg.set_data_sample_ratio(1.0);
        cfg.set_feature_sample_ratio(1.0);
        cfg.set_training_optimization_level(2);

        let mut training: DataVec = features
            .outer_iter()
            .zip(labels.iter())
            .map(|(row, &label)| {
                let target: ValueType = if label == 1 { 1.0 } else { -1.0 };
                Data::new_training_data(to_row(row), 1.0, target, None)
            })
            .collect();

        let mut inner = GBDT::new(&cfg);
        inner.fit(&mut training);

        tracing::debug!(
            "Fitted gradient boosting: {} rounds, max_depth={}, shrinkage={}",
            params.iterations,
            params.max_depth,
            params.shrinkage
        );

        Ok(Self { inner, n_features })
    }

    fn predict_proba(
        &self,
        features: ArrayView2<'_, f64>,
    ) -> Result<Vec<ClassProbabilities>, ModelError> {
        check_feature_count(Self::KIND, self.n_features, features.ncols())?;

        let rows: DataVec = features
            .outer_iter()
            .map(|row| Data::new_test_data(to_row(row), None))
            .collect();
        let predicted: PredVec = self.inner.predict(&rows);

        Ok(predicted
            .into_iter()
            .map(|p| ClassProbabilities::from_positive(f64::from(p)))
            .collect())
    }
}
