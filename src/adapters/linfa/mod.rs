//! linfa adapter: logistic regression and random forest classifiers.
//!
//! - [`LogisticModel`] wraps `linfa-logistic`'s L2-regularised binary
//!   logistic regression.
//! - [`ForestModel`] bags `linfa-trees` decision trees: each tree is fitted on
//!   a bootstrap sample of the rows and a random subset of the columns, and
//!   the forest's P(dementia) is the fraction of trees voting for class 1.
//!
//! Both models are deterministic for a fixed seed.

use linfa::prelude::*;
use linfa::Dataset;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{ClassProbabilities, ModelKind};
use crate::ports::{check_feature_count, Classifier, ModelError};

/// Logistic regression hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    /// Solver iteration cap
    pub max_iterations: u64,
    /// L2 penalty strength
    pub alpha: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            alpha: 1.0,
        }
    }
}

/// Fitted logistic regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    inner: FittedLogisticRegression<f64, usize>,
}

impl Classifier for LogisticModel {
    type Params = LogisticParams;
    const KIND: ModelKind = ModelKind::LogisticRegression;

    fn fit(
        params: &LogisticParams,
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, usize>,
    ) -> Result<Self, ModelError> {
        let dataset = Dataset::new(features.to_owned(), labels.to_owned());

        let inner = LogisticRegression::default()
            .max_iterations(params.max_iterations)
            .alpha(params.alpha)
            .fit(&dataset)
            .map_err(|e| ModelError::Fit {
                model: Self::KIND,
                reason: e.to_string(),
            })?;

        tracing::debug!(
            "Fitted logistic regression on {} rows (intercept={:.4})",
            features.nrows(),
            inner.intercept()
        );

        Ok(Self { inner })
    }

    fn predict_proba(
        &self,
        features: ArrayView2<'_, f64>,
    ) -> Result<Vec<ClassProbabilities>, ModelError> {
        check_feature_count(Self::KIND, self.inner.params().len(), features.ncols())?;

        // linfa reports the probability of whichever class it labelled positive.
        let dementia_is_positive = self.inner.labels().pos.class == 1;
        let probabilities = self.inner.predict_probabilities(&features);

        Ok(probabilities
            .iter()
            .map(|&p| {
                let p_dementia = if dementia_is_positive { p } else { 1.0 - p };
                ClassProbabilities::from_positive(p_dementia)
            })
            .collect())
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure
    pub max_depth: Option<usize>,
    /// Fraction of columns each tree sees, in (0, 1]
    pub feature_subsample: f64,
    /// Bootstrap seed; the ensemble sets it from its own seed
    #[serde(skip)]
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            feature_subsample: 0.7,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BaggedTree {
    /// Column indices the tree was fitted on, ascending
    columns: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

/// Fitted random forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    trees: Vec<BaggedTree>,
    n_features: usize,
}

impl ForestModel {
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for ForestModel {
    type Params = ForestParams;
    const KIND: ModelKind = ModelKind::RandomForest;

    fn fit(
        params: &ForestParams,
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, usize>,
    ) -> Result<Self, ModelError> {
        if params.n_trees == 0 {
            return Err(ModelError::InvalidParams {
                model: Self::KIND,
                reason: "n_trees must be at least 1".into(),
            });
        }
        if !(params.feature_subsample > 0.0 && params.feature_subsample <= 1.0) {
            return Err(ModelError::InvalidParams {
                model: Self::KIND,
                reason: format!(
                    "feature_subsample must be in (0, 1], got {}",
                    params.feature_subsample
                ),
            });
        }

        let n_rows = features.nrows();
        let n_features = features.ncols();
        if n_rows == 0 || n_features == 0 {
            return Err(ModelError::Fit {
                model: Self::KIND,
                reason: "empty feature matrix".into(),
            });
        }

        let per_tree = ((n_features as f64 * params.feature_subsample).ceil() as usize)
            .clamp(1, n_features);
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_trees);

        for _ in 0..params.n_trees {
            let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
            let mut columns = rand::seq::index::sample(&mut rng, n_features, per_tree).into_vec();
            columns.sort_unstable();

            let x = features.select(Axis(0), &rows).select(Axis(1), &columns);
            let y = labels.select(Axis(0), &rows);
            let dataset = Dataset::new(x, y);

            let tree = DecisionTree::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(params.max_depth)
                .fit(&dataset)
                .map_err(|e| ModelError::Fit {
                    model: Self::KIND,
                    reason: e.to_string(),
                })?;

            trees.push(BaggedTree { columns, tree });
        }

        tracing::debug!(
            "Fitted random forest: {} trees, {} of {} columns per tree",
            trees.len(),
            per_tree,
            n_features
        );

        Ok(Self { trees, n_features })
    }

    fn predict_proba(
        &self,
        features: ArrayView2<'_, f64>,
    ) -> Result<Vec<ClassProbabilities>, ModelError> {
        check_feature_count(Self::KIND, self.n_features, features.ncols())?;

        let mut votes = vec![0usize; features.nrows()];
        for bagged in &self.trees {
            let x = features.select(Axis(1), &bagged.columns);
            let predicted: Array1<usize> = bagged.tree.predict(&x);
            for (count, class) in votes.iter_mut().zip(predicted.iter()) {
                if *class == 1 {
                    *count += 1;
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        Ok(votes
            .into_iter()
            .map(|v| ClassProbabilities::from_positive(v as f64 / n_trees))
            .collect())
    }
}
