//! Training configuration.
//!
//! Defaults reproduce the reference setup (seed 42, 60/40 split, 1000 solver
//! iterations, 100 trees, 100 boosting rounds). Values can come from a JSON
//! file and are then overridden by `NEUROSCREEN_*` environment variables.
//! Unparseable overrides are ignored with a warning.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adapters::{BoostingParams, ForestParams, LogisticParams};
use crate::NeuroscreenError;

pub const SEED_ENV: &str = "NEUROSCREEN_SEED";
pub const TEST_FRACTION_ENV: &str = "NEUROSCREEN_TEST_FRACTION";
pub const LR_MAX_ITER_ENV: &str = "NEUROSCREEN_LR_MAX_ITER";
pub const RF_TREES_ENV: &str = "NEUROSCREEN_RF_TREES";
pub const GB_ROUNDS_ENV: &str = "NEUROSCREEN_GB_ROUNDS";

/// Hyperparameters of the split and the three models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Seed for the train/test shuffle and the forest's bootstrap
    pub seed: u64,
    /// Fraction of rows held out for evaluation, in (0, 1)
    pub test_fraction: f64,
    pub logistic: LogisticParams,
    pub forest: ForestParams,
    pub boosting: BoostingParams,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.4,
            logistic: LogisticParams::default(),
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
        }
    }
}

impl EnsembleConfig {
    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an IO or serialization error if the file cannot be read or
    /// parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NeuroscreenError> {
        let bytes = std::fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&bytes)?;
        tracing::debug!("Loaded training config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `NEUROSCREEN_*` overrides on top of `self`.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(seed) = env_override::<u64>(SEED_ENV) {
            self.seed = seed;
        }
        if let Some(fraction) = env_override::<f64>(TEST_FRACTION_ENV) {
            if fraction > 0.0 && fraction < 1.0 {
                self.test_fraction = fraction;
            } else {
                tracing::warn!("{} must be in (0, 1), ignoring {}", TEST_FRACTION_ENV, fraction);
            }
        }
        if let Some(iterations) = env_override::<u64>(LR_MAX_ITER_ENV) {
            self.logistic.max_iterations = iterations;
        }
        if let Some(trees) = env_override::<usize>(RF_TREES_ENV) {
            self.forest.n_trees = trees;
        }
        if let Some(rounds) = env_override::<usize>(GB_ROUNDS_ENV) {
            self.boosting.iterations = rounds;
        }
        self
    }

    /// Forest hyperparameters with the bootstrap seeded from [`EnsembleConfig::seed`].
    #[must_use]
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            seed: self.seed,
            ..self.forest.clone()
        }
    }

    /// Reject values no model can train with.
    ///
    /// # Errors
    /// Returns `NeuroscreenError::Config` naming the first bad value.
    pub fn validate(&self) -> Result<(), NeuroscreenError> {
        let fail = |msg: String| Err(NeuroscreenError::Config(msg));

        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return fail(format!("test_fraction must be in (0, 1), got {}", self.test_fraction));
        }
        if self.logistic.max_iterations == 0 {
            return fail("logistic.max_iterations must be at least 1".into());
        }
        if !(self.logistic.alpha.is_finite() && self.logistic.alpha >= 0.0) {
            return fail(format!("logistic.alpha must be >= 0, got {}", self.logistic.alpha));
        }
        if self.forest.n_trees == 0 {
            return fail("forest.n_trees must be at least 1".into());
        }
        if !(self.forest.feature_subsample > 0.0 && self.forest.feature_subsample <= 1.0) {
            return fail(format!(
                "forest.feature_subsample must be in (0, 1], got {}",
                self.forest.feature_subsample
            ));
        }
        if self.boosting.iterations == 0 || self.boosting.max_depth == 0 {
            return fail("boosting.iterations and boosting.max_depth must be at least 1".into());
        }
        if !(self.boosting.shrinkage > 0.0 && self.boosting.shrinkage.is_finite()) {
            return fail(format!("boosting.shrinkage must be > 0, got {}", self.boosting.shrinkage));
        }
        Ok(())
    }
}

fn env_override<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_validate() {
        let config = EnsembleConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.test_fraction, 0.4);
        assert_eq!(config.logistic.max_iterations, 1000);
        assert_eq!(config.forest.n_trees, 100);
        assert_eq!(config.boosting.iterations, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(br#"{"seed": 7, "forest": {"n_trees": 12}}"#)
            .expect("write");

        let config = EnsembleConfig::from_file(file.path()).expect("Should load");
        assert_eq!(config.seed, 7);
        assert_eq!(config.forest.n_trees, 12);
        assert_eq!(config.forest.feature_subsample, 0.7);
        assert_eq!(config.test_fraction, 0.4);
    }

    #[test]
    fn test_file_seed_reaches_the_forest() {
        use crate::adapters::csv::read_table;
        use crate::adapters::ForestModel;
        use crate::application::Preprocessor;
        use crate::ports::Classifier;
        use crate::testing::synthetic_csv;
        use ndarray::Array1;

        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(br#"{"seed": 7, "forest": {"n_trees": 10}}"#)
            .expect("write");
        let seeded = EnsembleConfig::from_file(file.path()).expect("Should load");
        assert_eq!(seeded.forest_params().seed, 7);

        let table = read_table(synthetic_csv(60, 2).as_bytes()).expect("table");
        let x = Preprocessor::new()
            .fit_transform(&table.records)
            .expect("fit");
        let y = Array1::from(table.labels.clone());

        let default = EnsembleConfig {
            forest: seeded.forest.clone(),
            ..Default::default()
        };
        let a = ForestModel::fit(&seeded.forest_params(), x.view(), y.view()).expect("fit");
        let b = ForestModel::fit(&default.forest_params(), x.view(), y.view()).expect("fit");
        assert_ne!(
            a.predict_proba(x.view()).expect("predict"),
            b.predict_proba(x.view()).expect("predict")
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EnsembleConfig::from_file("/nonexistent/config.json"),
            Err(NeuroscreenError::Io(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EnsembleConfig {
            test_fraction: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.test_fraction = 0.4;
        config.forest.n_trees = 0;
        let err = config.validate().expect_err("must fail");
        assert!(err.to_string().contains("n_trees"));
    }
}
