//! The trained model triple and its shared preprocessing state.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::evaluation::{classification_report, TrainTestSplit};
use super::preprocess::Preprocessor;
use crate::adapters::{BoostedTreesModel, ForestModel, LogisticModel};
use crate::config::EnsembleConfig;
use crate::domain::{EnsemblePrediction, ModelEvaluation, PatientRecord, TrainingReport};
use crate::ports::{Classifier, ModelError, TrainingTable};
use crate::NeuroscreenError;

/// Preprocessor, three fitted classifiers and their held-out report.
///
/// Immutable once built; every model consumes the same feature space.
#[derive(Serialize, Deserialize)]
pub struct TrainedEnsemble {
    preprocessor: Preprocessor,
    logistic: LogisticModel,
    forest: ForestModel,
    boosting: BoostedTreesModel,
    report: TrainingReport,
}

impl std::fmt::Debug for TrainedEnsemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedEnsemble")
            .field("forest_trees", &self.forest.n_trees())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl TrainedEnsemble {
    /// Preprocess the table, split it, fit all three models on the train
    /// rows and evaluate them on the held-out rows.
    ///
    /// # Errors
    /// Fails on invalid configuration, preprocessing errors, a degenerate
    /// split, a single-class train split, or any model failing to fit.
    pub fn train(table: &TrainingTable, config: &EnsembleConfig) -> Result<Self, NeuroscreenError> {
        config.validate()?;

        let mut preprocessor = Preprocessor::new();
        let features = preprocessor.fit_transform(&table.records)?;
        let labels = Array1::from(table.labels.clone());

        let split = TrainTestSplit::new(features, labels, config.test_fraction, config.seed)?;
        let (x_train, y_train) = (split.train.records(), split.train.targets());
        let (x_test, y_test) = (split.test.records(), split.test.targets());

        if !(y_train.iter().any(|&l| l == 0) && y_train.iter().any(|&l| l == 1)) {
            return Err(ModelError::SingleClass.into());
        }

        tracing::info!(
            "Training ensemble on {} rows, evaluating on {} (seed={})",
            x_train.nrows(),
            x_test.nrows(),
            config.seed
        );

        let logistic = LogisticModel::fit(&config.logistic, x_train.view(), y_train.view())?;
        let forest = ForestModel::fit(&config.forest_params(), x_train.view(), y_train.view())?;
        let boosting = BoostedTreesModel::fit(&config.boosting, x_train.view(), y_train.view())?;

        let evaluations = vec![
            evaluate(&logistic, x_test.view(), y_test.view())?,
            evaluate(&forest, x_test.view(), y_test.view())?,
            evaluate(&boosting, x_test.view(), y_test.view())?,
        ];

        let report = TrainingReport {
            train_rows: x_train.nrows(),
            test_rows: x_test.nrows(),
            seed: config.seed,
            evaluations,
            trained_at: chrono::Utc::now(),
        };

        Ok(Self {
            preprocessor,
            logistic,
            forest,
            boosting,
            report,
        })
    }

    /// Class probabilities of every model for one record.
    ///
    /// # Errors
    /// Propagates preprocessing and model scoring errors; no partial result
    /// is returned.
    pub fn predict(&self, record: &PatientRecord) -> Result<EnsemblePrediction, NeuroscreenError> {
        let row = self.preprocessor.transform_one(record)?;

        let mut probabilities = BTreeMap::new();
        probabilities.insert(LogisticModel::KIND, first(&self.logistic, row.view())?);
        probabilities.insert(ForestModel::KIND, first(&self.forest, row.view())?);
        probabilities.insert(BoostedTreesModel::KIND, first(&self.boosting, row.view())?);

        Ok(EnsemblePrediction::new(probabilities))
    }

    #[must_use]
    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    #[must_use]
    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Serialize the whole ensemble as JSON.
    ///
    /// # Errors
    /// Returns a serialization error if a model cannot be encoded.
    pub fn to_bundle(&self) -> Result<Vec<u8>, NeuroscreenError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Rebuild an ensemble from [`TrainedEnsemble::to_bundle`] output.
    ///
    /// # Errors
    /// Returns a serialization error for malformed input, or
    /// `PreprocessError::EncoderNotFitted` if the bundle carries an unfitted
    /// preprocessor.
    pub fn from_bundle(bytes: &[u8]) -> Result<Self, NeuroscreenError> {
        let ensemble: Self = serde_json::from_slice(bytes)?;
        if !ensemble.preprocessor.is_fitted() {
            return Err(super::preprocess::PreprocessError::EncoderNotFitted(
                "bundle".to_string(),
            )
            .into());
        }
        Ok(ensemble)
    }
}

fn evaluate<C: Classifier>(
    model: &C,
    features: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, usize>,
) -> Result<ModelEvaluation, ModelError> {
    let predicted = Array1::from(model.predict(features)?);
    let report =
        classification_report(labels, &predicted).map_err(|e| ModelError::Evaluation {
            model: C::KIND,
            reason: e.to_string(),
        })?;

    tracing::info!("{} Results: accuracy={:.4}", C::KIND, report.accuracy);
    tracing::debug!("{} classification report:\n{}", C::KIND, report);

    Ok(ModelEvaluation {
        model: C::KIND,
        accuracy: report.accuracy,
        report,
    })
}

fn first<C: Classifier>(
    model: &C,
    row: ArrayView2<'_, f64>,
) -> Result<crate::domain::ClassProbabilities, ModelError> {
    model
        .predict_proba(row)?
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::FeatureMismatch {
            model: C::KIND,
            expected: 1,
            actual: 0,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::csv::read_table;
    use crate::domain::ModelKind;
    use crate::testing::{fast_config, synthetic_csv, SAMPLE_RECORD};

    fn trained() -> TrainedEnsemble {
        let table = read_table(synthetic_csv(120, 5).as_bytes()).expect("table");
        TrainedEnsemble::train(&table, &fast_config()).expect("Should train")
    }

    #[test]
    fn test_train_reports_all_models() {
        let ensemble = trained();
        let report = ensemble.report();
        assert_eq!(report.test_rows, 48);
        assert_eq!(report.train_rows, 72);
        let models: Vec<ModelKind> = report.evaluations.iter().map(|e| e.model).collect();
        assert_eq!(models, ModelKind::ALL);
        for evaluation in &report.evaluations {
            assert!((0.0..=1.0).contains(&evaluation.accuracy));
        }
    }

    #[test]
    fn test_predict_returns_three_distributions() {
        let ensemble = trained();
        let record = PatientRecord::parse_line(SAMPLE_RECORD).expect("record");
        let prediction = ensemble.predict(&record).expect("Should predict");
        assert_eq!(prediction.probabilities.len(), 3);
        for p in prediction.probabilities.values() {
            assert!(p.no_dementia >= 0.0 && p.dementia >= 0.0);
            assert!((p.no_dementia + p.dementia - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_class_is_rejected() {
        let csv = synthetic_csv(40, 5).replace(",1\n", ",0\n");
        let table = read_table(csv.as_bytes()).expect("table");
        let err = TrainedEnsemble::train(&table, &fast_config()).expect_err("must fail");
        assert!(matches!(err, NeuroscreenError::Model(ModelError::SingleClass)));
    }

    #[test]
    fn test_bundle_round_trip_predicts_identically() {
        let ensemble = trained();
        let restored =
            TrainedEnsemble::from_bundle(&ensemble.to_bundle().expect("encode")).expect("decode");

        let record = PatientRecord::parse_line(SAMPLE_RECORD).expect("record");
        let a = ensemble.predict(&record).expect("predict");
        let b = restored.predict(&record).expect("predict");
        assert_eq!(a.probabilities, b.probabilities);
        assert_eq!(restored.report().evaluations, ensemble.report().evaluations);
    }

    #[test]
    fn test_garbage_bundle_is_rejected() {
        assert!(matches!(
            TrainedEnsemble::from_bundle(b"not json"),
            Err(NeuroscreenError::Serialization(_))
        ));
    }
}
