//! Prediction service: the Untrained → Trained state machine.
//!
//! This service coordinates:
//! - Loading labelled data from a training source
//! - Fitting the ensemble (single shot)
//! - Scoring comma-separated records
//! - Saving and restoring the trained ensemble through a model store

use std::path::Path;

use super::ensemble::TrainedEnsemble;
use crate::adapters::{CsvTrainingSource, DatasetError, StoreError};
use crate::config::EnsembleConfig;
use crate::domain::{EnsemblePrediction, PatientRecord, TrainingReport};
use crate::ports::{ModelStore, TrainingSource};
use crate::NeuroscreenError;

/// Lifecycle of the service's models.
#[derive(Debug, Default)]
pub enum ModelState {
    #[default]
    Untrained,
    Trained(Box<TrainedEnsemble>),
}

/// Service for training the ensemble and running predictions.
#[derive(Debug)]
pub struct PredictionService {
    config: EnsembleConfig,
    state: ModelState,
}

impl PredictionService {
    /// Create an untrained service.
    #[must_use]
    pub fn new(config: EnsembleConfig) -> Self {
        Self {
            config,
            state: ModelState::Untrained,
        }
    }

    /// Create a service that is already trained, e.g. from a stored bundle.
    #[must_use]
    pub fn from_trained(config: EnsembleConfig, ensemble: TrainedEnsemble) -> Self {
        Self {
            config,
            state: ModelState::Trained(Box::new(ensemble)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    #[must_use]
    pub fn is_trained(&self) -> bool {
        matches!(self.state, ModelState::Trained(_))
    }

    /// Held-out report of the trained ensemble.
    #[must_use]
    pub fn report(&self) -> Option<&TrainingReport> {
        self.ensemble().map(TrainedEnsemble::report)
    }

    fn ensemble(&self) -> Option<&TrainedEnsemble> {
        match &self.state {
            ModelState::Trained(ensemble) => Some(ensemble),
            ModelState::Untrained => None,
        }
    }

    /// Train on a CSV file.
    ///
    /// # Errors
    /// See [`PredictionService::train_from`].
    pub fn train<P: AsRef<Path>>(&mut self, path: P) -> Result<TrainingReport, NeuroscreenError> {
        self.train_from(&CsvTrainingSource::new(path))
    }

    /// Load labelled data from `source` and train all three models.
    ///
    /// On any failure the service stays untrained.
    ///
    /// # Errors
    /// Returns `AlreadyTrained` if the service holds a model, otherwise the
    /// first dataset, preprocessing or model error.
    pub fn train_from<S>(&mut self, source: &S) -> Result<TrainingReport, NeuroscreenError>
    where
        S: TrainingSource,
        S::Error: Into<DatasetError>,
    {
        if self.is_trained() {
            return Err(NeuroscreenError::AlreadyTrained);
        }

        tracing::info!("Training ensemble from {}", source.describe());
        let table = source.load().map_err(|e| NeuroscreenError::Dataset(e.into()))?;

        let ensemble = TrainedEnsemble::train(&table, &self.config).map_err(|e| {
            tracing::error!("Training failed: {}", e);
            e
        })?;
        let report = ensemble.report().clone();

        for evaluation in &report.evaluations {
            tracing::info!(
                "{} held-out accuracy: {:.4}",
                evaluation.model,
                evaluation.accuracy
            );
        }

        self.state = ModelState::Trained(Box::new(ensemble));
        Ok(report)
    }

    /// Score one comma-separated record of 22 fields.
    ///
    /// # Errors
    /// Returns `NotTrained` before training, `Record` on a wrong field count,
    /// or any preprocessing/model error.
    pub fn predict(&self, line: &str) -> Result<EnsemblePrediction, NeuroscreenError> {
        let record = PatientRecord::parse_line(line)?;
        self.predict_record(&record)
    }

    /// Score an already split record.
    ///
    /// # Errors
    /// See [`PredictionService::predict`].
    pub fn predict_record(
        &self,
        record: &PatientRecord,
    ) -> Result<EnsemblePrediction, NeuroscreenError> {
        let ensemble = self.ensemble().ok_or(NeuroscreenError::NotTrained)?;
        let prediction = ensemble.predict(record)?;
        tracing::debug!(
            "Prediction complete: mean P(dementia)={:.3}",
            prediction.mean_dementia_probability()
        );
        Ok(prediction)
    }

    /// Like [`PredictionService::predict`], but logs the failure and returns
    /// `None` instead of an error.
    #[must_use]
    pub fn try_predict(&self, line: &str) -> Option<EnsemblePrediction> {
        match self.predict(line) {
            Ok(prediction) => Some(prediction),
            Err(e) => {
                tracing::warn!("Prediction unavailable: {}", e);
                None
            }
        }
    }

    /// Persist the trained ensemble.
    ///
    /// # Errors
    /// Returns `NotTrained` before training, or a serialization/store error.
    pub fn save<M>(&self, store: &M) -> Result<(), NeuroscreenError>
    where
        M: ModelStore,
        M::Error: Into<StoreError>,
    {
        let ensemble = self.ensemble().ok_or(NeuroscreenError::NotTrained)?;
        let bundle = ensemble.to_bundle()?;
        store
            .save(&bundle)
            .map_err(|e| NeuroscreenError::Store(e.into()))
    }

    /// Restore a trained service from `store`.
    ///
    /// # Returns
    /// `None` if the store holds no bundle.
    ///
    /// # Errors
    /// Returns a store error (including integrity failures) or a
    /// serialization error for a malformed bundle.
    pub fn load<M>(config: EnsembleConfig, store: &M) -> Result<Option<Self>, NeuroscreenError>
    where
        M: ModelStore,
        M::Error: Into<StoreError>,
    {
        let Some(bundle) = store.load().map_err(|e| NeuroscreenError::Store(e.into()))? else {
            return Ok(None);
        };
        let ensemble = TrainedEnsemble::from_bundle(&bundle)?;
        tracing::info!("Loaded trained ensemble ({} bytes)", bundle.len());
        Ok(Some(Self::from_trained(config, ensemble)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::csv::read_table;
    use crate::adapters::JsonModelStore;
    use crate::domain::{ModelKind, RecordError};
    use crate::ports::TrainingTable;
    use crate::testing::{fast_config, synthetic_csv, SAMPLE_RECORD};
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    struct InMemorySource(String);

    impl TrainingSource for InMemorySource {
        type Error = DatasetError;

        fn load(&self) -> Result<TrainingTable, DatasetError> {
            read_table(self.0.as_bytes())
        }

        fn describe(&self) -> String {
            "in-memory".to_string()
        }
    }

    fn trained_service() -> PredictionService {
        let mut service = PredictionService::new(fast_config());
        service
            .train_from(&InMemorySource(synthetic_csv(120, 9)))
            .expect("Should train");
        service
    }

    #[test]
    fn test_untrained_predict_fails() {
        let service = PredictionService::new(fast_config());
        assert!(!service.is_trained());
        assert!(matches!(
            service.predict(SAMPLE_RECORD),
            Err(NeuroscreenError::NotTrained)
        ));
        assert!(service.try_predict(SAMPLE_RECORD).is_none());
        assert!(service.report().is_none());
    }

    #[test]
    fn test_predict_after_train() {
        let service = trained_service();
        let prediction = service.predict(SAMPLE_RECORD).expect("Should predict");

        let by_name = prediction.by_name();
        assert_eq!(by_name.len(), 3);
        for name in ["Logistic Regression", "Random Forest", "XGBoost"] {
            let [no, yes] = by_name[name];
            assert!(no >= 0.0 && yes >= 0.0);
            assert!((no + yes - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_short_record_fails() {
        let service = trained_service();
        let short = "0,0.1,84,99.8,36.0,84.8,38.7";
        assert!(matches!(
            service.predict(short),
            Err(NeuroscreenError::Record(RecordError::FieldCount { actual: 7, .. }))
        ));
    }

    #[test]
    fn test_unseen_category_is_tolerated() {
        let service = trained_service();
        let line = SAMPLE_RECORD.replace("Low-Carb Diet", "Carnivore");
        assert!(service.predict(&line).is_ok());
    }

    #[test]
    fn test_training_is_deterministic() {
        let a = trained_service();
        let b = trained_service();
        for model in ModelKind::ALL {
            assert_eq!(
                a.report().and_then(|r| r.accuracy(model)),
                b.report().and_then(|r| r.accuracy(model))
            );
        }
    }

    #[test]
    fn test_second_training_is_refused() {
        let mut service = trained_service();
        let err = service
            .train_from(&InMemorySource(synthetic_csv(60, 1)))
            .expect_err("must fail");
        assert!(matches!(err, NeuroscreenError::AlreadyTrained));
        assert!(service.is_trained());
    }

    #[test]
    fn test_failed_training_stays_untrained() {
        let mut service = PredictionService::new(fast_config());
        assert!(service.train("/nonexistent/dementia.csv").is_err());
        assert!(!service.is_trained());
        assert!(matches!(service.state(), ModelState::Untrained));
    }

    #[test]
    fn test_ragged_csv_leaves_service_untrained() {
        let mut file = NamedTempFile::new().expect("tempfile");
        let csv = synthetic_csv(40, 4).replacen(",0\n", ",0,extra\n", 1);
        file.write_all(csv.as_bytes()).expect("write");

        let mut service = PredictionService::new(fast_config());
        let err = service.train(file.path()).expect_err("must fail");
        assert!(matches!(err, NeuroscreenError::Dataset(DatasetError::Csv(_))));
        assert!(!service.is_trained());
        assert!(matches!(
            service.predict(SAMPLE_RECORD),
            Err(NeuroscreenError::NotTrained)
        ));
    }

    #[test]
    fn test_train_from_csv_file() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(synthetic_csv(80, 4).as_bytes()).expect("write");

        let mut service = PredictionService::new(fast_config());
        let report = service.train(file.path()).expect("Should train");
        assert_eq!(report.test_rows + report.train_rows, 80);
        assert_eq!(report.evaluations.len(), 3);
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().expect("tempdir");
        let store = JsonModelStore::new(temp.path());

        assert!(PredictionService::load(fast_config(), &store)
            .expect("load")
            .is_none());
        assert!(matches!(
            PredictionService::new(fast_config()).save(&store),
            Err(NeuroscreenError::NotTrained)
        ));

        let service = trained_service();
        service.save(&store).expect("Should save");

        let restored = PredictionService::load(fast_config(), &store)
            .expect("Should load")
            .expect("present");
        assert!(restored.is_trained());

        let a = service.predict(SAMPLE_RECORD).expect("predict");
        let b = restored.predict(SAMPLE_RECORD).expect("predict");
        assert_eq!(a.probabilities, b.probabilities);
    }

    #[test]
    fn test_tampered_bundle_is_refused() {
        let temp = tempdir().expect("tempdir");
        let store = JsonModelStore::new(temp.path());
        trained_service().save(&store).expect("save");

        std::fs::write(temp.path().join("ensemble.json"), b"{}").expect("overwrite");
        assert!(matches!(
            PredictionService::load(fast_config(), &store),
            Err(NeuroscreenError::Store(StoreError::Integrity(_)))
        ));
    }
}
