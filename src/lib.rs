//! # Neuroscreen
//!
//! Dementia risk screening from 22 patient attributes.
//!
//! This crate provides:
//! - A single-shot preprocessing pipeline (category encoding with an
//!   "Unknown" sentinel, numeric coercion, mean imputation, standard scaling)
//! - A three-model ensemble: logistic regression, random forest and
//!   gradient-boosted trees (reported as "XGBoost")
//! - A prediction service with an Untrained → Trained lifecycle
//! - Integrity-checked persistence of trained ensembles
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (records, field catalogue, predictions, reports)
//! - `ports`: Trait definitions (classifiers, training sources, model stores)
//! - `adapters`: Concrete implementations (linfa, gbdt, CSV, JSON store, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Training hyperparameters

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod testing;

pub use application::{PredictionForm, PredictionService};
pub use config::EnsembleConfig;
pub use domain::{EnsemblePrediction, ModelKind, PatientRecord, RiskLevel};

/// Result type for Neuroscreen operations
pub type Result<T> = std::result::Result<T, NeuroscreenError>;

/// Main error type for Neuroscreen
#[derive(Debug, thiserror::Error)]
pub enum NeuroscreenError {
    #[error("Invalid record: {0}")]
    Record(#[from] domain::RecordError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] adapters::DatasetError),

    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] application::PreprocessError),

    #[error("Model error: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Form incomplete: {0}")]
    Form(#[from] application::FormError),

    #[error("Model store error: {0}")]
    Store(#[from] adapters::StoreError),

    #[error("Model not trained")]
    NotTrained,

    #[error("Model already trained; training is single-shot")]
    AlreadyTrained,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid train/test split: {0}")]
    Split(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
