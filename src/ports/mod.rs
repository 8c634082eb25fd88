//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (learning libraries,
//! training files, bundle storage).

mod classifier;
mod dataset;
mod model_store;

pub(crate) use classifier::check_feature_count;
pub use classifier::{Classifier, ModelError};
pub use dataset::{TrainingSource, TrainingTable};
pub use model_store::ModelStore;
