//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `linfa`: logistic regression and bagged decision trees
//! - `gbdt`: gradient-boosted trees
//! - `csv`: training data files
//! - `json_store`: manifest-bound model bundles
//! - `sanitize`: patient-data filtering for logs

pub mod csv;
pub mod gbdt;
pub mod json_store;
pub mod linfa;
pub mod sanitize;

pub use self::csv::{CsvTrainingSource, DatasetError};
pub use self::gbdt::{BoostedTreesModel, BoostingParams};
pub use self::json_store::{JsonModelStore, StoreError};
pub use self::linfa::{ForestModel, ForestParams, LogisticModel, LogisticParams};
