//! Prediction result types.
//!
//! Represents the per-model output of the ensemble for one patient record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The three classifiers of the ensemble, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    LogisticRegression,
    RandomForest,
    GradientBoosting,
}

impl ModelKind {
    /// All models in display order.
    pub const ALL: [ModelKind; 3] = [
        Self::LogisticRegression,
        Self::RandomForest,
        Self::GradientBoosting,
    ];

    /// Display name used in reports and prediction output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogisticRegression => "Logistic Regression",
            Self::RandomForest => "Random Forest",
            Self::GradientBoosting => "XGBoost",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Risk band on the probability of dementia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// P(dementia) below 0.3
    Low,
    /// P(dementia) in [0.3, 0.7)
    Moderate,
    /// P(dementia) of 0.7 or more
    High,
}

impl RiskLevel {
    /// Band for a dementia probability.
    #[must_use]
    pub fn from_probability(p: f64) -> Self {
        if p < 0.3 {
            Self::Low
        } else if p < 0.7 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - No significant indicators",
            Self::Moderate => "Moderate risk - Follow-up recommended",
            Self::High => "High risk - Clinical assessment advised",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Probability pair `[P(no dementia), P(dementia)]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub no_dementia: f64,
    pub dementia: f64,
}

impl ClassProbabilities {
    /// Build the pair from P(dementia), clamped to [0, 1].
    #[must_use]
    pub fn from_positive(p: f64) -> Self {
        let dementia = if p.is_nan() { 0.5 } else { p.clamp(0.0, 1.0) };
        Self {
            no_dementia: 1.0 - dementia,
            dementia,
        }
    }

    /// The pair as a two-element array, negative class first.
    #[must_use]
    pub fn as_array(&self) -> [f64; 2] {
        [self.no_dementia, self.dementia]
    }

    /// Predicted class (1 = dementia) at the 0.5 threshold.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        usize::from(self.dementia >= 0.5)
    }

    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_probability(self.dementia)
    }
}

/// Output of all three models for one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsemblePrediction {
    /// Per-model probabilities, iterated in [`ModelKind::ALL`] order.
    pub probabilities: BTreeMap<ModelKind, ClassProbabilities>,

    /// Timestamp of the prediction
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl EnsemblePrediction {
    #[must_use]
    pub fn new(probabilities: BTreeMap<ModelKind, ClassProbabilities>) -> Self {
        Self {
            probabilities,
            created_at: chrono::Utc::now(),
        }
    }

    /// Probabilities of one model.
    #[must_use]
    pub fn get(&self, model: ModelKind) -> Option<&ClassProbabilities> {
        self.probabilities.get(&model)
    }

    /// Display-name keyed view, e.g. `"XGBoost" -> [0.8, 0.2]`.
    #[must_use]
    pub fn by_name(&self) -> BTreeMap<&'static str, [f64; 2]> {
        self.probabilities
            .iter()
            .map(|(k, p)| (k.name(), p.as_array()))
            .collect()
    }

    /// Mean P(dementia) across models.
    #[must_use]
    pub fn mean_dementia_probability(&self) -> f64 {
        if self.probabilities.is_empty() {
            return 0.0;
        }
        self.probabilities.values().map(|p| p.dementia).sum::<f64>()
            / self.probabilities.len() as f64
    }
}
