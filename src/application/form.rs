//! Prediction form and results rendering.
//!
//! The form holds one text slot per record field, in canonical order. It
//! only turns into a record line once every slot is filled.

use std::fmt::Write as _;

use crate::domain::{
    field_spec, EnsemblePrediction, ModelKind, PatientRecord, TrainingReport, FIELD_COUNT,
    FIELD_NAMES,
};

/// Message shown when a prediction cannot be produced.
pub const PREDICTION_FAILED: &str = "Prediction failed. Please check your inputs.";

/// Errors raised while filling or submitting the form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// Carries the field label (underscores shown as spaces).
    #[error("Please fill in the {0} field")]
    MissingField(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("{0} must not contain a comma")]
    Comma(String),

    #[error("Expected Name=value, got '{0}'")]
    Assignment(String),
}

/// Text form with one slot per field.
#[derive(Clone, Default)]
pub struct PredictionForm {
    values: [String; FIELD_COUNT],
}

impl std::fmt::Debug for PredictionForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let filled = self.values.iter().filter(|v| !v.trim().is_empty()).count();
        f.debug_struct("PredictionForm")
            .field("filled", &filled)
            .finish_non_exhaustive()
    }
}

impl PredictionForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a form from `Name=value` assignments.
    ///
    /// # Errors
    /// Returns `Assignment` for an entry without `=`, or any [`PredictionForm::set`] error.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self, FormError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut form = Self::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (name, value) = assignment
                .split_once('=')
                .ok_or_else(|| FormError::Assignment(assignment.to_string()))?;
            form.set(name.trim(), value)?;
        }
        Ok(form)
    }

    /// Fill one slot.
    ///
    /// # Errors
    /// Returns `UnknownField` for a name outside the record layout and
    /// `Comma` for a value that would break the record line.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> Result<(), FormError> {
        let index = slot(field)?;
        let value = value.into();
        if value.contains(',') {
            return Err(FormError::Comma(field.to_string()));
        }
        self.values[index] = value;
        Ok(())
    }

    /// Current value of a slot.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        slot(field).ok().map(|i| self.values[i].as_str())
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        for value in &mut self.values {
            value.clear();
        }
    }

    /// Fields with an empty slot, in canonical order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        FIELD_NAMES
            .iter()
            .zip(self.values.iter())
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Join the slots into a comma-separated record line.
    ///
    /// # Errors
    /// Returns `MissingField` for the first empty slot.
    pub fn to_record_line(&self) -> Result<String, FormError> {
        if let Some(name) = self.missing_fields().first() {
            return Err(FormError::MissingField(name.replace('_', " ")));
        }
        let trimmed: Vec<&str> = self.values.iter().map(|v| v.trim()).collect();
        Ok(trimmed.join(","))
    }

    /// The filled form as a record.
    ///
    /// # Errors
    /// See [`PredictionForm::to_record_line`].
    pub fn to_record(&self) -> Result<PatientRecord, crate::NeuroscreenError> {
        Ok(PatientRecord::parse_line(&self.to_record_line()?)?)
    }

    /// Advisory warnings for filled values outside the form's ranges or
    /// choice lists. Empty slots are not reported here.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        FIELD_NAMES
            .iter()
            .zip(self.values.iter())
            .filter(|(_, v)| !v.trim().is_empty())
            .filter_map(|(name, value)| field_spec(name)?.check(value).err())
            .collect()
    }
}

fn slot(field: &str) -> Result<usize, FormError> {
    FIELD_NAMES
        .iter()
        .position(|f| *f == field)
        .ok_or_else(|| FormError::UnknownField(field.to_string()))
}

/// Render per-model probabilities with held-out accuracy and the risk band.
#[must_use]
pub fn render_results(prediction: &EnsemblePrediction, report: Option<&TrainingReport>) -> String {
    let mut out = String::new();
    for model in ModelKind::ALL {
        let Some(p) = prediction.get(model) else {
            continue;
        };
        let accuracy = report
            .and_then(|r| r.accuracy(model))
            .map(|a| format!(" (accuracy {:.1}%)", a * 100.0))
            .unwrap_or_default();
        let _ = writeln!(out, "{model}{accuracy}");
        let _ = writeln!(out, "  No Dementia: {:.1}%", p.no_dementia * 100.0);
        let _ = writeln!(out, "  Dementia: {:.1}%", p.dementia * 100.0);
        let level = p.risk_level();
        let _ = writeln!(out, "  Risk: {} ({})", level, level.description());
    }
    out
}
