//! Dataset summary: descriptive statistics over a training table.
//!
//! Counts are computed on the raw values, before any cleanup or imputation.

use std::collections::BTreeMap;

use serde::Serialize;

use super::preprocess::coerce_numeric;
use crate::domain::{ColumnKind, FIELD_NAMES, LABEL_COLUMN};
use crate::ports::TrainingTable;

/// Statistics of one feature column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: &'static str,
    pub categorical: bool,
    /// Empty cells, plus unparseable cells in numeric columns
    pub missing: usize,
    /// Mean of the parseable values (numeric columns only)
    pub mean: Option<f64>,
    /// Non-missing value counts (categorical columns only)
    pub value_counts: BTreeMap<String, usize>,
}

/// Shape, missingness and label balance of a training table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    /// Feature columns plus the label
    pub columns: usize,
    pub column_summaries: Vec<ColumnSummary>,
    pub label_counts: BTreeMap<usize, usize>,
}

impl DatasetSummary {
    #[must_use]
    pub fn from_table(table: &TrainingTable) -> Self {
        let column_summaries = FIELD_NAMES
            .iter()
            .map(|&name| summarize_column(table, name))
            .collect();

        let mut label_counts = BTreeMap::new();
        for &label in &table.labels {
            *label_counts.entry(label).or_insert(0) += 1;
        }

        Self {
            rows: table.len(),
            columns: FIELD_NAMES.len() + 1,
            column_summaries,
            label_counts,
        }
    }

    /// Missing cells across all feature columns.
    #[must_use]
    pub fn total_missing(&self) -> usize {
        self.column_summaries.iter().map(|c| c.missing).sum()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.column_summaries.iter().find(|c| c.name == name)
    }
}

fn summarize_column(table: &TrainingTable, name: &'static str) -> ColumnSummary {
    let mut summary = ColumnSummary {
        name,
        categorical: ColumnKind::of(name) == ColumnKind::Categorical,
        missing: 0,
        mean: None,
        value_counts: BTreeMap::new(),
    };

    if summary.categorical {
        for raw in table.column(name) {
            let value = raw.trim();
            if value.is_empty() {
                summary.missing += 1;
            } else {
                *summary.value_counts.entry(value.to_string()).or_insert(0) += 1;
            }
        }
    } else {
        let (mut sum, mut count) = (0.0, 0usize);
        for raw in table.column(name) {
            let value = coerce_numeric(raw);
            if value.is_nan() {
                summary.missing += 1;
            } else {
                sum += value;
                count += 1;
            }
        }
        summary.mean = (count > 0).then(|| sum / count as f64);
    }

    summary
}

impl std::fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Shape: ({}, {})", self.rows, self.columns)?;
        writeln!(f)?;
        writeln!(f, "Missing values:")?;
        for column in &self.column_summaries {
            writeln!(f, "  {:<28} {}", column.name, column.missing)?;
        }
        writeln!(f)?;
        writeln!(f, "Numeric means:")?;
        for column in self.column_summaries.iter().filter(|c| !c.categorical) {
            match column.mean {
                Some(mean) => writeln!(f, "  {:<28} {:.4}", column.name, mean)?,
                None => writeln!(f, "  {:<28} -", column.name)?,
            }
        }
        writeln!(f)?;
        writeln!(f, "Categorical values:")?;
        for column in self.column_summaries.iter().filter(|c| c.categorical) {
            writeln!(f, "  {}", column.name)?;
            for (value, count) in &column.value_counts {
                writeln!(f, "    {value:<26} {count}")?;
            }
        }
        writeln!(f)?;
        writeln!(f, "{LABEL_COLUMN}:")?;
        for (label, count) in &self.label_counts {
            writeln!(f, "  {label:<28} {count}")?;
        }
        Ok(())
    }
}
