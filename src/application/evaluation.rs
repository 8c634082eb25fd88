//! Held-out evaluation: seeded train/test split and classification metrics.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use linfa::dataset::{AsTargets, Labels};
use linfa::prelude::*;
use ndarray::{Array1, Array2, ArrayView1, Ix1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::domain::{ClassMetrics, ClassificationReport};
use crate::NeuroscreenError;

/// Train and test rows with their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: Dataset<f64, usize, Ix1>,
    pub test: Dataset<f64, usize, Ix1>,
}

impl TrainTestSplit {
    /// Shuffle the rows with `seed` and hold out `ceil(test_fraction * n_rows)`
    /// of them for testing.
    ///
    /// # Errors
    /// Returns `NeuroscreenError::Split` if the fraction is outside (0, 1),
    /// the label count differs from the row count, or either side of the
    /// split would be empty.
    pub fn new(
        features: Array2<f64>,
        labels: Array1<usize>,
        test_fraction: f64,
        seed: u64,
    ) -> Result<Self, NeuroscreenError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(NeuroscreenError::Split(format!(
                "test fraction must be in (0, 1), got {test_fraction}"
            )));
        }

        let n_rows = features.nrows();
        if labels.len() != n_rows {
            return Err(NeuroscreenError::Split(format!(
                "{} labels for {n_rows} rows",
                labels.len()
            )));
        }

        let n_test = (test_fraction * n_rows as f64).ceil() as usize;
        if n_test == 0 || n_test >= n_rows {
            return Err(NeuroscreenError::Split(format!(
                "{n_rows} rows cannot be split into non-empty train and test sets"
            )));
        }

        // split_with_ratio keeps ceil(ratio * n) rows first; aim half a row
        // below the train size so f32 rounding cannot add one.
        let n_train = n_rows - n_test;
        let ratio = (n_train as f32 - 0.5) / n_rows as f32;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (train, test) = Dataset::new(features, labels)
            .shuffle(&mut rng)
            .split_with_ratio(ratio);

        Ok(Self { train, test })
    }
}

/// Ground truth whose label set is fixed up front, so every class gets a
/// confusion-matrix row in ascending order even if one side never shows it.
struct KnownClasses<'a> {
    labels: ArrayView1<'a, usize>,
    classes: Vec<usize>,
}

impl AsTargets for KnownClasses<'_> {
    type Elem = usize;
    type Ix = Ix1;

    fn as_targets(&self) -> ArrayView1<'_, usize> {
        self.labels.view()
    }
}

impl Labels for KnownClasses<'_> {
    type Elem = usize;

    fn label_count(&self) -> Vec<HashMap<usize, usize>> {
        self.labels.label_count()
    }

    fn labels(&self) -> Vec<usize> {
        self.classes.clone()
    }
}

/// Per-class precision, recall and F1 with accuracy and averages.
///
/// Classes are the union of labels seen in `truth` and `predicted`. Metrics
/// with a zero denominator are reported as 0.
///
/// # Errors
/// Returns the linfa error if the two label arrays differ in length.
pub fn classification_report(
    truth: ArrayView1<'_, usize>,
    predicted: &Array1<usize>,
) -> Result<ClassificationReport, linfa::Error> {
    let classes: Vec<usize> = truth
        .iter()
        .chain(predicted.iter())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let support = truth.label_count().pop().unwrap_or_default();
    let cm = KnownClasses {
        labels: truth,
        classes: classes.clone(),
    }
    .confusion_matrix(predicted)?;

    let per_class: BTreeMap<usize, ClassMetrics> = classes
        .iter()
        .zip(cm.split_one_vs_all())
        .map(|(&class, one_vs_all)| {
            let metrics = ClassMetrics {
                precision: or_zero(one_vs_all.precision()),
                recall: or_zero(one_vs_all.recall()),
                f1: or_zero(one_vs_all.f1_score()),
                support: support.get(&class).copied().unwrap_or(0),
            };
            (class, metrics)
        })
        .collect();

    let total = truth.len();
    let n_classes = per_class.len().max(1) as f64;
    let weight_total = total.max(1) as f64;

    let macro_avg = ClassMetrics {
        precision: per_class.values().map(|m| m.precision).sum::<f64>() / n_classes,
        recall: per_class.values().map(|m| m.recall).sum::<f64>() / n_classes,
        f1: per_class.values().map(|m| m.f1).sum::<f64>() / n_classes,
        support: total,
    };
    let weighted = |metric: fn(&ClassMetrics) -> f64| {
        per_class
            .values()
            .map(|m| metric(m) * m.support as f64)
            .sum::<f64>()
            / weight_total
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1: weighted(|m| m.f1),
        support: total,
    };

    Ok(ClassificationReport {
        classes: per_class,
        accuracy: or_zero(cm.accuracy()),
        macro_avg,
        weighted_avg,
    })
}

// linfa yields NaN for 0/0.
fn or_zero(value: f32) -> f64 {
    if value.is_finite() {
        f64::from(value)
    } else {
        0.0
    }
}
