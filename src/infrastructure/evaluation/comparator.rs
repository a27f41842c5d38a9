//! Offline comparison of two classifiers on a labelled dataset
//!
//! Works on prediction vectors instead of live traffic and is independent of
//! the experiment router. Significance comes from a bootstrap over the shared
//! dataset indices, so both models are always resampled on the same rows.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ExperimentSettings;
use crate::domain::DomainError;

// ============================================================================
// Metrics
// ============================================================================

/// Classification metric computed by the comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMetric {
    Accuracy,
    Precision,
    Recall,
    F1,
}

impl ClassificationMetric {
    pub const ALL: [ClassificationMetric; 4] = [
        ClassificationMetric::Accuracy,
        ClassificationMetric::Precision,
        ClassificationMetric::Recall,
        ClassificationMetric::F1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Precision => "precision",
            Self::Recall => "recall",
            Self::F1 => "f1",
        }
    }
}

impl fmt::Display for ClassificationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ConfusionCounts {
    true_positive: usize,
    false_positive: usize,
    false_negative: usize,
    true_negative: usize,
}

impl ConfusionCounts {
    fn record(&mut self, predicted_positive: bool, actual_positive: bool) {
        match (predicted_positive, actual_positive) {
            (true, true) => self.true_positive += 1,
            (true, false) => self.false_positive += 1,
            (false, true) => self.false_negative += 1,
            (false, false) => self.true_negative += 1,
        }
    }

    fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.false_negative + self.true_negative
    }
}

/// Accuracy, precision, recall and F1 of one model against a positive label
///
/// Ratios with an empty denominator are reported as 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ClassificationMetrics {
    /// Score predictions against ground truth
    pub fn compute<T: PartialEq>(
        predictions: &[T],
        ground_truth: &[T],
        positive_label: &T,
    ) -> Result<Self, DomainError> {
        check_lengths(&[predictions.len()], ground_truth.len())?;

        let mut counts = ConfusionCounts::default();
        for (predicted, actual) in predictions.iter().zip(ground_truth) {
            counts.record(predicted == positive_label, actual == positive_label);
        }

        Ok(Self::from_counts(&counts))
    }

    fn from_counts(counts: &ConfusionCounts) -> Self {
        let ratio = |num: usize, denom: usize| {
            if denom == 0 {
                0.0
            } else {
                num as f64 / denom as f64
            }
        };

        let accuracy = ratio(counts.true_positive + counts.true_negative, counts.total());
        let precision = ratio(
            counts.true_positive,
            counts.true_positive + counts.false_positive,
        );
        let recall = ratio(
            counts.true_positive,
            counts.true_positive + counts.false_negative,
        );
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Self {
            accuracy,
            precision,
            recall,
            f1,
        }
    }

    /// Get the value of one metric
    pub fn get(&self, metric: ClassificationMetric) -> f64 {
        match metric {
            ClassificationMetric::Accuracy => self.accuracy,
            ClassificationMetric::Precision => self.precision,
            ClassificationMetric::Recall => self.recall,
            ClassificationMetric::F1 => self.f1,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Bootstrap outcome for one metric, deltas taken as model B minus model A
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    pub metric: ClassificationMetric,
    /// Observed delta on the full dataset
    pub delta: f64,
    /// Share of bootstrap deltas at or below zero
    pub p_value: f64,
    pub is_significant: bool,
    /// Percentile interval of the bootstrap deltas at the configured confidence
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Full comparison of two models on one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub model_a: ClassificationMetrics,
    pub model_b: ClassificationMetrics,
    pub sample_size: usize,
    pub iterations: usize,
    pub confidence_level: f64,
    /// One entry per metric, in [`ClassificationMetric::ALL`] order
    pub bootstrap: Vec<BootstrapResult>,
}

impl ModelComparison {
    /// Get the bootstrap outcome of one metric
    pub fn bootstrap_for(&self, metric: ClassificationMetric) -> Option<&BootstrapResult> {
        self.bootstrap.iter().find(|r| r.metric == metric)
    }

    /// Check if model B beats model A significantly on a metric
    pub fn b_is_better(&self, metric: ClassificationMetric) -> bool {
        self.bootstrap_for(metric)
            .is_some_and(|r| r.is_significant && r.delta > 0.0)
    }
}

// ============================================================================
// ModelComparator
// ============================================================================

/// Compares two classifiers with a seeded bootstrap
#[derive(Debug, Clone)]
pub struct ModelComparator {
    iterations: usize,
    confidence_level: f64,
    seed: Option<u64>,
}

impl Default for ModelComparator {
    fn default() -> Self {
        Self::from_settings(&ExperimentSettings::default())
    }
}

impl ModelComparator {
    /// Create a comparator with an unseeded generator
    pub fn new(iterations: usize, confidence_level: f64) -> Self {
        Self {
            iterations,
            confidence_level,
            seed: None,
        }
    }

    /// Create a comparator from the experiment settings
    pub fn from_settings(settings: &ExperimentSettings) -> Self {
        Self {
            iterations: settings.bootstrap_iterations,
            confidence_level: settings.confidence_level,
            seed: settings.bootstrap_seed,
        }
    }

    /// Fix the generator seed so runs are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Compare model A and model B against the same ground truth
    pub fn compare<T: PartialEq>(
        &self,
        predictions_a: &[T],
        predictions_b: &[T],
        ground_truth: &[T],
        positive_label: &T,
    ) -> Result<ModelComparison, DomainError> {
        check_lengths(&[predictions_a.len(), predictions_b.len()], ground_truth.len())?;

        if self.iterations == 0 {
            return Err(DomainError::validation(
                "Bootstrap iterations must be positive",
            ));
        }

        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(DomainError::validation(format!(
                "Confidence level must be between 0 and 1, got {}",
                self.confidence_level
            )));
        }

        debug!(
            samples = ground_truth.len(),
            iterations = self.iterations,
            seed = ?self.seed,
            "Comparing models"
        );

        // Precompute per-row outcomes so resampling only touches booleans
        let actual: Vec<bool> = ground_truth.iter().map(|t| t == positive_label).collect();
        let predicted_a: Vec<bool> = predictions_a.iter().map(|p| p == positive_label).collect();
        let predicted_b: Vec<bool> = predictions_b.iter().map(|p| p == positive_label).collect();

        let tally = |predicted: &[bool], rows: &mut dyn Iterator<Item = usize>| {
            let mut counts = ConfusionCounts::default();
            for row in rows {
                counts.record(predicted[row], actual[row]);
            }
            ClassificationMetrics::from_counts(&counts)
        };

        let n = actual.len();
        let model_a = tally(&predicted_a, &mut (0..n));
        let model_b = tally(&predicted_b, &mut (0..n));

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut deltas: Vec<Vec<f64>> =
            vec![Vec::with_capacity(self.iterations); ClassificationMetric::ALL.len()];
        let mut rows = vec![0usize; n];

        for _ in 0..self.iterations {
            for row in rows.iter_mut() {
                *row = rng.gen_range(0..n);
            }

            let resampled_a = tally(&predicted_a, &mut rows.iter().copied());
            let resampled_b = tally(&predicted_b, &mut rows.iter().copied());

            for (i, metric) in ClassificationMetric::ALL.iter().enumerate() {
                deltas[i].push(resampled_b.get(*metric) - resampled_a.get(*metric));
            }
        }

        let bootstrap = ClassificationMetric::ALL
            .iter()
            .zip(deltas)
            .map(|(metric, deltas)| self.summarize(*metric, &model_a, &model_b, deltas))
            .collect();

        Ok(ModelComparison {
            model_a,
            model_b,
            sample_size: n,
            iterations: self.iterations,
            confidence_level: self.confidence_level,
            bootstrap,
        })
    }

    fn summarize(
        &self,
        metric: ClassificationMetric,
        model_a: &ClassificationMetrics,
        model_b: &ClassificationMetrics,
        mut deltas: Vec<f64>,
    ) -> BootstrapResult {
        let not_better = deltas.iter().filter(|d| **d <= 0.0).count();
        let p_value = not_better as f64 / deltas.len() as f64;

        deltas.sort_by(f64::total_cmp);
        let alpha = 1.0 - self.confidence_level;

        BootstrapResult {
            metric,
            delta: model_b.get(metric) - model_a.get(metric),
            p_value,
            is_significant: p_value < alpha,
            ci_lower: percentile(&deltas, alpha / 2.0),
            ci_upper: percentile(&deltas, 1.0 - alpha / 2.0),
        }
    }
}

/// Nearest-rank percentile of sorted values
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let index = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[index.min(sorted.len() - 1)]
}

fn check_lengths(predictions: &[usize], ground_truth: usize) -> Result<(), DomainError> {
    if ground_truth == 0 {
        return Err(DomainError::validation("Ground truth must not be empty"));
    }

    if let Some(len) = predictions.iter().find(|len| **len != ground_truth) {
        return Err(DomainError::validation(format!(
            "Predictions length {} does not match ground truth length {}",
            len, ground_truth
        )));
    }

    Ok(())
}
