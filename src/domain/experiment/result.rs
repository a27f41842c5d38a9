//! Comparison report types for metrics and statistical analysis

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entity::ExperimentStatus;
use super::stats;
use crate::domain::DomainError;

// ============================================================================
// MetricSummary
// ============================================================================

/// Descriptive statistics of one metric for one variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (0 below two samples)
    pub std_dev: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
}

impl MetricSummary {
    /// Summarize a list of samples, `None` when empty
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len();
        let mean = stats::mean(samples);
        let std_dev = stats::std_dev(samples);

        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            count,
            mean,
            std_dev,
            min,
            max,
        })
    }
}

// ============================================================================
// MetricComparison
// ============================================================================

/// Head-to-head comparison of one metric between the two variants of a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub variant_a: String,
    pub variant_b: String,
    pub count_a: usize,
    pub count_b: usize,
    pub mean_a: f64,
    pub mean_b: f64,
    /// `mean_b - mean_a`
    pub difference: f64,
    /// Relative change from a to b (percentage, 0 when `mean_a` is 0)
    pub relative_change: f64,
    /// Higher-mean variant, `None` when the means are equal
    pub winner: Option<String>,
}

impl MetricComparison {
    /// Compare two summaries; the higher mean wins
    pub fn new(
        variant_a: impl Into<String>,
        summary_a: &MetricSummary,
        variant_b: impl Into<String>,
        summary_b: &MetricSummary,
    ) -> Self {
        let variant_a = variant_a.into();
        let variant_b = variant_b.into();

        let winner = if summary_a.mean > summary_b.mean {
            Some(variant_a.clone())
        } else if summary_b.mean > summary_a.mean {
            Some(variant_b.clone())
        } else {
            None
        };

        let relative_change = if summary_a.mean != 0.0 {
            (summary_b.mean - summary_a.mean) / summary_a.mean * 100.0
        } else {
            0.0
        };

        Self {
            variant_a,
            variant_b,
            count_a: summary_a.count,
            count_b: summary_b.count,
            mean_a: summary_a.mean,
            mean_b: summary_b.mean,
            difference: summary_b.mean - summary_a.mean,
            relative_change,
            winner,
        }
    }
}

// ============================================================================
// StatisticalSignificance
// ============================================================================

/// Results of statistical significance testing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticalSignificance {
    /// P-value from the statistical test
    pub p_value: f64,
    /// Whether the result is statistically significant
    pub is_significant: bool,
    /// Confidence level used (e.g., 0.95 for 95%)
    pub confidence_level: f64,
    /// ID of the baseline variant
    pub baseline_variant_id: String,
    /// ID of the candidate variant being compared
    pub candidate_variant_id: String,
    /// Name of the metric being compared
    pub metric: String,
    /// Mean value for the baseline variant
    pub baseline_mean: f64,
    /// Mean value for the candidate variant
    pub candidate_mean: f64,
    /// Relative change from baseline to candidate (percentage)
    pub relative_change: f64,
}

impl StatisticalSignificance {
    /// Create a new significance result
    pub fn new(
        p_value: f64,
        confidence_level: f64,
        baseline_variant_id: impl Into<String>,
        candidate_variant_id: impl Into<String>,
        metric: impl Into<String>,
        baseline_mean: f64,
        candidate_mean: f64,
    ) -> Self {
        let relative_change = if baseline_mean != 0.0 {
            (candidate_mean - baseline_mean) / baseline_mean * 100.0
        } else {
            0.0
        };

        Self {
            p_value,
            is_significant: p_value < (1.0 - confidence_level),
            confidence_level,
            baseline_variant_id: baseline_variant_id.into(),
            candidate_variant_id: candidate_variant_id.into(),
            metric: metric.into(),
            baseline_mean,
            candidate_mean,
            relative_change,
        }
    }

    /// Check if the candidate is better than baseline (for metrics where lower is better)
    pub fn candidate_is_better_lower(&self) -> bool {
        self.is_significant && self.candidate_mean < self.baseline_mean
    }

    /// Check if the candidate is better than baseline (for metrics where higher is better)
    pub fn candidate_is_better_higher(&self) -> bool {
        self.is_significant && self.candidate_mean > self.baseline_mean
    }
}

// ============================================================================
// ComparisonReport
// ============================================================================

/// Read-only snapshot comparing the variants of one experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// ID of the experiment
    pub test_id: String,
    /// Status of the experiment when the report was built
    pub status: ExperimentStatus,
    /// Variants in declaration order
    pub variants: Vec<String>,
    /// The two compared variants, only set for two-variant experiments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compared_pair: Option<(String, String)>,
    /// Per-variant, per-metric descriptive statistics
    pub variant_summaries: BTreeMap<String, BTreeMap<String, MetricSummary>>,
    /// Per-metric head-to-head comparison (two-variant experiments only)
    pub metrics_comparison: BTreeMap<String, MetricComparison>,
    /// Declared winner, `None` meaning inconclusive
    pub winner: Option<String>,
    /// Total number of samples across all variants
    pub total_samples: usize,
    /// When the report was built
    pub generated_at: DateTime<Utc>,
}

impl ComparisonReport {
    /// Create an empty report
    pub fn new(
        test_id: impl Into<String>,
        status: ExperimentStatus,
        variants: Vec<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            status,
            variants,
            compared_pair: None,
            variant_summaries: BTreeMap::new(),
            metrics_comparison: BTreeMap::new(),
            winner: None,
            total_samples: 0,
            generated_at,
        }
    }

    /// Check if a winner was declared
    pub fn is_conclusive(&self) -> bool {
        self.winner.is_some()
    }

    /// Get the summary of one metric for one variant
    pub fn summary(&self, variant_id: &str, metric: &str) -> Option<&MetricSummary> {
        self.variant_summaries
            .get(variant_id)
            .and_then(|metrics| metrics.get(metric))
    }

    /// Export the report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DomainError::internal(format!("Failed to serialize report: {}", e)))
    }
}
