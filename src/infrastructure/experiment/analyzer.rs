//! Comparative analysis of recorded experiment metrics
//!
//! Builds descriptive per-variant summaries and, for two-variant experiments,
//! declares the higher-mean variant the winner. No significance testing happens
//! here; see [`super::calculate_significance`] for an optional layer on top.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::experiment::{
    ComparisonReport, ExperimentConfig, ExperimentStatus, MetricComparison, MetricSummary,
    MetricsLedger,
};
use crate::domain::DomainError;

/// Stateless analyzer turning ledger samples into a [`ComparisonReport`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparativeAnalyzer;

impl ComparativeAnalyzer {
    /// Compare the variants of an experiment
    ///
    /// Fails with `InsufficientData` when the ledger holds no sample at all.
    /// Metrics a variant never reported are left out of its summary.
    pub fn compare(
        config: &ExperimentConfig,
        status: ExperimentStatus,
        ledger: &dyn MetricsLedger,
        generated_at: DateTime<Utc>,
    ) -> Result<ComparisonReport, DomainError> {
        let snapshot = ledger.snapshot()?;

        let mut report = ComparisonReport::new(
            config.test_id(),
            status,
            config.variants().to_vec(),
            generated_at,
        );

        for variant_id in config.variants() {
            let Some(metrics) = snapshot.get(variant_id) else {
                continue;
            };

            for (metric, samples) in metrics {
                if let Some(summary) = MetricSummary::from_samples(samples) {
                    report.total_samples += summary.count;
                    report
                        .variant_summaries
                        .entry(variant_id.clone())
                        .or_default()
                        .insert(metric.clone(), summary);
                }
            }
        }

        if report.total_samples == 0 {
            return Err(DomainError::insufficient_data(format!(
                "No metric samples recorded for test '{}'",
                config.test_id()
            )));
        }

        if let [variant_a, variant_b] = config.variants() {
            Self::compare_pair(&mut report, variant_a, variant_b);
        }

        debug!(
            test_id = %config.test_id(),
            total_samples = report.total_samples,
            compared_metrics = report.metrics_comparison.len(),
            winner = ?report.winner,
            "Built comparison report"
        );

        Ok(report)
    }

    fn compare_pair(report: &mut ComparisonReport, variant_a: &str, variant_b: &str) {
        report.compared_pair = Some((variant_a.to_string(), variant_b.to_string()));

        let metrics: BTreeSet<String> = report
            .variant_summaries
            .values()
            .flat_map(|metrics| metrics.keys().cloned())
            .collect();

        for metric in metrics {
            if let (Some(summary_a), Some(summary_b)) = (
                report.summary(variant_a, &metric),
                report.summary(variant_b, &metric),
            ) {
                let comparison = MetricComparison::new(variant_a, summary_a, variant_b, summary_b);
                report.metrics_comparison.insert(metric, comparison);
            }
        }

        let compared = report.metrics_comparison.len();
        let wins = |variant: &str| {
            report
                .metrics_comparison
                .values()
                .filter(|c| c.winner.as_deref() == Some(variant))
                .count()
        };
        let (wins_a, wins_b) = (wins(variant_a), wins(variant_b));

        // Overall winner needs a strict majority of compared metrics
        report.winner = if wins_a * 2 > compared {
            Some(variant_a.to_string())
        } else if wins_b * 2 > compared {
            Some(variant_b.to_string())
        } else {
            None
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::{validate_experiment, MockMetricsLedger, ProposedExperiment};
    use crate::domain::ErrorKind;

    fn ab_config() -> ExperimentConfig {
        let proposed = ProposedExperiment::ab("checkout", "model_a", "model_b")
            .with_weight("model_a", 0.5)
            .with_weight("model_b", 0.5);
        validate_experiment(&proposed).unwrap()
    }

    fn three_way_config() -> ExperimentConfig {
        let proposed = ProposedExperiment::with_variants("ranker", ["a", "b", "c"])
            .with_weight("a", 0.4)
            .with_weight("b", 0.3)
            .with_weight("c", 0.3);
        validate_experiment(&proposed).unwrap()
    }

    fn compare(config: &ExperimentConfig, ledger: &MockMetricsLedger) -> Result<ComparisonReport, DomainError> {
        ComparativeAnalyzer::compare(config, ExperimentStatus::Active, ledger, Utc::now())
    }

    #[test]
    fn test_empty_ledger_is_insufficient() {
        let err = compare(&ab_config(), &MockMetricsLedger::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn test_higher_mean_wins() {
        let ledger = MockMetricsLedger::with_samples(&[
            ("model_a", "accuracy", 0.89),
            ("model_a", "accuracy", 0.91),
            ("model_b", "accuracy", 0.91),
            ("model_b", "accuracy", 0.93),
        ]);

        let report = compare(&ab_config(), &ledger).unwrap();

        let accuracy = &report.metrics_comparison["accuracy"];
        assert!((accuracy.mean_a - 0.90).abs() < 1e-9);
        assert!((accuracy.mean_b - 0.92).abs() < 1e-9);
        assert_eq!(accuracy.count_a, 2);
        assert_eq!(report.winner.as_deref(), Some("model_b"));
        assert_eq!(
            report.compared_pair,
            Some(("model_a".to_string(), "model_b".to_string()))
        );
        assert_eq!(report.total_samples, 4);
    }

    #[test]
    fn test_equal_means_inconclusive() {
        let ledger = MockMetricsLedger::with_samples(&[
            ("model_a", "accuracy", 0.9),
            ("model_b", "accuracy", 0.9),
        ]);

        let report = compare(&ab_config(), &ledger).unwrap();

        assert!(report.metrics_comparison["accuracy"].winner.is_none());
        assert!(!report.is_conclusive());
    }

    #[test]
    fn test_split_metrics_inconclusive() {
        let ledger = MockMetricsLedger::with_samples(&[
            ("model_a", "accuracy", 0.9),
            ("model_b", "accuracy", 0.8),
            ("model_a", "f1", 0.7),
            ("model_b", "f1", 0.75),
        ]);

        let report = compare(&ab_config(), &ledger).unwrap();

        assert_eq!(report.metrics_comparison.len(), 2);
        assert!(report.winner.is_none());
    }

    #[test]
    fn test_majority_of_metrics_wins() {
        let ledger = MockMetricsLedger::with_samples(&[
            ("model_a", "accuracy", 0.9),
            ("model_b", "accuracy", 0.95),
            ("model_a", "f1", 0.7),
            ("model_b", "f1", 0.75),
            ("model_a", "recall", 0.8),
            ("model_b", "recall", 0.6),
        ]);

        let report = compare(&ab_config(), &ledger).unwrap();
        assert_eq!(report.winner.as_deref(), Some("model_b"));
    }

    #[test]
    fn test_metric_missing_for_one_variant_is_not_compared() {
        let ledger = MockMetricsLedger::with_samples(&[
            ("model_a", "accuracy", 0.9),
            ("model_b", "accuracy", 0.95),
            ("model_a", "latency_ms", 120.0),
        ]);

        let report = compare(&ab_config(), &ledger).unwrap();

        assert!(report.metrics_comparison.get("latency_ms").is_none());
        assert!(report.summary("model_a", "latency_ms").is_some());
        assert!(report.summary("model_b", "latency_ms").is_none());
        assert_eq!(report.winner.as_deref(), Some("model_b"));
    }

    #[test]
    fn test_only_one_variant_reported() {
        let ledger = MockMetricsLedger::with_samples(&[("model_a", "accuracy", 0.9)]);

        let report = compare(&ab_config(), &ledger).unwrap();

        assert!(report.metrics_comparison.is_empty());
        assert!(report.winner.is_none());
        assert!(!report.variant_summaries.contains_key("model_b"));
    }

    #[test]
    fn test_three_variants_only_summaries() {
        let ledger = MockMetricsLedger::with_samples(&[
            ("a", "accuracy", 0.80),
            ("b", "accuracy", 0.85),
            ("c", "accuracy", 0.99),
        ]);

        let report = compare(&three_way_config(), &ledger).unwrap();

        assert_eq!(report.variant_summaries.len(), 3);
        assert!(report.metrics_comparison.is_empty());
        assert!(report.compared_pair.is_none());
        assert!(report.winner.is_none());
        assert_eq!(report.summary("c", "accuracy").unwrap().mean, 0.99);
    }

    #[test]
    fn test_samples_for_unknown_variants_ignored() {
        let ledger = MockMetricsLedger::with_samples(&[
            ("model_a", "accuracy", 0.9),
            ("ghost", "accuracy", 1.0),
        ]);

        let report = compare(&ab_config(), &ledger).unwrap();

        assert!(!report.variant_summaries.contains_key("ghost"));
        assert_eq!(report.total_samples, 1);
    }
}
