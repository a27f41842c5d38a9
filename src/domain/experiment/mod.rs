//! Experiment domain module for A/B testing
//!
//! This module provides types and traits for routing requests between
//! competing model variants and comparing their recorded outcomes.

mod assignment;
mod entity;
mod repository;
mod result;
mod stats;
mod validation;

// Re-export all public types
pub use assignment::Assignment;
pub use entity::{
    ExperimentConfig, ExperimentState, ExperimentStatus, ProposedExperiment, TrafficSplit,
    VariantSet, VariantWeight,
};
pub use repository::{MetricsLedger, MetricsSnapshot};
pub use result::{ComparisonReport, MetricComparison, MetricSummary, StatisticalSignificance};
pub use stats::{mean, std_dev, variance};
pub use validation::{
    validate_experiment, validate_traffic_split, ConfigError, MIN_VARIANTS, SPLIT_SUM_TOLERANCE,
};

#[cfg(test)]
pub use repository::mock::MockMetricsLedger;
