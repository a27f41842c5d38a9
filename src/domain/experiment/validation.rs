//! Experiment validation utilities
//!
//! Every experiment definition passes through [`validate_experiment`] before it
//! is admitted, and every traffic split update passes through
//! [`validate_traffic_split`]. Both are pure.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::entity::{ExperimentConfig, ProposedExperiment, TrafficSplit};

/// Allowed distance between the weight sum and 1.0
pub const SPLIT_SUM_TOLERANCE: f64 = 1e-6;

/// Minimum number of distinct variants in an experiment
pub const MIN_VARIANTS: usize = 2;

/// Validation errors for experiment definitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Test ID cannot be empty")]
    EmptyTestId,

    #[error("Variant ID cannot be empty")]
    EmptyVariantId,

    #[error("Experiment must have at least 2 distinct variants")]
    InsufficientVariants,

    #[error("Duplicate variant ID: '{0}'")]
    DuplicateVariantId(String),

    #[error("Traffic split has no weight for variant: '{0}'")]
    MissingSplitKey(String),

    #[error("Traffic allocated to unknown variant: '{0}'")]
    UnknownVariantInSplit(String),

    #[error("Traffic split values must be between 0 and 1")]
    WeightOutOfRange { variant_id: String, weight: f64 },

    #[error("Traffic split must sum to 1.0")]
    InvalidSplitSum(f64),

    #[error("Duration must be a positive number of hours, got {0}")]
    InvalidDuration(f64),
}

/// Validate a proposed experiment and build its immutable configuration
///
/// Rules are checked in order: test ID, variant set, split keys, weight range,
/// weight sum, duration. The first failing rule is reported.
pub fn validate_experiment(proposed: &ProposedExperiment) -> Result<ExperimentConfig, ConfigError> {
    if proposed.test_id.is_empty() {
        return Err(ConfigError::EmptyTestId);
    }

    let variants = proposed.variants.to_vec();
    validate_variant_set(&variants)?;

    let traffic_split = validate_traffic_split(&variants, &proposed.traffic_split)?;

    if let Some(hours) = proposed.duration_hours {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(ConfigError::InvalidDuration(hours));
        }
    }

    Ok(ExperimentConfig::new(
        proposed.test_id.clone(),
        variants,
        traffic_split,
        proposed.duration_hours,
    ))
}

/// Validate a traffic split against an ordered variant list
///
/// The returned split preserves the order of `variants`, which is the order the
/// assignment walk uses.
pub fn validate_traffic_split(
    variants: &[String],
    split: &HashMap<String, f64>,
) -> Result<TrafficSplit, ConfigError> {
    for variant_id in variants {
        if !split.contains_key(variant_id) {
            return Err(ConfigError::MissingSplitKey(variant_id.clone()));
        }
    }

    if let Some(unknown) = split.keys().find(|key| !variants.contains(*key)) {
        return Err(ConfigError::UnknownVariantInSplit(unknown.clone()));
    }

    let mut weights = Vec::with_capacity(variants.len());

    for variant_id in variants {
        let weight = split[variant_id];

        if !(0.0..=1.0).contains(&weight) {
            return Err(ConfigError::WeightOutOfRange {
                variant_id: variant_id.clone(),
                weight,
            });
        }

        weights.push((variant_id.clone(), weight));
    }

    let sum: f64 = weights.iter().map(|(_, w)| w).sum();

    if (sum - 1.0).abs() > SPLIT_SUM_TOLERANCE {
        return Err(ConfigError::InvalidSplitSum(sum));
    }

    Ok(TrafficSplit::new(weights))
}

fn validate_variant_set(variants: &[String]) -> Result<(), ConfigError> {
    if variants.iter().any(|variant_id| variant_id.is_empty()) {
        return Err(ConfigError::EmptyVariantId);
    }

    let distinct: HashSet<&str> = variants.iter().map(String::as_str).collect();

    if distinct.len() < MIN_VARIANTS {
        return Err(ConfigError::InsufficientVariants);
    }

    let mut seen = HashSet::new();

    for variant_id in variants {
        if !seen.insert(variant_id.as_str()) {
            return Err(ConfigError::DuplicateVariantId(variant_id.clone()));
        }
    }

    Ok(())
}
