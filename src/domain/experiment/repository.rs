//! Metrics ledger trait and snapshot types

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Samples of one experiment keyed by variant, then metric name
pub type MetricsSnapshot = BTreeMap<String, BTreeMap<String, Vec<f64>>>;

// ============================================================================
// MetricsLedger
// ============================================================================

/// Append-only sample store for a single experiment
///
/// Samples for a `(variant, metric)` key are kept in append order. Appends from
/// concurrent callers must never be lost.
pub trait MetricsLedger: Send + Sync + Debug {
    /// Append a sample
    fn append(&self, variant_id: &str, metric_name: &str, value: f64) -> Result<(), DomainError>;

    /// Get the samples of one key in append order
    fn samples(&self, variant_id: &str, metric_name: &str) -> Result<Vec<f64>, DomainError>;

    /// Get a copy of every sample
    fn snapshot(&self) -> Result<MetricsSnapshot, DomainError>;

    /// Count all samples
    fn sample_count(&self) -> Result<usize, DomainError> {
        Ok(self
            .snapshot()?
            .values()
            .flat_map(|metrics| metrics.values())
            .map(Vec::len)
            .sum())
    }

    /// Check if no sample was recorded yet
    fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.sample_count()? == 0)
    }
}
