//! In-memory implementation of the metrics ledger

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::experiment::{MetricsLedger, MetricsSnapshot};
use crate::domain::DomainError;

type SampleKey = (String, String);

/// In-memory metrics ledger for one experiment
///
/// A single lock guards all keys of the experiment, so appends to the same key
/// are serialized and keep their order.
#[derive(Debug, Default)]
pub struct InMemoryMetricsLedger {
    samples: RwLock<HashMap<SampleKey, Vec<f64>>>,
}

impl InMemoryMetricsLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsLedger for InMemoryMetricsLedger {
    fn append(&self, variant_id: &str, metric_name: &str, value: f64) -> Result<(), DomainError> {
        let mut samples = self
            .samples
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        samples
            .entry((variant_id.to_string(), metric_name.to_string()))
            .or_default()
            .push(value);

        Ok(())
    }

    fn samples(&self, variant_id: &str, metric_name: &str) -> Result<Vec<f64>, DomainError> {
        let samples = self
            .samples
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(samples
            .get(&(variant_id.to_string(), metric_name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn snapshot(&self) -> Result<MetricsSnapshot, DomainError> {
        let samples = self
            .samples
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut snapshot = MetricsSnapshot::new();

        for ((variant_id, metric_name), values) in samples.iter() {
            snapshot
                .entry(variant_id.clone())
                .or_default()
                .insert(metric_name.clone(), values.clone());
        }

        Ok(snapshot)
    }

    fn sample_count(&self) -> Result<usize, DomainError> {
        let samples = self
            .samples
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(samples.values().map(Vec::len).sum())
    }
}
