//! Experiment router for A/B testing
//!
//! Public surface for creating experiments, routing traffic between their
//! variants, recording outcomes and comparing the results.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ExperimentSettings, RouterConfig};
use crate::domain::experiment::{
    validate_experiment, validate_traffic_split, Assignment, ComparisonReport, ExperimentConfig,
    ExperimentStatus, MetricsLedger, MetricsSnapshot, ProposedExperiment,
    StatisticalSignificance,
};
use crate::domain::{Clock, DomainError, SystemClock};
use crate::infrastructure::experiment::{
    calculate_significance, ComparativeAnalyzer, ConsistentHasher, ExperimentRegistry,
    InMemoryMetricsLedger,
};

// ============================================================================
// Experiment Router
// ============================================================================

/// Router managing A/B tests between model variants
///
/// Construct once and share by `Arc`; every operation takes `&self`.
#[derive(Debug)]
pub struct ExperimentRouter<L = InMemoryMetricsLedger> {
    registry: ExperimentRegistry<L>,
    settings: ExperimentSettings,
}

impl ExperimentRouter<InMemoryMetricsLedger> {
    /// Create a router with default settings and the system clock
    pub fn new() -> Self {
        Self::with_settings(ExperimentSettings::default(), Arc::new(SystemClock))
    }

    /// Create a router from loaded configuration
    pub fn from_config(config: &RouterConfig) -> Self {
        Self::with_settings(config.experiments.clone(), Arc::new(SystemClock))
    }
}

impl Default for ExperimentRouter<InMemoryMetricsLedger> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: MetricsLedger + Default> ExperimentRouter<L> {
    /// Create a router with explicit settings and clock
    pub fn with_settings(settings: ExperimentSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: ExperimentRegistry::new(clock),
            settings,
        }
    }

    /// Get the experiment settings
    pub fn settings(&self) -> &ExperimentSettings {
        &self.settings
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Validate and start a new A/B test
    ///
    /// A test with the same ID is replaced, discarding its recorded metrics.
    pub fn create_ab_test(&self, proposed: &ProposedExperiment) -> Result<String, DomainError> {
        debug!(test_id = %proposed.test_id, "Creating A/B test");

        let config = validate_experiment(proposed)?
            .with_default_duration(self.settings.default_duration_hours);
        let test_id = config.test_id().to_string();
        let variants = config.variants().to_vec();
        let duration_hours = config.duration_hours();

        self.registry.register(config)?;

        info!(
            test_id = %test_id,
            variants = ?variants,
            duration_hours = ?duration_hours,
            "A/B test created"
        );

        Ok(test_id)
    }

    /// Stop a test
    ///
    /// Returns `false` if the test had already stopped or expired.
    pub fn stop_ab_test(&self, test_id: &str) -> Result<bool, DomainError> {
        self.registry.stop(test_id)
    }

    /// Replace the traffic split of an active test
    ///
    /// The split is validated against the test's variants; on failure the
    /// current split stays in place.
    pub fn update_traffic_split(
        &self,
        test_id: &str,
        new_split: &HashMap<String, f64>,
    ) -> Result<(), DomainError> {
        debug!(test_id = %test_id, "Updating traffic split");

        let entry = self.registry.get(test_id)?;
        let mut state = self.registry.lock_active(&entry)?;

        let split = validate_traffic_split(state.config().variants(), new_split)?;
        state.replace_traffic_split(split);

        info!(
            test_id = %test_id,
            traffic_split = ?state.config().traffic_split(),
            "Traffic split updated"
        );

        Ok(())
    }

    /// List the IDs of all active tests, sorted
    pub fn list_active_tests(&self) -> Result<Vec<String>, DomainError> {
        self.registry.list_active()
    }

    /// Get the configuration of an active test
    pub fn get_active_test(&self, test_id: &str) -> Result<ExperimentConfig, DomainError> {
        self.registry.active_config(test_id)
    }

    /// Get the status of any known test
    pub fn test_status(&self, test_id: &str) -> Result<ExperimentStatus, DomainError> {
        self.registry.status(test_id)
    }

    /// Expire every test whose duration has elapsed
    ///
    /// Expiry is otherwise applied when a test is next touched. Returns the IDs
    /// this call expired, sorted.
    pub fn expire_due_tests(&self) -> Result<Vec<String>, DomainError> {
        let expired = self.registry.expire_due()?;

        if !expired.is_empty() {
            info!(count = expired.len(), test_ids = ?expired, "Expired due tests");
        }

        Ok(expired)
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Pick the variant serving an entity in an active test
    pub fn route_request(&self, test_id: &str, entity_id: &str) -> Result<String, DomainError> {
        self.route_request_detailed(test_id, entity_id)
            .map(|assignment| assignment.variant_id)
    }

    /// Pick the variant serving an entity, with the hash point it was placed at
    pub fn route_request_detailed(
        &self,
        test_id: &str,
        entity_id: &str,
    ) -> Result<Assignment, DomainError> {
        let entry = self.registry.get(test_id)?;
        let state = self.registry.lock_active(&entry)?;

        let assignment = ConsistentHasher::assign(test_id, entity_id, state.config().traffic_split())
            .ok_or_else(|| {
                DomainError::internal(format!("Test '{}' has no routable variant", test_id))
            })?;

        debug!(
            test_id = %test_id,
            entity_id = %entity_id,
            variant_id = %assignment.variant_id,
            point = assignment.point,
            "Request routed"
        );

        Ok(assignment)
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    /// Record one metric sample for a variant
    ///
    /// Samples for tests that never existed are ignored, and samples for variants
    /// outside the test are dropped. Stopped and expired tests still accept samples.
    ///
    /// The sample belongs to the test registered under `test_id` when the call
    /// looks it up. If `create_ab_test` replaces that test before the append
    /// lands, the sample goes to the replaced ledger and is discarded with it.
    pub fn record_metric(
        &self,
        test_id: &str,
        variant_id: &str,
        metric_name: &str,
        value: f64,
    ) -> Result<(), DomainError> {
        if !value.is_finite() {
            return Err(DomainError::validation(format!(
                "Metric '{}' value must be finite, got {}",
                metric_name, value
            )));
        }

        let Some(entry) = self.registry.find(test_id)? else {
            debug!(test_id = %test_id, "Ignoring metric for unknown test");
            return Ok(());
        };

        if !entry.lock(self.registry.clock())?.config().has_variant(variant_id) {
            warn!(
                test_id = %test_id,
                variant_id = %variant_id,
                metric = %metric_name,
                "Dropping metric for variant outside the test"
            );
            return Ok(());
        }

        entry.ledger().append(variant_id, metric_name, value)
    }

    /// Get every recorded sample of a test, by variant and metric
    pub fn get_test_metrics(&self, test_id: &str) -> Result<MetricsSnapshot, DomainError> {
        self.registry.get(test_id)?.ledger().snapshot()
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    /// Compare the variants of a test on everything recorded so far
    pub fn get_ab_test_results(&self, test_id: &str) -> Result<ComparisonReport, DomainError> {
        let entry = self.registry.get(test_id)?;

        let (config, status) = {
            let state = entry.lock(self.registry.clock())?;
            (state.config().clone(), state.status())
        };

        ComparativeAnalyzer::compare(
            &config,
            status,
            entry.ledger().as_ref(),
            self.registry.clock().now(),
        )
    }

    /// Run Welch's t-test on one metric of a two-variant test
    ///
    /// The first variant is the baseline. Uses the configured confidence level
    /// unless one is given. Returns `None` while either variant has fewer than
    /// two samples or both are constant.
    pub fn significance(
        &self,
        test_id: &str,
        metric: &str,
        confidence_level: Option<f64>,
    ) -> Result<Option<StatisticalSignificance>, DomainError> {
        let confidence_level = confidence_level.unwrap_or(self.settings.confidence_level);

        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(DomainError::validation(format!(
                "Confidence level must be between 0 and 1, got {}",
                confidence_level
            )));
        }

        let entry = self.registry.get(test_id)?;
        let config = entry.lock(self.registry.clock())?.config().clone();

        let [baseline, candidate] = config.variants() else {
            return Err(DomainError::validation(format!(
                "Significance needs exactly two variants, test '{}' has {}",
                test_id,
                config.variants().len()
            )));
        };

        let ledger = entry.ledger();
        let baseline_samples = ledger.samples(baseline, metric)?;
        let candidate_samples = ledger.samples(candidate, metric)?;

        Ok(calculate_significance(
            &baseline_samples,
            &candidate_samples,
            baseline,
            candidate,
            metric,
            confidence_level,
        ))
    }
}
