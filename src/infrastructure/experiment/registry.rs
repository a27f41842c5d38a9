//! Registry of live experiments and their lifecycle
//!
//! Each experiment lives in its own entry with its own lock, so transitions of
//! one test never wait on another. Expiry is checked lazily whenever an entry is
//! locked; there is no background timer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{debug, info, warn};

use crate::domain::experiment::{ExperimentConfig, ExperimentState, ExperimentStatus, MetricsLedger};
use crate::domain::{Clock, DomainError};

// ============================================================================
// ExperimentEntry
// ============================================================================

/// One registered experiment: its state and its ledger
#[derive(Debug)]
pub struct ExperimentEntry<L> {
    test_id: String,
    state: Mutex<ExperimentState>,
    ledger: Arc<L>,
}

impl<L: MetricsLedger> ExperimentEntry<L> {
    fn new(state: ExperimentState, ledger: L) -> Self {
        Self {
            test_id: state.config().test_id().to_string(),
            state: Mutex::new(state),
            ledger: Arc::new(ledger),
        }
    }

    /// Get the ledger of this experiment
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Lock the state, applying any due expiry first
    pub fn lock(&self, clock: &dyn Clock) -> Result<MutexGuard<'_, ExperimentState>, DomainError> {
        self.lock_refreshed(clock).map(|(state, _)| state)
    }

    /// Lock the state and report whether this call applied the expiry
    fn lock_refreshed(
        &self,
        clock: &dyn Clock,
    ) -> Result<(MutexGuard<'_, ExperimentState>, bool), DomainError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| DomainError::internal(format!("Failed to acquire state lock: {}", e)))?;

        let expired = state.expire_if_due(clock.now());

        if expired {
            info!(
                test_id = %self.test_id,
                expired_at = ?state.ended_at(),
                "Experiment expired"
            );
        }

        Ok((state, expired))
    }
}

// ============================================================================
// ExperimentRegistry
// ============================================================================

/// Registry mapping test IDs to their experiment entries
#[derive(Debug)]
pub struct ExperimentRegistry<L> {
    entries: RwLock<HashMap<String, Arc<ExperimentEntry<L>>>>,
    clock: Arc<dyn Clock>,
}

impl<L: MetricsLedger + Default> ExperimentRegistry<L> {
    /// Create an empty registry
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Get the clock used for lifecycle checks
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Register a new active experiment with an empty ledger
    ///
    /// An existing experiment with the same ID is replaced along with its samples.
    pub fn register(&self, config: ExperimentConfig) -> Result<Arc<ExperimentEntry<L>>, DomainError> {
        let test_id = config.test_id().to_string();
        let state = ExperimentState::new(config, self.clock.now());
        let entry = Arc::new(ExperimentEntry::new(state, L::default()));

        let mut entries = self
            .entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        if entries.insert(test_id.clone(), Arc::clone(&entry)).is_some() {
            warn!(test_id = %test_id, "Replaced existing experiment and its metrics");
        }

        Ok(entry)
    }

    /// Get the entry of an experiment in any status
    pub fn get(&self, test_id: &str) -> Result<Arc<ExperimentEntry<L>>, DomainError> {
        self.find(test_id)?
            .ok_or_else(|| DomainError::not_found(format!("Test '{}' not found", test_id)))
    }

    /// Get the entry of an experiment if it was ever registered
    pub fn find(&self, test_id: &str) -> Result<Option<Arc<ExperimentEntry<L>>>, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(entries.get(test_id).cloned())
    }

    /// Lock the state of an experiment that is still active
    ///
    /// Stopped, expired and unknown experiments are all reported as not found.
    pub fn lock_active<'a>(
        &self,
        entry: &'a ExperimentEntry<L>,
    ) -> Result<MutexGuard<'a, ExperimentState>, DomainError> {
        let state = entry.lock(self.clock())?;

        if !state.status().is_active() {
            return Err(DomainError::not_found(format!(
                "No active test '{}' ({})",
                entry.test_id,
                state.status()
            )));
        }

        Ok(state)
    }

    /// Get the configuration of an active experiment
    pub fn active_config(&self, test_id: &str) -> Result<ExperimentConfig, DomainError> {
        let entry = self.get(test_id)?;
        let state = self.lock_active(&entry)?;
        Ok(state.config().clone())
    }

    /// Get the current status of an experiment
    pub fn status(&self, test_id: &str) -> Result<ExperimentStatus, DomainError> {
        let entry = self.get(test_id)?;
        let state = entry.lock(self.clock())?;
        Ok(state.status())
    }

    /// Stop an experiment
    ///
    /// Returns `true` if this call stopped it, `false` if it had already ended.
    pub fn stop(&self, test_id: &str) -> Result<bool, DomainError> {
        debug!(test_id = %test_id, "Stopping experiment");

        let entry = self.get(test_id)?;
        let mut state = entry.lock(self.clock())?;

        let stopped = state.stop(self.clock.now());

        if stopped {
            info!(test_id = %test_id, "Experiment stopped");
        } else {
            debug!(test_id = %test_id, status = %state.status(), "Experiment already ended");
        }

        Ok(stopped)
    }

    /// List the IDs of all active experiments, sorted
    pub fn list_active(&self) -> Result<Vec<String>, DomainError> {
        let mut active = Vec::new();

        for entry in self.snapshot()? {
            if entry.lock(self.clock())?.status().is_active() {
                active.push(entry.test_id.clone());
            }
        }

        active.sort();
        Ok(active)
    }

    /// Expire every experiment whose duration has elapsed
    ///
    /// Returns the IDs this call expired, sorted. Experiments already expired by
    /// an earlier call, or by any other operation, are not reported again.
    pub fn expire_due(&self) -> Result<Vec<String>, DomainError> {
        let mut expired = Vec::new();

        for entry in self.snapshot()? {
            let (state, applied) = entry.lock_refreshed(self.clock())?;
            drop(state);
            if applied {
                expired.push(entry.test_id.clone());
            }
        }

        expired.sort();
        Ok(expired)
    }

    /// Clone the current entries so their locks are taken outside the map lock
    fn snapshot(&self) -> Result<Vec<Arc<ExperimentEntry<L>>>, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(entries.values().cloned().collect())
    }
}
