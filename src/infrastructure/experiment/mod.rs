//! Infrastructure layer for experiment A/B testing
//!
//! Provides the in-memory ledger, the experiment registry and the hashing and
//! significance utilities the router is built from.

mod analyzer;
mod consistent_hashing;
mod in_memory_ledger;
mod registry;
mod statistical;

pub use analyzer::ComparativeAnalyzer;
pub use consistent_hashing::ConsistentHasher;
pub use in_memory_ledger::InMemoryMetricsLedger;
pub use registry::{ExperimentEntry, ExperimentRegistry};
pub use statistical::{calculate_significance, welch_t_test, WelchTest};
