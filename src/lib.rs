//! PMP Experiment Router
//!
//! In-process A/B testing between competing model variants:
//! - Validated experiment definitions with weighted traffic splits
//! - Deterministic, sticky hash-based variant assignment
//! - Per-variant metric ledgers with descriptive comparison reports
//! - Lazy wall-clock expiry and explicit stop
//! - Offline classifier comparison with bootstrap significance
//!
//! ```no_run
//! use pmp_experiment_router::{ExperimentRouter, ProposedExperiment};
//!
//! # fn main() -> Result<(), pmp_experiment_router::DomainError> {
//! let router = ExperimentRouter::new();
//!
//! let proposed = ProposedExperiment::ab("ranker-v2", "model_a", "model_b")
//!     .with_weight("model_a", 0.7)
//!     .with_weight("model_b", 0.3);
//! router.create_ab_test(&proposed)?;
//!
//! let variant = router.route_request("ranker-v2", "user-42")?;
//! router.record_metric("ranker-v2", &variant, "accuracy", 0.93)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::RouterConfig;
pub use domain::{
    Assignment, ComparisonReport, DomainError, ErrorKind, ExperimentConfig, ExperimentStatus,
    ProposedExperiment,
};
pub use infrastructure::evaluation::ModelComparator;
pub use infrastructure::services::ExperimentRouter;

use infrastructure::logging::init_logging;

/// Load configuration, install logging and build a router from it
///
/// Logging installation is skipped if a subscriber is already set.
pub fn bootstrap() -> Result<(RouterConfig, ExperimentRouter), ::config::ConfigError> {
    let config = RouterConfig::load()?;

    if init_logging(&config.logging).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }

    let router = ExperimentRouter::from_config(&config);
    Ok((config, router))
}
