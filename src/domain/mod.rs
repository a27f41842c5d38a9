//! Domain layer - Core experiment entities and rules

pub mod clock;
pub mod error;
pub mod experiment;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DomainError, ErrorKind};
pub use experiment::{
    Assignment, ComparisonReport, ConfigError, ExperimentConfig, ExperimentState,
    ExperimentStatus, MetricComparison, MetricSummary, MetricsLedger, MetricsSnapshot,
    ProposedExperiment, StatisticalSignificance, TrafficSplit, VariantSet,
};
