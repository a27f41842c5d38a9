//! Offline model evaluation

mod comparator;

pub use comparator::{
    BootstrapResult, ClassificationMetric, ClassificationMetrics, ModelComparator,
    ModelComparison,
};
