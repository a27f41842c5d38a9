//! Router configuration

mod app_config;

pub use app_config::{ExperimentSettings, LogFormat, LoggingConfig, RouterConfig};
