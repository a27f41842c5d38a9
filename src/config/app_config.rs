use serde::Deserialize;

/// Router configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    pub logging: LoggingConfig,
    pub experiments: ExperimentSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Defaults applied to experiments and their analysis
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExperimentSettings {
    /// Duration given to experiments created without one; `None` means unlimited
    pub default_duration_hours: Option<f64>,
    /// Confidence level for significance tests, in (0, 1)
    pub confidence_level: f64,
    /// Number of resamples drawn by the offline bootstrap
    pub bootstrap_iterations: usize,
    /// Seed for the offline bootstrap; random when unset
    pub bootstrap_seed: Option<u64>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        Self {
            default_duration_hours: None,
            confidence_level: 0.95,
            bootstrap_iterations: 1000,
            bootstrap_seed: None,
        }
    }
}

impl ExperimentSettings {
    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), String> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(format!(
                "experiments.confidence_level must be between 0 and 1, got {}",
                self.confidence_level
            ));
        }

        if self.bootstrap_iterations == 0 {
            return Err("experiments.bootstrap_iterations must be positive".to_string());
        }

        if let Some(hours) = self.default_duration_hours {
            if !hours.is_finite() || hours <= 0.0 {
                return Err(format!(
                    "experiments.default_duration_hours must be a positive number, got {}",
                    hours
                ));
            }
        }

        Ok(())
    }
}

impl RouterConfig {
    /// Load configuration from `config/default`, `config/local` and `ROUTER__*`
    /// environment variables, in increasing priority. A `.env` file is read first.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("ROUTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: config::Config) -> Result<Self, config::ConfigError> {
        let router_config: Self = config.try_deserialize()?;

        router_config
            .experiments
            .validate()
            .map_err(config::ConfigError::Message)?;

        Ok(router_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn from_toml(toml: &str) -> Result<RouterConfig, config::ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        RouterConfig::from_config(config)
    }

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.experiments.default_duration_hours, None);
        assert_eq!(config.experiments.confidence_level, 0.95);
        assert_eq!(config.experiments.bootstrap_iterations, 1000);
        assert_eq!(config.experiments.bootstrap_seed, None);
        assert!(config.experiments.validate().is_ok());
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let config = from_toml("").unwrap();
        assert_eq!(config.experiments, ExperimentSettings::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = from_toml(
            r#"
            [logging]
            format = "json"

            [experiments]
            default_duration_hours = 48.0
            bootstrap_seed = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.experiments.default_duration_hours, Some(48.0));
        assert_eq!(config.experiments.bootstrap_seed, Some(42));
        assert_eq!(config.experiments.confidence_level, 0.95);
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        let err = from_toml(
            r#"
            [experiments]
            confidence_level = 1.5
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("confidence_level"));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let settings = ExperimentSettings {
            bootstrap_iterations: 0,
            ..ExperimentSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_non_positive_default_duration_rejected() {
        let settings = ExperimentSettings {
            default_duration_hours: Some(-1.0),
            ..ExperimentSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = ExperimentSettings {
            default_duration_hours: Some(0.0),
            ..ExperimentSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
