//! Experiment domain entities

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// VariantSet
// ============================================================================

/// The competing variants of a proposed experiment
///
/// Accepts either the `model_a`/`model_b` shorthand or an explicit ordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantSet {
    Pair { model_a: String, model_b: String },
    List { variants: Vec<String> },
}

impl VariantSet {
    /// Get the variants in declaration order
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Pair { model_a, model_b } => vec![model_a.clone(), model_b.clone()],
            Self::List { variants } => variants.clone(),
        }
    }
}

// ============================================================================
// ProposedExperiment
// ============================================================================

/// An experiment definition that has not been validated yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedExperiment {
    pub test_id: String,
    #[serde(flatten)]
    pub variants: VariantSet,
    #[serde(default)]
    pub traffic_split: HashMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
}

impl ProposedExperiment {
    /// Create a two-variant proposal using the `model_a`/`model_b` shorthand
    pub fn ab(
        test_id: impl Into<String>,
        model_a: impl Into<String>,
        model_b: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            variants: VariantSet::Pair {
                model_a: model_a.into(),
                model_b: model_b.into(),
            },
            traffic_split: HashMap::new(),
            duration_hours: None,
        }
    }

    /// Create a proposal from an explicit variant list
    pub fn with_variants<I, S>(test_id: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            test_id: test_id.into(),
            variants: VariantSet::List {
                variants: variants.into_iter().map(Into::into).collect(),
            },
            traffic_split: HashMap::new(),
            duration_hours: None,
        }
    }

    /// Set the traffic weight of a variant
    pub fn with_weight(mut self, variant_id: impl Into<String>, weight: f64) -> Self {
        self.traffic_split.insert(variant_id.into(), weight);
        self
    }

    /// Set the experiment duration
    pub fn with_duration_hours(mut self, hours: f64) -> Self {
        self.duration_hours = Some(hours);
        self
    }
}

// ============================================================================
// TrafficSplit
// ============================================================================

/// Weight of a single variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantWeight {
    variant_id: String,
    weight: f64,
}

impl VariantWeight {
    /// Get the variant ID
    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    /// Get the weight
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Validated, ordered traffic split
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TrafficSplit {
    weights: Vec<VariantWeight>,
}

impl TrafficSplit {
    pub(crate) fn new(weights: Vec<(String, f64)>) -> Self {
        Self {
            weights: weights
                .into_iter()
                .map(|(variant_id, weight)| VariantWeight { variant_id, weight })
                .collect(),
        }
    }

    /// Iterate over `(variant, weight)` pairs in walk order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|w| (w.variant_id.as_str(), w.weight))
    }

    /// Get the weight of a variant
    pub fn weight(&self, variant_id: &str) -> Option<f64> {
        self.weights
            .iter()
            .find(|w| w.variant_id == variant_id)
            .map(|w| w.weight)
    }

    /// Get the variant owning a point in [0, 1)
    ///
    /// Returns the first variant whose cumulative boundary exceeds `point`.
    /// Rounding can leave a point just past the last boundary; it belongs to the
    /// last variant with non-zero weight.
    pub fn variant_for_point(&self, point: f64) -> Option<&str> {
        let mut cumulative = 0.0;

        for allocation in &self.weights {
            cumulative += allocation.weight;

            if point < cumulative {
                return Some(&allocation.variant_id);
            }
        }

        self.weights
            .iter()
            .rev()
            .find(|w| w.weight > 0.0)
            .map(|w| w.variant_id.as_str())
    }
}

// ============================================================================
// ExperimentConfig
// ============================================================================

/// Immutable, validated experiment definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentConfig {
    test_id: String,
    variants: Vec<String>,
    traffic_split: TrafficSplit,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_hours: Option<f64>,
}

impl ExperimentConfig {
    pub(crate) fn new(
        test_id: String,
        variants: Vec<String>,
        traffic_split: TrafficSplit,
        duration_hours: Option<f64>,
    ) -> Self {
        Self {
            test_id,
            variants,
            traffic_split,
            duration_hours,
        }
    }

    /// Get the test ID
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// Get the variants in declaration order
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Get the traffic split
    pub fn traffic_split(&self) -> &TrafficSplit {
        &self.traffic_split
    }

    /// Get the duration, `None` meaning unlimited
    pub fn duration_hours(&self) -> Option<f64> {
        self.duration_hours
    }

    /// Check if a variant belongs to this experiment
    pub fn has_variant(&self, variant_id: &str) -> bool {
        self.variants.iter().any(|v| v == variant_id)
    }

    pub(crate) fn with_default_duration(mut self, hours: Option<f64>) -> Self {
        if self.duration_hours.is_none() {
            self.duration_hours = hours;
        }
        self
    }

    pub(crate) fn with_traffic_split(&self, traffic_split: TrafficSplit) -> Self {
        Self {
            traffic_split,
            ..self.clone()
        }
    }
}

// ============================================================================
// ExperimentStatus
// ============================================================================

/// Status of an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Experiment exists but is not routing yet
    #[default]
    Created,
    /// Experiment is routing live traffic
    Active,
    /// Experiment was stopped explicitly
    Stopped,
    /// Experiment ran past its duration
    Expired,
}

impl ExperimentStatus {
    /// Check if the experiment is currently routing traffic
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check if the experiment can never route again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Expired)
    }

    /// Check if a transition to the target status is valid
    pub fn can_transition_to(&self, target: ExperimentStatus) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Active)
                | (Self::Active, Self::Stopped)
                | (Self::Active, Self::Expired)
        )
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Active => write!(f, "active"),
            Self::Stopped => write!(f, "stopped"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

// ============================================================================
// ExperimentState
// ============================================================================

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Live state of one experiment
#[derive(Debug, Clone)]
pub struct ExperimentState {
    config: ExperimentConfig,
    status: ExperimentStatus,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl ExperimentState {
    /// Create the state for a new experiment, activating it immediately
    pub fn new(config: ExperimentConfig, now: DateTime<Utc>) -> Self {
        let mut state = Self {
            config,
            status: ExperimentStatus::Created,
            created_at: now,
            ended_at: None,
        };
        state.transition(ExperimentStatus::Active, now);
        state
    }

    /// Get the configuration
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Get the current status
    ///
    /// This does not check expiry; call [`ExperimentState::expire_if_due`] first.
    pub fn status(&self) -> ExperimentStatus {
        self.status
    }

    /// Get when the experiment was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get when the experiment stopped or expired
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Get the instant the experiment expires
    ///
    /// `None` when the experiment has no duration, or when the duration reaches
    /// past the representable calendar. Durations are rounded up to whole
    /// milliseconds, so every experiment lives at least its full duration.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let hours = self.config.duration_hours()?;
        // `as` saturates, so huge durations fall through to `try_milliseconds`
        let millis = (hours * MILLIS_PER_HOUR).ceil() as i64;

        Duration::try_milliseconds(millis)
            .and_then(|duration| self.created_at.checked_add_signed(duration))
    }

    /// Expire the experiment if its duration has elapsed
    ///
    /// Returns `true` when this call performed the transition.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) if now >= expires_at => {
                self.transition(ExperimentStatus::Expired, expires_at)
            }
            _ => false,
        }
    }

    /// Stop the experiment
    ///
    /// Returns `true` when this call performed the transition; stopping a
    /// terminal experiment is a no-op.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        self.transition(ExperimentStatus::Stopped, now)
    }

    /// Replace the traffic split of the configuration
    pub fn replace_traffic_split(&mut self, traffic_split: TrafficSplit) {
        self.config = self.config.with_traffic_split(traffic_split);
    }

    fn transition(&mut self, target: ExperimentStatus, at: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(target) {
            return false;
        }

        self.status = target;

        if target.is_terminal() {
            self.ended_at = Some(at);
        }

        true
    }
}
