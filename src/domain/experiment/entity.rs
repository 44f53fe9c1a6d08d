//! Experiment domain entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::validation::{
    validate_experiment_id, validate_experiment_name, validate_flow_ref,
    ExperimentValidationError,
};
use crate::domain::evaluation::SuccessMetric;

// ============================================================================
// ExperimentId
// ============================================================================

/// Unique identifier for an experiment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExperimentId(String);

impl ExperimentId {
    /// Create an experiment ID from an existing value with validation
    pub fn new(id: impl Into<String>) -> Result<Self, ExperimentValidationError> {
        let id = id.into();
        validate_experiment_id(&id)?;
        Ok(Self(id))
    }

    /// Allocate a fresh, globally unique ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExperimentId {
    type Error = ExperimentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExperimentId> for String {
    fn from(id: ExperimentId) -> Self {
        id.0
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ExperimentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Variant
// ============================================================================

/// One of the two competing pipeline configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variant {
    A,
    B,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::A, Variant::B];

    pub fn as_char(&self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// ============================================================================
// ExperimentStatus
// ============================================================================

/// Status of an experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Accepting traffic and samples
    #[default]
    Running,
    /// Temporarily halted by an operator
    Paused,
    /// Terminal; no further writes
    Completed,
}

impl ExperimentStatus {
    /// Whether assignments, samples and feedback may still be written
    pub fn accepts_writes(&self) -> bool {
        !matches!(self, Self::Completed)
    }

    /// Check if a transition to the target status is valid
    pub fn can_transition_to(&self, target: ExperimentStatus) -> bool {
        matches!(
            (self, target),
            (Self::Running, Self::Paused)
                | (Self::Paused, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Paused, Self::Completed)
        )
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

// ============================================================================
// ExperimentConfig
// ============================================================================

fn default_traffic_split() -> f64 {
    0.5
}

fn default_minimum_sample_size() -> u32 {
    100
}

fn default_max_duration_days() -> u32 {
    30
}

/// Tunable parameters of an A/B experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Probability that a new session is routed to variant B
    #[serde(default = "default_traffic_split")]
    pub traffic_split: f64,
    /// Metric the verdict is computed on
    #[serde(default)]
    pub success_metric: SuccessMetric,
    #[serde(default = "default_minimum_sample_size")]
    pub minimum_sample_size: u32,
    #[serde(default = "default_max_duration_days")]
    pub max_duration_days: u32,
    /// Overrides the comparator's tie tolerance for this experiment's metric scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tie_tolerance: Option<f64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            traffic_split: default_traffic_split(),
            success_metric: SuccessMetric::default(),
            minimum_sample_size: default_minimum_sample_size(),
            max_duration_days: default_max_duration_days(),
            tie_tolerance: None,
        }
    }
}

impl ExperimentConfig {
    pub fn with_traffic_split(mut self, traffic_split: f64) -> Self {
        self.traffic_split = traffic_split;
        self
    }

    pub fn with_success_metric(mut self, metric: impl Into<SuccessMetric>) -> Self {
        self.success_metric = metric.into();
        self
    }

    pub fn with_minimum_sample_size(mut self, size: u32) -> Self {
        self.minimum_sample_size = size;
        self
    }

    pub fn with_max_duration_days(mut self, days: u32) -> Self {
        self.max_duration_days = days;
        self
    }

    pub fn with_tie_tolerance(mut self, tolerance: f64) -> Self {
        self.tie_tolerance = Some(tolerance);
        self
    }

    pub fn validate(&self) -> Result<(), ExperimentValidationError> {
        if !(0.0..=1.0).contains(&self.traffic_split) {
            return Err(ExperimentValidationError::InvalidTrafficSplit(
                self.traffic_split,
            ));
        }

        if self.minimum_sample_size == 0 {
            return Err(ExperimentValidationError::InvalidMinimumSampleSize);
        }

        if self.max_duration_days == 0 {
            return Err(ExperimentValidationError::InvalidMaxDuration);
        }

        if self.success_metric.is_empty() {
            return Err(ExperimentValidationError::EmptySuccessMetric);
        }

        if let Some(tolerance) = self.tie_tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(ExperimentValidationError::InvalidTieTolerance(tolerance));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Experiment
// ============================================================================

/// An A/B test between two flow configurations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    id: ExperimentId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    flow_a_id: String,
    flow_b_id: String,
    config: ExperimentConfig,
    status: ExperimentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl Experiment {
    /// Create a validated experiment in Running status
    pub fn new(
        id: ExperimentId,
        name: impl Into<String>,
        flow_a_id: impl Into<String>,
        flow_b_id: impl Into<String>,
        config: ExperimentConfig,
    ) -> Result<Self, ExperimentValidationError> {
        let name = name.into();
        let flow_a_id = flow_a_id.into();
        let flow_b_id = flow_b_id.into();

        validate_experiment_name(&name)?;
        validate_flow_ref('A', &flow_a_id)?;
        validate_flow_ref('B', &flow_b_id)?;
        config.validate()?;

        let now = Utc::now();

        Ok(Self {
            id,
            name,
            description: None,
            flow_a_id,
            flow_b_id,
            config,
            status: ExperimentStatus::Running,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    // Getters

    pub fn id(&self) -> &ExperimentId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Flow configuration reference for a variant
    pub fn flow_id(&self, variant: Variant) -> &str {
        match variant {
            Variant::A => &self.flow_a_id,
            Variant::B => &self.flow_b_id,
        }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn status(&self) -> ExperimentStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Days elapsed since creation, up to completion if completed
    pub fn elapsed_days(&self, now: DateTime<Utc>) -> f64 {
        let end = self.completed_at.unwrap_or(now);
        (end - self.created_at).num_seconds().max(0) as f64 / 86_400.0
    }

    // Status transitions

    /// Pause the experiment (Running -> Paused)
    pub fn pause(&mut self) -> Result<(), ExperimentValidationError> {
        self.transition_to(ExperimentStatus::Paused)
    }

    /// Resume the experiment (Paused -> Running)
    pub fn resume(&mut self) -> Result<(), ExperimentValidationError> {
        self.transition_to(ExperimentStatus::Running)
    }

    /// Complete the experiment (Running/Paused -> Completed)
    pub fn complete(&mut self) -> Result<(), ExperimentValidationError> {
        self.transition_to(ExperimentStatus::Completed)?;
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    fn transition_to(&mut self, target: ExperimentStatus) -> Result<(), ExperimentValidationError> {
        if !self.status.can_transition_to(target) {
            return Err(ExperimentValidationError::InvalidStatusTransition(
                self.status.to_string(),
                target.to_string(),
            ));
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}
