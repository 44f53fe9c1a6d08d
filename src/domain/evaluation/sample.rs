//! Evaluation samples appended per experiment variant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::metrics::EvaluationMetrics;
use crate::domain::experiment::{ExperimentId, Variant};

/// Unique identifier for an evaluation sample
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleId(String);

impl SampleId {
    pub fn generate() -> Self {
        Self(format!("sample-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One evaluated response attributed to a variant of an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSample {
    pub id: SampleId,
    pub experiment_id: ExperimentId,
    pub variant: Variant,
    /// Caller's identifier for the evaluated response, used to correlate feedback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    pub metrics: EvaluationMetrics,
    pub recorded_at: DateTime<Utc>,
}

impl EvaluationSample {
    pub fn new(experiment_id: ExperimentId, variant: Variant, metrics: EvaluationMetrics) -> Self {
        Self {
            id: SampleId::generate(),
            experiment_id,
            variant,
            response_id: None,
            metrics,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_response_id(mut self, response_id: impl Into<String>) -> Self {
        self.response_id = Some(response_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluation::TokenUsage;

    #[test]
    fn test_sample_creation() {
        let experiment_id = ExperimentId::generate();
        let metrics = EvaluationMetrics::new(50.0, TokenUsage::new(5, 5), 0.0, 0.5, 0.5);

        let sample = EvaluationSample::new(experiment_id.clone(), Variant::B, metrics)
            .with_response_id("resp-1");

        assert!(sample.id.as_str().starts_with("sample-"));
        assert_eq!(sample.experiment_id, experiment_id);
        assert_eq!(sample.variant, Variant::B);
        assert_eq!(sample.response_id.as_deref(), Some("resp-1"));
    }

    #[test]
    fn test_sample_ids_are_unique() {
        assert_ne!(SampleId::generate(), SampleId::generate());
    }
}
