//! Feedback collector
//!
//! Appends human ratings of generated responses. Feedback is stored as-is and
//! never folded into the statistical verdict.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::experiment::ExperimentId;
use crate::domain::feedback::{
    FeedbackRecord, FeedbackRepository, FeedbackValidationError, HumanFeedback,
};
use crate::domain::DomainError;
use crate::infrastructure::timeout::bounded;

use super::experiment_registry::ExperimentRegistry;

/// Validates and stores human feedback against an experiment
#[derive(Debug, Clone)]
pub struct FeedbackCollector {
    registry: ExperimentRegistry,
    feedback: Arc<dyn FeedbackRepository>,
}

impl FeedbackCollector {
    pub fn new(registry: ExperimentRegistry, feedback: Arc<dyn FeedbackRepository>) -> Self {
        Self { registry, feedback }
    }

    /// Record feedback for a response of an open experiment.
    ///
    /// Ratings are validated before the experiment is looked up.
    pub async fn record(
        &self,
        experiment_id: &ExperimentId,
        response_id: &str,
        feedback: HumanFeedback,
    ) -> Result<FeedbackRecord, DomainError> {
        debug!(experiment_id = %experiment_id, response_id, "Recording feedback");

        if feedback.response_id != response_id {
            return Err(FeedbackValidationError::ResponseIdMismatch {
                feedback: feedback.response_id.clone(),
                submitted: response_id.to_string(),
            }
            .into());
        }
        feedback.validate()?;

        let record = FeedbackRecord::new(experiment_id.clone(), feedback);
        self.registry
            .write_open(experiment_id, |_| {
                bounded(
                    "feedback_store.append",
                    self.registry.storage_timeout(),
                    self.feedback.append(record.clone()),
                )
            })
            .await?;

        info!(
            experiment_id = %experiment_id,
            feedback_id = %record.id,
            response_id,
            overall_rating = record.feedback.overall_rating,
            "Feedback recorded"
        );

        Ok(record)
    }

    /// All feedback for an experiment in submission order
    pub async fn list(
        &self,
        experiment_id: &ExperimentId,
    ) -> Result<Vec<FeedbackRecord>, DomainError> {
        self.registry.load(experiment_id).await?;

        bounded(
            "feedback_store.list",
            self.registry.storage_timeout(),
            self.feedback.list(experiment_id),
        )
        .await
    }

    /// Feedback for a single response
    pub async fn list_for_response(
        &self,
        experiment_id: &ExperimentId,
        response_id: &str,
    ) -> Result<Vec<FeedbackRecord>, DomainError> {
        self.registry.load(experiment_id).await?;

        bounded(
            "feedback_store.list_for_response",
            self.registry.storage_timeout(),
            self.feedback.list_for_response(experiment_id, response_id),
        )
        .await
    }
}
