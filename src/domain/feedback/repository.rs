//! Feedback repository trait

use async_trait::async_trait;

use super::FeedbackRecord;
use crate::domain::error::DomainError;
use crate::domain::experiment::ExperimentId;

#[cfg(test)]
use mockall::automock;

/// Append-only store of human feedback
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FeedbackRepository: Send + Sync + std::fmt::Debug {
    /// Appends a feedback record
    async fn append(&self, record: FeedbackRecord) -> Result<(), DomainError>;

    /// Lists feedback for an experiment in submission order
    async fn list(&self, experiment_id: &ExperimentId) -> Result<Vec<FeedbackRecord>, DomainError>;

    /// Lists feedback for a single response of an experiment
    async fn list_for_response(
        &self,
        experiment_id: &ExperimentId,
        response_id: &str,
    ) -> Result<Vec<FeedbackRecord>, DomainError> {
        Ok(self
            .list(experiment_id)
            .await?
            .into_iter()
            .filter(|r| r.response_id() == response_id)
            .collect())
    }
}
