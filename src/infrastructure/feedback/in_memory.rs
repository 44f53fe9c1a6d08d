//! In-memory feedback store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::experiment::ExperimentId;
use crate::domain::feedback::{FeedbackRecord, FeedbackRepository};
use crate::domain::DomainError;

/// Feedback store keeping each experiment's records in submission order
#[derive(Debug, Default)]
pub struct InMemoryFeedbackRepository {
    records: RwLock<HashMap<ExperimentId, Vec<FeedbackRecord>>>,
}

impl InMemoryFeedbackRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn append(&self, record: FeedbackRecord) -> Result<(), DomainError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        records
            .entry(record.experiment_id.clone())
            .or_default()
            .push(record);

        Ok(())
    }

    async fn list(&self, experiment_id: &ExperimentId) -> Result<Vec<FeedbackRecord>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(records.get(experiment_id).cloned().unwrap_or_default())
    }

    async fn list_for_response(
        &self,
        experiment_id: &ExperimentId,
        response_id: &str,
    ) -> Result<Vec<FeedbackRecord>, DomainError> {
        let records = self
            .records
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(records
            .get(experiment_id)
            .map(|list| {
                list.iter()
                    .filter(|r| r.response_id() == response_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feedback::HumanFeedback;

    fn record(experiment_id: &ExperimentId, response_id: &str, overall: f64) -> FeedbackRecord {
        FeedbackRecord::new(
            experiment_id.clone(),
            HumanFeedback::new(response_id, 4.0, 4.0, 4.0, overall),
        )
    }

    #[tokio::test]
    async fn test_append_and_list_in_order() {
        let repo = InMemoryFeedbackRepository::new();
        let id = ExperimentId::generate();

        repo.append(record(&id, "resp-1", 3.0)).await.unwrap();
        repo.append(record(&id, "resp-2", 5.0)).await.unwrap();

        let listed = repo.list(&id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].response_id(), "resp-1");
        assert_eq!(listed[1].feedback.overall_rating, 5.0);
    }

    #[tokio::test]
    async fn test_list_for_response() {
        let repo = InMemoryFeedbackRepository::new();
        let id = ExperimentId::generate();

        repo.append(record(&id, "resp-1", 3.0)).await.unwrap();
        repo.append(record(&id, "resp-2", 5.0)).await.unwrap();
        repo.append(record(&id, "resp-1", 4.0)).await.unwrap();

        let listed = repo.list_for_response(&id, "resp-1").await.unwrap();
        let ratings: Vec<f64> = listed.iter().map(|r| r.feedback.overall_rating).collect();
        assert_eq!(ratings, vec![3.0, 4.0]);
    }

    #[tokio::test]
    async fn test_experiments_are_isolated() {
        let repo = InMemoryFeedbackRepository::new();
        let first = ExperimentId::generate();
        let second = ExperimentId::generate();

        repo.append(record(&first, "resp-1", 3.0)).await.unwrap();

        assert!(repo.list(&second).await.unwrap().is_empty());
        assert!(repo.list_for_response(&second, "resp-1").await.unwrap().is_empty());
    }
}
