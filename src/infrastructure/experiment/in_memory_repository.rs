//! In-memory implementation of the experiment repository

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::experiment::{
    Experiment, ExperimentId, ExperimentQuery, ExperimentRepository, ExperimentStatus,
};
use crate::domain::DomainError;

/// In-memory experiment repository implementation
#[derive(Debug, Default)]
pub struct InMemoryExperimentRepository {
    experiments: RwLock<HashMap<ExperimentId, Experiment>>,
}

impl InMemoryExperimentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExperimentRepository for InMemoryExperimentRepository {
    async fn save(&self, experiment: Experiment) -> Result<Experiment, DomainError> {
        let mut experiments = self
            .experiments
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        experiments.insert(experiment.id().clone(), experiment.clone());
        Ok(experiment)
    }

    async fn load(&self, id: &ExperimentId) -> Result<Option<Experiment>, DomainError> {
        let experiments = self
            .experiments
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(experiments.get(id).cloned())
    }

    async fn compare_and_save(
        &self,
        experiment: Experiment,
        expected: ExperimentStatus,
    ) -> Result<Option<Experiment>, DomainError> {
        let mut experiments = self
            .experiments
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let stored = experiments
            .get_mut(experiment.id())
            .ok_or_else(|| DomainError::experiment_not_found(experiment.id().as_str()))?;

        if stored.status() != expected {
            return Ok(None);
        }

        *stored = experiment.clone();
        Ok(Some(experiment))
    }

    async fn list(&self, query: &ExperimentQuery) -> Result<Vec<Experiment>, DomainError> {
        let experiments = self
            .experiments
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut results: Vec<_> = experiments
            .values()
            .filter(|e| query.status.is_none_or(|status| e.status() == status))
            .cloned()
            .collect();

        // Newest first
        results.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(results.into_iter().skip(offset).take(limit).collect())
    }
}
