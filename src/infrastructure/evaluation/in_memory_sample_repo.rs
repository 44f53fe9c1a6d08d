//! In-memory implementation of the sample store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::evaluation::{EvaluationSample, SampleRepository};
use crate::domain::experiment::{ExperimentId, Variant};
use crate::domain::DomainError;

/// In-memory sample store, one append-ordered list per experiment variant
#[derive(Debug, Default)]
pub struct InMemorySampleRepository {
    samples: RwLock<HashMap<(ExperimentId, Variant), Vec<EvaluationSample>>>,
}

impl InMemorySampleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SampleRepository for InMemorySampleRepository {
    async fn append(&self, sample: EvaluationSample) -> Result<(), DomainError> {
        let mut samples = self
            .samples
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        samples
            .entry((sample.experiment_id.clone(), sample.variant))
            .or_default()
            .push(sample);

        Ok(())
    }

    async fn list(
        &self,
        experiment_id: &ExperimentId,
        variant: Variant,
    ) -> Result<Vec<EvaluationSample>, DomainError> {
        let samples = self
            .samples
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(samples
            .get(&(experiment_id.clone(), variant))
            .cloned()
            .unwrap_or_default())
    }

    async fn count(
        &self,
        experiment_id: &ExperimentId,
        variant: Variant,
    ) -> Result<usize, DomainError> {
        let samples = self
            .samples
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(samples
            .get(&(experiment_id.clone(), variant))
            .map_or(0, Vec::len))
    }
}
