//! Sample store trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::sample::EvaluationSample;
use crate::domain::experiment::{ExperimentId, Variant};
use crate::domain::DomainError;

/// Append-only store of evaluation samples, partitioned by experiment and variant.
///
/// Readers see a snapshot of whatever samples were appended before the read;
/// concurrent appends during a read are tolerated.
#[async_trait]
pub trait SampleRepository: Send + Sync + Debug {
    /// Append a sample to its experiment/variant partition
    async fn append(&self, sample: EvaluationSample) -> Result<(), DomainError>;

    /// List the samples of one variant in append order
    async fn list(
        &self,
        experiment_id: &ExperimentId,
        variant: Variant,
    ) -> Result<Vec<EvaluationSample>, DomainError>;

    /// Number of samples recorded for one variant
    async fn count(
        &self,
        experiment_id: &ExperimentId,
        variant: Variant,
    ) -> Result<usize, DomainError> {
        Ok(self.list(experiment_id, variant).await?.len())
    }
}
