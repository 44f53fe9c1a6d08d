//! Experiment and assignment store traits

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{Experiment, ExperimentId, ExperimentStatus, Variant};
use crate::domain::DomainError;

// ============================================================================
// ExperimentQuery
// ============================================================================

/// Query parameters for listing experiments
#[derive(Debug, Clone, Default)]
pub struct ExperimentQuery {
    /// Filter by status
    pub status: Option<ExperimentStatus>,
    /// Maximum number of results
    pub limit: Option<usize>,
    /// Number of results to skip
    pub offset: Option<usize>,
}

impl ExperimentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: ExperimentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

// ============================================================================
// ExperimentRepository
// ============================================================================

/// Repository trait for experiments, keyed by ID
#[async_trait]
pub trait ExperimentRepository: Send + Sync + Debug {
    /// Insert or replace an experiment
    async fn save(&self, experiment: Experiment) -> Result<Experiment, DomainError>;

    /// Get an experiment by ID
    async fn load(&self, id: &ExperimentId) -> Result<Option<Experiment>, DomainError>;

    /// List experiments, newest first
    async fn list(&self, query: &ExperimentQuery) -> Result<Vec<Experiment>, DomainError>;

    /// Replace the stored experiment only while its status is still `expected`.
    ///
    /// Returns `None` when another writer changed the status first, and
    /// `ExperimentNotFound` when nothing is stored under the id.
    async fn compare_and_save(
        &self,
        experiment: Experiment,
        expected: ExperimentStatus,
    ) -> Result<Option<Experiment>, DomainError>;
}

// ============================================================================
// AssignmentStore
// ============================================================================

/// Sticky session-to-variant mapping per experiment.
///
/// `get_or_insert` is the single serialization point for assignment: for a given
/// (experiment, session) pair, concurrent callers all observe the first value stored.
#[async_trait]
pub trait AssignmentStore: Send + Sync + Debug {
    /// Return the existing assignment, or store `candidate` and return it
    async fn get_or_insert(
        &self,
        experiment_id: &ExperimentId,
        session_key: &str,
        candidate: Variant,
    ) -> Result<Variant, DomainError>;

    /// Look up an existing assignment
    async fn get(
        &self,
        experiment_id: &ExperimentId,
        session_key: &str,
    ) -> Result<Option<Variant>, DomainError>;

    /// Number of sessions assigned to the variant
    async fn count(
        &self,
        experiment_id: &ExperimentId,
        variant: Variant,
    ) -> Result<usize, DomainError>;
}
