//! Experiment registry
//!
//! Owns experiment identity, configuration and lifecycle status, and routes
//! sessions to variants with sticky assignment.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::experiment::{
    AssignmentStore, Experiment, ExperimentConfig, ExperimentId, ExperimentQuery,
    ExperimentRepository, ExperimentValidationError, Variant,
};
use crate::domain::DomainError;
use crate::infrastructure::experiment::ConsistentHasher;
use crate::infrastructure::timeout::bounded;

/// Default bound on each store call
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(1);

/// Attempts at a status change before giving up on a contended experiment
const MAX_TRANSITION_ATTEMPTS: usize = 3;

// ============================================================================
// Request Types
// ============================================================================

/// Request to create a new experiment
#[derive(Debug, Clone)]
pub struct CreateExperimentRequest {
    pub name: String,
    pub description: Option<String>,
    /// Reference to the pipeline configuration served as variant A
    pub flow_a_id: String,
    /// Reference to the pipeline configuration served as variant B
    pub flow_b_id: String,
    pub config: ExperimentConfig,
}

impl CreateExperimentRequest {
    pub fn new(
        name: impl Into<String>,
        flow_a_id: impl Into<String>,
        flow_b_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            flow_a_id: flow_a_id.into(),
            flow_b_id: flow_b_id.into(),
            config: ExperimentConfig::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_config(mut self, config: ExperimentConfig) -> Self {
        self.config = config;
        self
    }
}

// ============================================================================
// Experiment Registry
// ============================================================================

/// Registry of experiments and their sticky assignments.
///
/// Writes against an open experiment hold the shared side of `lifecycle` from
/// the status check until the store call returns; status changes take the
/// exclusive side. A write therefore never lands after a completion it raced.
#[derive(Debug, Clone)]
pub struct ExperimentRegistry {
    experiments: Arc<dyn ExperimentRepository>,
    assignments: Arc<dyn AssignmentStore>,
    storage_timeout: Duration,
    lifecycle: Arc<RwLock<()>>,
}

impl ExperimentRegistry {
    pub fn new(
        experiments: Arc<dyn ExperimentRepository>,
        assignments: Arc<dyn AssignmentStore>,
    ) -> Self {
        Self {
            experiments,
            assignments,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
            lifecycle: Arc::new(RwLock::new(())),
        }
    }

    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    pub fn storage_timeout(&self) -> Duration {
        self.storage_timeout
    }

    /// Create a running experiment under a freshly generated id.
    ///
    /// Configuration is validated before anything is stored.
    pub async fn create(&self, request: CreateExperimentRequest) -> Result<Experiment, DomainError> {
        let id = ExperimentId::generate();
        debug!(experiment_id = %id, name = %request.name, "Creating experiment");

        let mut experiment = Experiment::new(
            id,
            request.name,
            request.flow_a_id,
            request.flow_b_id,
            request.config,
        )?;

        if let Some(description) = request.description {
            experiment = experiment.with_description(description);
        }

        let created = bounded(
            "experiment_store.save",
            self.storage_timeout,
            self.experiments.save(experiment),
        )
        .await?;

        info!(
            experiment_id = %created.id(),
            traffic_split = created.config().traffic_split,
            success_metric = %created.config().success_metric,
            "Experiment created"
        );

        Ok(created)
    }

    /// Load an experiment, failing when the id is unknown
    pub async fn load(&self, id: &ExperimentId) -> Result<Experiment, DomainError> {
        bounded(
            "experiment_store.load",
            self.storage_timeout,
            self.experiments.load(id),
        )
        .await?
        .ok_or_else(|| DomainError::experiment_not_found(id.as_str()))
    }

    /// List experiments matching a query
    pub async fn list(&self, query: &ExperimentQuery) -> Result<Vec<Experiment>, DomainError> {
        bounded(
            "experiment_store.list",
            self.storage_timeout,
            self.experiments.list(query),
        )
        .await
    }

    /// Load an experiment that still accepts writes
    pub async fn require_open(&self, id: &ExperimentId) -> Result<Experiment, DomainError> {
        let experiment = self.load(id).await?;

        if !experiment.status().accepts_writes() {
            return Err(DomainError::experiment_closed(id.as_str()));
        }

        Ok(experiment)
    }

    /// Run `write` against an experiment that accepts writes.
    ///
    /// No status change can commit between the open check and the end of
    /// `write`. `write` must not call back into the lifecycle operations.
    pub async fn write_open<T, F, Fut>(&self, id: &ExperimentId, write: F) -> Result<T, DomainError>
    where
        F: FnOnce(Experiment) -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let _gate = self.lifecycle.read().await;
        let experiment = self.require_open(id).await?;
        write(experiment).await
    }

    /// Route a session to a variant. Once assigned, a session keeps its variant.
    pub async fn assign_variant(
        &self,
        id: &ExperimentId,
        session_key: &str,
    ) -> Result<Variant, DomainError> {
        if session_key.trim().is_empty() {
            return Err(DomainError::validation("Session key cannot be empty"));
        }

        let variant = self
            .write_open(id, |experiment| async move {
                let candidate = ConsistentHasher::assign(
                    id.as_str(),
                    session_key,
                    experiment.config().traffic_split,
                );

                bounded(
                    "assignment_store.get_or_insert",
                    self.storage_timeout,
                    self.assignments.get_or_insert(id, session_key, candidate),
                )
                .await
            })
            .await?;

        debug!(
            experiment_id = %id,
            session_key,
            variant = %variant,
            "Variant assigned"
        );

        Ok(variant)
    }

    /// Existing assignment for a session, if any
    pub async fn assignment(
        &self,
        id: &ExperimentId,
        session_key: &str,
    ) -> Result<Option<Variant>, DomainError> {
        bounded(
            "assignment_store.get",
            self.storage_timeout,
            self.assignments.get(id, session_key),
        )
        .await
    }

    /// Sessions routed to each variant so far, as (A, B)
    pub async fn assignment_counts(&self, id: &ExperimentId) -> Result<(usize, usize), DomainError> {
        tokio::try_join!(
            bounded(
                "assignment_store.count",
                self.storage_timeout,
                self.assignments.count(id, Variant::A),
            ),
            bounded(
                "assignment_store.count",
                self.storage_timeout,
                self.assignments.count(id, Variant::B),
            ),
        )
    }

    // ========================================================================
    // Lifecycle Operations
    // ========================================================================

    /// Pause an experiment (Running -> Paused)
    pub async fn pause(&self, id: &ExperimentId) -> Result<Experiment, DomainError> {
        let updated = self.transition(id, Experiment::pause).await?;
        info!(experiment_id = %id, "Experiment paused");

        Ok(updated)
    }

    /// Resume an experiment (Paused -> Running)
    pub async fn resume(&self, id: &ExperimentId) -> Result<Experiment, DomainError> {
        let updated = self.transition(id, Experiment::resume).await?;
        info!(experiment_id = %id, "Experiment resumed");

        Ok(updated)
    }

    /// Complete an experiment (Running/Paused -> Completed). Terminal.
    pub async fn complete(&self, id: &ExperimentId) -> Result<Experiment, DomainError> {
        let updated = self.transition(id, Experiment::complete).await?;
        info!(experiment_id = %id, "Experiment completed");

        Ok(updated)
    }

    /// Apply a status change and store it only if nobody changed the status
    /// since it was loaded. A lost race re-validates against the fresh status.
    async fn transition(
        &self,
        id: &ExperimentId,
        apply: fn(&mut Experiment) -> Result<(), ExperimentValidationError>,
    ) -> Result<Experiment, DomainError> {
        let _gate = self.lifecycle.write().await;

        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let mut experiment = self.load(id).await?;
            let expected = experiment.status();
            apply(&mut experiment)?;

            let saved = bounded(
                "experiment_store.compare_and_save",
                self.storage_timeout,
                self.experiments.compare_and_save(experiment, expected),
            )
            .await?;

            if let Some(updated) = saved {
                return Ok(updated);
            }

            warn!(experiment_id = %id, attempt, "Experiment status changed concurrently");
        }

        Err(DomainError::invalid_transition(format!(
            "Experiment '{}' changed status during the update",
            id
        )))
    }
}
