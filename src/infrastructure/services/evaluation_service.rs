//! Evaluation service
//!
//! The operations exposed to an API layer: experiment creation and routing,
//! evaluation submission, on-demand results and feedback. Every collaborator is
//! injected; nothing here holds process-wide state.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::domain::evaluation::{
    validate_custom_metrics, validate_latency, BusinessMetrics, EvaluationInput,
    EvaluationSample, SampleRepository, SuccessMetric,
};
use crate::domain::experiment::{
    ABTestResult, Experiment, ExperimentDashboard, ExperimentId, ExperimentProgress,
    ExperimentQuery, MetricComparison, Variant, VariantSummary,
};
use crate::domain::feedback::{FeedbackRecord, HumanFeedback};
use crate::domain::DomainError;
use crate::infrastructure::evaluation::MetricEvaluator;
use crate::infrastructure::experiment::{mean, StatisticalComparator};
use crate::infrastructure::timeout::bounded;

use super::experiment_registry::{CreateExperimentRequest, ExperimentRegistry};
use super::feedback_collector::FeedbackCollector;

/// Metrics shown on the experiment dashboard, in display order
pub const DASHBOARD_METRICS: [SuccessMetric; 5] = [
    SuccessMetric::CoherenceScore,
    SuccessMetric::RelevanceScore,
    SuccessMetric::UserSatisfaction,
    SuccessMetric::LatencyMs,
    SuccessMetric::Cost,
];

// ============================================================================
// Request Types
// ============================================================================

/// One evaluated response submitted for a variant
#[derive(Debug, Clone)]
pub struct EvaluationSubmission {
    pub input: EvaluationInput,
    /// Caller's identifier for the response, used to correlate feedback
    pub response_id: Option<String>,
    pub business: BusinessMetrics,
    pub custom_metrics: BTreeMap<String, f64>,
}

impl EvaluationSubmission {
    pub fn new(input: EvaluationInput) -> Self {
        Self {
            input,
            response_id: None,
            business: BusinessMetrics::default(),
            custom_metrics: BTreeMap::new(),
        }
    }

    pub fn with_response_id(mut self, response_id: impl Into<String>) -> Self {
        self.response_id = Some(response_id.into());
        self
    }

    pub fn with_business(mut self, business: BusinessMetrics) -> Self {
        self.business = business;
        self
    }

    pub fn with_custom_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.custom_metrics.insert(name.into(), value);
        self
    }

    fn validate(&self) -> Result<(), DomainError> {
        validate_latency(self.input.execution_time_ms)?;
        self.business.validate()?;
        validate_custom_metrics(&self.custom_metrics)?;

        if let Some(ref response_id) = self.response_id {
            if response_id.trim().is_empty() {
                return Err(DomainError::validation("Response ID cannot be empty"));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Evaluation Service
// ============================================================================

/// Facade over the registry, evaluator, comparator, feedback collector and sample store
#[derive(Debug, Clone)]
pub struct EvaluationService {
    registry: ExperimentRegistry,
    evaluator: MetricEvaluator,
    comparator: StatisticalComparator,
    feedback: FeedbackCollector,
    samples: Arc<dyn SampleRepository>,
}

impl EvaluationService {
    pub fn new(
        registry: ExperimentRegistry,
        evaluator: MetricEvaluator,
        comparator: StatisticalComparator,
        feedback: FeedbackCollector,
        samples: Arc<dyn SampleRepository>,
    ) -> Self {
        Self {
            registry,
            evaluator,
            comparator,
            feedback,
            samples,
        }
    }

    pub fn registry(&self) -> &ExperimentRegistry {
        &self.registry
    }

    pub fn evaluator(&self) -> &MetricEvaluator {
        &self.evaluator
    }

    pub fn comparator(&self) -> &StatisticalComparator {
        &self.comparator
    }

    // ========================================================================
    // Experiments
    // ========================================================================

    pub async fn create_experiment(
        &self,
        request: CreateExperimentRequest,
    ) -> Result<Experiment, DomainError> {
        self.registry.create(request).await
    }

    pub async fn get_experiment(&self, id: &ExperimentId) -> Result<Experiment, DomainError> {
        self.registry.load(id).await
    }

    pub async fn list_experiments(
        &self,
        query: &ExperimentQuery,
    ) -> Result<Vec<Experiment>, DomainError> {
        self.registry.list(query).await
    }

    pub async fn assign_variant(
        &self,
        id: &ExperimentId,
        session_key: &str,
    ) -> Result<Variant, DomainError> {
        self.registry.assign_variant(id, session_key).await
    }

    pub async fn pause_experiment(&self, id: &ExperimentId) -> Result<Experiment, DomainError> {
        self.registry.pause(id).await
    }

    pub async fn resume_experiment(&self, id: &ExperimentId) -> Result<Experiment, DomainError> {
        self.registry.resume(id).await
    }

    pub async fn complete_experiment(
        &self,
        id: &ExperimentId,
    ) -> Result<Experiment, DomainError> {
        self.registry.complete(id).await
    }

    // ========================================================================
    // Evaluations
    // ========================================================================

    /// Evaluate a response and append it to the variant's samples.
    ///
    /// Caller-supplied values are validated first. Embedding trouble never fails
    /// the call; it only degrades the affected scores to neutral. The experiment
    /// is checked again when the sample is stored, so a completion issued while
    /// the embeddings were computed rejects the sample.
    pub async fn submit_evaluation(
        &self,
        id: &ExperimentId,
        variant: Variant,
        submission: EvaluationSubmission,
    ) -> Result<EvaluationSample, DomainError> {
        submission.validate()?;
        self.registry.require_open(id).await?;

        let metrics = self
            .evaluator
            .evaluate(&submission.input)
            .await
            .with_business(submission.business)
            .with_custom_metrics(submission.custom_metrics);

        let mut sample = EvaluationSample::new(id.clone(), variant, metrics);
        if let Some(response_id) = submission.response_id {
            sample = sample.with_response_id(response_id);
        }

        self.registry
            .write_open(id, |_| {
                bounded(
                    "sample_store.append",
                    self.registry.storage_timeout(),
                    self.samples.append(sample.clone()),
                )
            })
            .await?;

        debug!(
            experiment_id = %id,
            variant = %variant,
            sample_id = %sample.id,
            coherence = sample.metrics.coherence_score(),
            relevance = sample.metrics.relevance_score(),
            "Evaluation sample recorded"
        );

        Ok(sample)
    }

    /// Recompute the verdict from the samples visible now
    pub async fn get_results(&self, id: &ExperimentId) -> Result<ABTestResult, DomainError> {
        let experiment = self.registry.load(id).await?;
        let (samples_a, samples_b) = self.load_samples(id).await?;

        let metric = experiment.config().success_metric.clone();
        let comparison = self.comparator.compare_with_tolerance(
            &metric_values(&samples_a, &metric),
            &metric_values(&samples_b, &metric),
            self.tie_tolerance(&experiment),
        );

        let result = ABTestResult::new(
            id.clone(),
            metric,
            VariantSummary::from_samples(Variant::A, samples_a.iter().map(|s| &s.metrics)),
            VariantSummary::from_samples(Variant::B, samples_b.iter().map(|s| &s.metrics)),
            comparison,
            self.comparator.config().significance_level,
        );

        info!(
            experiment_id = %id,
            success_metric = %result.success_metric,
            sample_size = result.sample_size,
            significance = result.significance,
            winner = %result.winner,
            improvement = ?result.improvement_percentage,
            "Experiment results computed"
        );

        Ok(result)
    }

    /// Counters for deciding externally when to complete the experiment
    pub async fn progress(&self, id: &ExperimentId) -> Result<ExperimentProgress, DomainError> {
        let experiment = self.registry.load(id).await?;
        let timeout = self.registry.storage_timeout();

        let (samples_a, samples_b) = tokio::try_join!(
            bounded("sample_store.count", timeout, self.samples.count(id, Variant::A)),
            bounded("sample_store.count", timeout, self.samples.count(id, Variant::B)),
        )?;
        let assignments = self.registry.assignment_counts(id).await?;

        Ok(build_progress(&experiment, (samples_a, samples_b), assignments))
    }

    /// Per-metric comparison table for an experiment
    pub async fn dashboard(&self, id: &ExperimentId) -> Result<ExperimentDashboard, DomainError> {
        let experiment = self.registry.load(id).await?;
        let (samples_a, samples_b) = self.load_samples(id).await?;
        let assignments = self.registry.assignment_counts(id).await?;

        let success_metric = &experiment.config().success_metric;
        let mut rows: Vec<SuccessMetric> = DASHBOARD_METRICS.to_vec();
        if !rows.contains(success_metric) {
            rows.insert(0, success_metric.clone());
        }

        let metrics = rows
            .into_iter()
            .map(|metric| {
                let values_a = metric_values(&samples_a, &metric);
                let values_b = metric_values(&samples_b, &metric);
                let tolerance = if &metric == success_metric {
                    self.tie_tolerance(&experiment)
                } else {
                    self.comparator.config().tie_tolerance
                };

                MetricComparison {
                    comparison: self
                        .comparator
                        .compare_with_tolerance(&values_a, &values_b, tolerance),
                    mean_a: optional_mean(&values_a),
                    mean_b: optional_mean(&values_b),
                    metric,
                }
            })
            .collect();

        Ok(ExperimentDashboard {
            experiment_id: id.clone(),
            name: experiment.name().to_string(),
            progress: build_progress(
                &experiment,
                (samples_a.len(), samples_b.len()),
                assignments,
            ),
            metrics,
            computed_at: Utc::now(),
        })
    }

    // ========================================================================
    // Feedback
    // ========================================================================

    pub async fn submit_feedback(
        &self,
        id: &ExperimentId,
        response_id: &str,
        feedback: HumanFeedback,
    ) -> Result<FeedbackRecord, DomainError> {
        self.feedback.record(id, response_id, feedback).await
    }

    pub async fn list_feedback(
        &self,
        id: &ExperimentId,
    ) -> Result<Vec<FeedbackRecord>, DomainError> {
        self.feedback.list(id).await
    }

    pub async fn list_feedback_for_response(
        &self,
        id: &ExperimentId,
        response_id: &str,
    ) -> Result<Vec<FeedbackRecord>, DomainError> {
        self.feedback.list_for_response(id, response_id).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load_samples(
        &self,
        id: &ExperimentId,
    ) -> Result<(Vec<EvaluationSample>, Vec<EvaluationSample>), DomainError> {
        let timeout = self.registry.storage_timeout();

        tokio::try_join!(
            bounded("sample_store.list", timeout, self.samples.list(id, Variant::A)),
            bounded("sample_store.list", timeout, self.samples.list(id, Variant::B)),
        )
    }

    fn tie_tolerance(&self, experiment: &Experiment) -> f64 {
        experiment
            .config()
            .tie_tolerance
            .unwrap_or(self.comparator.config().tie_tolerance)
    }
}

/// Values of `metric` across samples, skipping samples that lack it
fn metric_values(samples: &[EvaluationSample], metric: &SuccessMetric) -> Vec<f64> {
    samples
        .iter()
        .filter_map(|s| s.metrics.value_of(metric))
        .collect()
}

fn optional_mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| mean(values))
}

/// `samples` and `assignments` are (A, B) pairs
fn build_progress(
    experiment: &Experiment,
    samples: (usize, usize),
    assignments: (usize, usize),
) -> ExperimentProgress {
    ExperimentProgress {
        experiment_id: experiment.id().clone(),
        status: experiment.status(),
        samples_a: samples.0,
        samples_b: samples.1,
        assignments_a: assignments.0,
        assignments_b: assignments.1,
        minimum_sample_size: experiment.config().minimum_sample_size,
        elapsed_days: experiment.elapsed_days(Utc::now()),
        max_duration_days: experiment.config().max_duration_days,
    }
}
