//! Flow Eval
//!
//! A/B evaluation core for comparing two pipeline configurations:
//! - Per-response quality and performance metrics (embedding coherence,
//!   lexical relevance, factual accuracy, cost)
//! - Experiments with sticky, traffic-split variant assignment
//! - Statistical comparison of variants with a Student's t-test
//! - Append-only human feedback

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use domain::DomainError;
use infrastructure::{
    embedding::create_embedding_provider,
    evaluation::{InMemorySampleRepository, MetricEvaluator},
    experiment::{
        ComparatorConfig, InMemoryAssignmentStore, InMemoryExperimentRepository,
        StatisticalComparator,
    },
    feedback::InMemoryFeedbackRepository,
    services::{EvaluationService, ExperimentRegistry, FeedbackCollector},
};
use tracing::info;

/// Build an evaluation service over in-memory stores from configuration
pub fn create_evaluation_service(config: &AppConfig) -> Result<EvaluationService, DomainError> {
    config.validate()?;

    let provider = create_embedding_provider(&config.embedding)?;
    info!(
        provider = provider.provider_name(),
        model = provider.default_model(),
        "Embedding provider ready"
    );

    let registry = ExperimentRegistry::new(
        Arc::new(InMemoryExperimentRepository::new()),
        Arc::new(InMemoryAssignmentStore::new()),
    )
    .with_storage_timeout(Duration::from_millis(config.storage.timeout_ms));

    let evaluator = MetricEvaluator::new(provider, config.evaluation.pricing())
        .with_timeout(Duration::from_millis(config.embedding.timeout_ms));

    let comparator = StatisticalComparator::new(ComparatorConfig::from(&config.comparison));
    let feedback = FeedbackCollector::new(
        registry.clone(),
        Arc::new(InMemoryFeedbackRepository::new()),
    );

    Ok(EvaluationService::new(
        registry,
        evaluator,
        comparator,
        feedback,
        Arc::new(InMemorySampleRepository::new()),
    ))
}
