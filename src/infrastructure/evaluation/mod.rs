//! Metric evaluation and sample storage

mod evaluator;
mod in_memory_sample_repo;

pub use evaluator::{relevance_score, MetricEvaluator, DEFAULT_EMBEDDING_TIMEOUT, NEUTRAL_SCORE};
pub use in_memory_sample_repo::InMemorySampleRepository;
