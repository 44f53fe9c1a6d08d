//! Evaluation domain module
//!
//! Per-response quality and performance metrics, cost pricing, and the
//! per-variant sample store they are appended to.

mod input;
mod metrics;
mod pricing;
mod repository;
mod sample;

pub use input::EvaluationInput;
pub use metrics::{
    validate_custom_metrics, validate_latency, BusinessMetrics, EvaluationMetrics,
    MetricsValidationError, SuccessMetric, TokenUsage, MAX_SATISFACTION, MIN_SATISFACTION,
};
pub use pricing::{TokenPricing, DEFAULT_COMPLETION_TOKEN_RATE, DEFAULT_PROMPT_TOKEN_RATE};
pub use repository::SampleRepository;
pub use sample::{EvaluationSample, SampleId};
