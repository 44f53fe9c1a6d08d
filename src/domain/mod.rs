//! Domain layer - Core evaluation entities, value types and store traits

pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod experiment;
pub mod feedback;

pub use embedding::{
    cosine_similarity, Embedding, EmbeddingInput, EmbeddingProvider, EmbeddingRequest,
    EmbeddingResponse, EmbeddingUsage,
};
pub use error::DomainError;
pub use evaluation::{
    BusinessMetrics, EvaluationInput, EvaluationMetrics, EvaluationSample, MetricsValidationError,
    SampleRepository, SuccessMetric, TokenPricing, TokenUsage,
};
pub use experiment::{
    ABTestResult, AssignmentStore, Comparison, Experiment, ExperimentConfig, ExperimentDashboard,
    ExperimentId, ExperimentProgress, ExperimentQuery, ExperimentRepository, ExperimentStatus,
    ExperimentValidationError, MetricComparison, Variant, VariantSummary, Winner,
};
pub use feedback::{
    FeedbackRecord, FeedbackRepository, FeedbackValidationError, HumanFeedback,
};
