//! Infrastructure services

mod evaluation_service;
mod experiment_registry;
mod feedback_collector;

pub use evaluation_service::{EvaluationService, EvaluationSubmission, DASHBOARD_METRICS};
pub use experiment_registry::{
    CreateExperimentRequest, ExperimentRegistry, DEFAULT_STORAGE_TIMEOUT,
};
pub use feedback_collector::FeedbackCollector;
