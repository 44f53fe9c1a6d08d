//! Experiment domain module for A/B testing
//!
//! Types and traits for experiments that compare two flow configurations,
//! their sticky variant assignments, and the verdicts computed from samples.

mod entity;
mod repository;
mod result;
mod validation;

pub use entity::{Experiment, ExperimentConfig, ExperimentId, ExperimentStatus, Variant};
pub use repository::{AssignmentStore, ExperimentQuery, ExperimentRepository};
pub use result::{
    ABTestResult, Comparison, ExperimentDashboard, ExperimentProgress, MetricComparison,
    VariantSummary, Winner,
};
pub use validation::{
    validate_experiment_id, validate_experiment_name, validate_flow_ref,
    ExperimentValidationError,
};
