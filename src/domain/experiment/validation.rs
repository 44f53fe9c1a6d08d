//! Experiment validation utilities

use thiserror::Error;

use crate::domain::DomainError;

/// Maximum length for experiment IDs
pub const MAX_EXPERIMENT_ID_LENGTH: usize = 64;

/// Maximum length for flow references
pub const MAX_FLOW_REF_LENGTH: usize = 100;

/// Maximum length for experiment names
pub const MAX_EXPERIMENT_NAME_LENGTH: usize = 200;

/// Validation errors for experiments and their configuration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExperimentValidationError {
    #[error("Experiment ID cannot be empty")]
    EmptyId,

    #[error("Experiment ID exceeds maximum length of {0} characters")]
    IdTooLong(usize),

    #[error("Experiment ID must start with a letter or number")]
    InvalidIdStart,

    #[error("Experiment ID must end with a letter or number")]
    InvalidIdEnd,

    #[error("Experiment ID contains invalid character: '{0}'")]
    InvalidIdCharacter(char),

    #[error("Experiment ID cannot contain consecutive hyphens")]
    ConsecutiveHyphens,

    #[error("Experiment name cannot be empty")]
    EmptyName,

    #[error("Experiment name exceeds maximum length of {0} characters")]
    NameTooLong(usize),

    #[error("Flow reference for variant {0} cannot be empty")]
    EmptyFlowRef(char),

    #[error("Flow reference for variant {0} exceeds maximum length of {1} characters")]
    FlowRefTooLong(char, usize),

    #[error("traffic_split must be within [0, 1], got {0}")]
    InvalidTrafficSplit(f64),

    #[error("minimum_sample_size must be greater than 0")]
    InvalidMinimumSampleSize,

    #[error("max_duration_days must be greater than 0")]
    InvalidMaxDuration,

    #[error("success_metric cannot be empty")]
    EmptySuccessMetric,

    #[error("tie_tolerance must be a finite non-negative number, got {0}")]
    InvalidTieTolerance(f64),

    #[error("Invalid experiment status transition from {0} to {1}")]
    InvalidStatusTransition(String, String),
}

impl From<ExperimentValidationError> for DomainError {
    fn from(error: ExperimentValidationError) -> Self {
        match error {
            ExperimentValidationError::InvalidStatusTransition(..) => {
                DomainError::invalid_transition(error.to_string())
            }
            ExperimentValidationError::EmptyId
            | ExperimentValidationError::IdTooLong(_)
            | ExperimentValidationError::InvalidIdStart
            | ExperimentValidationError::InvalidIdEnd
            | ExperimentValidationError::InvalidIdCharacter(_)
            | ExperimentValidationError::ConsecutiveHyphens => {
                DomainError::validation(error.to_string())
            }
            _ => DomainError::invalid_config(error.to_string()),
        }
    }
}

/// Validate an experiment ID
pub fn validate_experiment_id(id: &str) -> Result<(), ExperimentValidationError> {
    let (Some(first_char), Some(last_char)) = (id.chars().next(), id.chars().last()) else {
        return Err(ExperimentValidationError::EmptyId);
    };

    if id.len() > MAX_EXPERIMENT_ID_LENGTH {
        return Err(ExperimentValidationError::IdTooLong(MAX_EXPERIMENT_ID_LENGTH));
    }

    if !first_char.is_ascii_alphanumeric() {
        return Err(ExperimentValidationError::InvalidIdStart);
    }

    if !last_char.is_ascii_alphanumeric() {
        return Err(ExperimentValidationError::InvalidIdEnd);
    }

    let mut prev_was_hyphen = false;

    for ch in id.chars() {
        if ch == '-' {
            if prev_was_hyphen {
                return Err(ExperimentValidationError::ConsecutiveHyphens);
            }
            prev_was_hyphen = true;
        } else if ch.is_ascii_alphanumeric() {
            prev_was_hyphen = false;
        } else {
            return Err(ExperimentValidationError::InvalidIdCharacter(ch));
        }
    }

    Ok(())
}

/// Validate an experiment name
pub fn validate_experiment_name(name: &str) -> Result<(), ExperimentValidationError> {
    if name.trim().is_empty() {
        return Err(ExperimentValidationError::EmptyName);
    }

    if name.len() > MAX_EXPERIMENT_NAME_LENGTH {
        return Err(ExperimentValidationError::NameTooLong(
            MAX_EXPERIMENT_NAME_LENGTH,
        ));
    }

    Ok(())
}

/// Validate the flow reference for one side of the experiment
pub fn validate_flow_ref(variant: char, flow_ref: &str) -> Result<(), ExperimentValidationError> {
    if flow_ref.trim().is_empty() {
        return Err(ExperimentValidationError::EmptyFlowRef(variant));
    }

    if flow_ref.len() > MAX_FLOW_REF_LENGTH {
        return Err(ExperimentValidationError::FlowRefTooLong(
            variant,
            MAX_FLOW_REF_LENGTH,
        ));
    }

    Ok(())
}
