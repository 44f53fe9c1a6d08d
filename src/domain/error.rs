use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid experiment configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Experiment not found: {experiment_id}")]
    ExperimentNotFound { experiment_id: String },

    #[error("Experiment '{experiment_id}' is completed and accepts no further writes")]
    ExperimentClosed { experiment_id: String },

    #[error("Invalid feedback: {message}")]
    InvalidFeedback { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid status transition: {message}")]
    InvalidTransition { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn experiment_not_found(experiment_id: impl Into<String>) -> Self {
        Self::ExperimentNotFound {
            experiment_id: experiment_id.into(),
        }
    }

    pub fn experiment_closed(experiment_id: impl Into<String>) -> Self {
        Self::ExperimentClosed {
            experiment_id: experiment_id.into(),
        }
    }

    pub fn invalid_feedback(message: impl Into<String>) -> Self {
        Self::InvalidFeedback {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error is an identity or configuration error surfaced to callers
    /// as-is (never retried)
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::ExperimentNotFound { .. }
                | Self::ExperimentClosed { .. }
                | Self::InvalidFeedback { .. }
                | Self::Validation { .. }
                | Self::InvalidTransition { .. }
        )
    }
}
