//! Human feedback entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::experiment::ExperimentId;
use crate::domain::DomainError;

/// Lowest allowed rating
pub const MIN_RATING: f64 = 1.0;

/// Highest allowed rating
pub const MAX_RATING: f64 = 5.0;

/// Maximum length of the free-text comment
pub const MAX_COMMENT_LENGTH: usize = 5000;

/// Validation errors for human feedback
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeedbackValidationError {
    #[error("Response ID cannot be empty")]
    EmptyResponseId,

    #[error("Feedback is for response '{feedback}' but was submitted for '{submitted}'")]
    ResponseIdMismatch { feedback: String, submitted: String },

    #[error("{0} rating must be within [1, 5], got {1}")]
    RatingOutOfRange(&'static str, f64),

    #[error("Comment exceeds maximum length of {0} characters")]
    CommentTooLong(usize),
}

impl From<FeedbackValidationError> for DomainError {
    fn from(error: FeedbackValidationError) -> Self {
        DomainError::invalid_feedback(error.to_string())
    }
}

/// Unique identifier for a feedback record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedbackId(String);

impl FeedbackId {
    pub fn generate() -> Self {
        Self(format!("fb-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A human's ratings of one generated response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanFeedback {
    pub response_id: String,
    pub helpfulness: f64,
    pub accuracy: f64,
    pub clarity: f64,
    pub overall_rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl HumanFeedback {
    pub fn new(
        response_id: impl Into<String>,
        helpfulness: f64,
        accuracy: f64,
        clarity: f64,
        overall_rating: f64,
    ) -> Self {
        Self {
            response_id: response_id.into(),
            helpfulness,
            accuracy,
            clarity,
            overall_rating,
            comments: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn validate(&self) -> Result<(), FeedbackValidationError> {
        if self.response_id.trim().is_empty() {
            return Err(FeedbackValidationError::EmptyResponseId);
        }

        for (name, rating) in [
            ("helpfulness", self.helpfulness),
            ("accuracy", self.accuracy),
            ("clarity", self.clarity),
            ("overall", self.overall_rating),
        ] {
            // NaN fails the range check
            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(FeedbackValidationError::RatingOutOfRange(name, rating));
            }
        }

        if let Some(ref comments) = self.comments {
            if comments.chars().count() > MAX_COMMENT_LENGTH {
                return Err(FeedbackValidationError::CommentTooLong(MAX_COMMENT_LENGTH));
            }
        }

        Ok(())
    }
}

/// Stored, immutable feedback entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: FeedbackId,
    pub experiment_id: ExperimentId,
    pub feedback: HumanFeedback,
    pub recorded_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(experiment_id: ExperimentId, feedback: HumanFeedback) -> Self {
        Self {
            id: FeedbackId::generate(),
            experiment_id,
            feedback,
            recorded_at: Utc::now(),
        }
    }

    pub fn response_id(&self) -> &str {
        &self.feedback.response_id
    }
}
