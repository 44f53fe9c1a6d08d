//! Human feedback domain module

mod entity;
mod repository;

pub use entity::{
    FeedbackId, FeedbackRecord, FeedbackValidationError, HumanFeedback, MAX_COMMENT_LENGTH,
    MAX_RATING, MIN_RATING,
};
pub use repository::FeedbackRepository;

#[cfg(test)]
pub use repository::MockFeedbackRepository;
