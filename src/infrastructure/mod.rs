//! Infrastructure layer - Embedding providers, in-memory stores, statistics and services

pub mod embedding;
pub mod evaluation;
pub mod experiment;
pub mod feedback;
pub mod logging;
pub mod services;
pub mod timeout;
