//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, ComparisonConfig, EmbeddingConfig, EmbeddingProviderKind, EvaluationConfig,
    LogFormat, LoggingConfig, StorageConfig,
};
