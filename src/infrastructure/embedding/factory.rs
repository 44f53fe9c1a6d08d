//! Embedding provider factory

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{HttpClient, LocalEmbeddingProvider, OpenAiEmbeddingProvider};
use crate::config::{EmbeddingConfig, EmbeddingProviderKind};
use crate::domain::{DomainError, EmbeddingProvider};

/// Build the configured embedding provider
pub fn create_embedding_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderKind::Local => Arc::new(LocalEmbeddingProvider::new(config.dimensions)?),
        EmbeddingProviderKind::OpenAi => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    DomainError::configuration("embedding.api_key is required for the openai provider")
                })?;

            let client = HttpClient::with_timeout(Duration::from_millis(config.timeout_ms))?;

            let provider = match config.base_url.as_deref() {
                Some(base_url) => OpenAiEmbeddingProvider::with_base_url(client, api_key, base_url),
                None => OpenAiEmbeddingProvider::new(client, api_key),
            };

            match config.model.as_deref() {
                Some(model) => Arc::new(provider.with_model(model)),
                None => Arc::new(provider),
            }
        }
    };

    info!(
        provider = provider.provider_name(),
        model = %provider.default_model(),
        "Embedding provider initialized"
    );

    Ok(provider)
}
