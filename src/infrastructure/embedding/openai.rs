//! OpenAI-compatible embeddings endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::HttpClientTrait;
use crate::domain::embedding::{
    Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};
use crate::domain::DomainError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

const PROVIDER: &str = "openai";

/// Embeds texts through `POST {base_url}/v1/embeddings`.
///
/// All texts of a request travel in one batch. Returned vectors are placed by
/// their `index` field, and a batch with a position missing, repeated or out of
/// range is rejected rather than returned short.
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    authorization: String,
    endpoint: String,
    model: String,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    /// Target a compatible server; a trailing slash on `base_url` is ignored
    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();

        Self {
            client,
            authorization: format!("Bearer {}", api_key.into()),
            endpoint: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            model: DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn place_by_index(
        batch_size: usize,
        payload: EmbeddingsPayload,
    ) -> Result<EmbeddingResponse, DomainError> {
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; batch_size];

        for item in payload.data {
            let slot = slots.get_mut(item.index).ok_or_else(|| {
                DomainError::provider(
                    PROVIDER,
                    format!(
                        "Embedding index {} is outside a batch of {}",
                        item.index, batch_size
                    ),
                )
            })?;

            if slot.replace(item.embedding).is_some() {
                return Err(DomainError::provider(
                    PROVIDER,
                    format!("Embedding index {} returned twice", item.index),
                ));
            }
        }

        let embeddings = slots
            .into_iter()
            .enumerate()
            .map(|(index, vector)| {
                vector.map(|v| Embedding::new(index, v)).ok_or_else(|| {
                    DomainError::provider(
                        PROVIDER,
                        format!("No embedding returned for input {}", index),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EmbeddingResponse::new(
            payload.model,
            embeddings,
            EmbeddingUsage::new(payload.usage.prompt_tokens, payload.usage.total_tokens),
        ))
    }
}

fn known_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        let inputs = request.inputs();
        let batch_size = inputs.len();

        let body = serde_json::to_value(EmbeddingsBody {
            model: request.model(),
            input: inputs,
            dimensions: request.dimensions(),
        })
        .map_err(|e| DomainError::internal(format!("Failed to encode embedding request: {}", e)))?;

        debug!(model = %request.model(), batch_size, "Requesting embeddings");

        let headers = vec![
            ("Authorization", self.authorization.as_str()),
            ("Content-Type", "application/json"),
        ];
        let json = self.client.post_json(&self.endpoint, headers, &body).await?;

        let payload: EmbeddingsPayload = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(PROVIDER, format!("Unreadable embeddings payload: {}", e))
        })?;

        Self::place_by_index(batch_size, payload)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self, model: &str) -> Option<usize> {
        known_dimensions(model)
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct EmbeddingsBody<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsPayload {
    model: String,
    data: Vec<EmbeddingItem>,
    #[serde(default)]
    usage: TokenCounts,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Some compatible servers omit usage entirely
#[derive(Debug, Default, Deserialize)]
struct TokenCounts {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}
