//! Embedding provider implementations

mod factory;
mod http_client;
mod local;
mod openai;

pub use factory::create_embedding_provider;
pub use http_client::{HttpClient, HttpClientTrait};
pub use local::{LocalEmbeddingProvider, DEFAULT_LOCAL_DIMENSIONS, DEFAULT_LOCAL_EMBEDDING_MODEL};
pub use openai::{OpenAiEmbeddingProvider, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_EMBEDDING_MODEL};

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
