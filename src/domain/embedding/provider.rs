//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;

/// Maps text to fixed-length vectors. Deterministic for a fixed model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate one embedding per input, indexed by batch position
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError>;

    fn provider_name(&self) -> &'static str;

    fn default_model(&self) -> &str;

    /// Embedding dimensions for a model, if known
    fn dimensions(&self, model: &str) -> Option<usize>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::embedding::{Embedding, EmbeddingUsage};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Deterministic provider for tests.
    ///
    /// Texts registered with `with_vector` embed to that vector; other texts get a
    /// vector derived from their bytes.
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        dimensions: usize,
        vectors: HashMap<String, Vec<f32>>,
        error: Option<String>,
        delay: Option<Duration>,
        drop_last: bool,
        calls: AtomicUsize,
    }

    impl MockEmbeddingProvider {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                vectors: HashMap::new(),
                error: None,
                delay: None,
                drop_last: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
            self.vectors.insert(text.into(), vector);
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Return one embedding fewer than requested
        pub fn with_missing_embedding(mut self) -> Self {
            self.drop_last = true;
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn vector_for(&self, text: &str) -> Vec<f32> {
            if let Some(vector) = self.vectors.get(text) {
                return vector.clone();
            }

            let hash = text
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            (0..self.dimensions)
                .map(|i| ((hash.wrapping_add(i as u64 * 7919) % 1000) as f32 / 1000.0) - 0.5)
                .collect()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(ref error) = self.error {
                return Err(DomainError::provider("mock", error));
            }

            let inputs = request.inputs();
            let mut embeddings: Vec<Embedding> = inputs
                .iter()
                .enumerate()
                .map(|(idx, text)| Embedding::new(idx, self.vector_for(text)))
                .collect();

            if self.drop_last {
                embeddings.pop();
            }

            let tokens = inputs.iter().map(|t| t.len() / 4).sum::<usize>() as u32;

            Ok(EmbeddingResponse::new(
                request.model(),
                embeddings,
                EmbeddingUsage::new(tokens, tokens),
            ))
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }

        fn default_model(&self) -> &str {
            "mock-embedding"
        }

        fn dimensions(&self, _model: &str) -> Option<usize> {
            Some(self.dimensions)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_provider_pair() {
            let provider = MockEmbeddingProvider::new(64);
            let response = provider
                .embed(EmbeddingRequest::pair("mock-embedding", "Hello", "World"))
                .await
                .unwrap();

            assert_eq!(response.embeddings().len(), 2);
            assert_eq!(response.get(1).unwrap().vector().len(), 64);
            assert_eq!(provider.call_count(), 1);
        }

        #[tokio::test]
        async fn test_registered_vector() {
            let provider = MockEmbeddingProvider::new(2).with_vector("x", vec![1.0, 0.0]);
            let response = provider
                .embed(EmbeddingRequest::single("mock-embedding", "x"))
                .await
                .unwrap();

            assert_eq!(response.get(0).unwrap().vector(), &[1.0, 0.0]);
        }

        #[tokio::test]
        async fn test_deterministic_embeddings() {
            let provider = MockEmbeddingProvider::new(32);
            let first = provider
                .embed(EmbeddingRequest::single("m", "Hello"))
                .await
                .unwrap();
            let second = provider
                .embed(EmbeddingRequest::single("m", "Hello"))
                .await
                .unwrap();

            assert_eq!(first.get(0).unwrap().vector(), second.get(0).unwrap().vector());
        }

        #[tokio::test]
        async fn test_mock_provider_error() {
            let provider = MockEmbeddingProvider::new(8).with_error("API error");
            let result = provider.embed(EmbeddingRequest::single("m", "Hello")).await;

            assert!(matches!(result, Err(DomainError::Provider { .. })));
        }
    }
}
