//! Offline feature-hashing embedding provider

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::embedding::{
    Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};
use crate::domain::DomainError;

pub const DEFAULT_LOCAL_EMBEDDING_MODEL: &str = "local-hash";

pub const DEFAULT_LOCAL_DIMENSIONS: usize = 384;

/// Whole words count double relative to character n-grams
const WORD_WEIGHT: f32 = 2.0;

/// Deterministic embedder that hashes character 2-4-grams and words into a
/// fixed-size vector, then L2-normalises it.
///
/// Buckets come from SHA-256, so a text maps to the same vector on every
/// build and platform.
///
/// Captures lexical rather than semantic similarity; needs no network access.
/// Empty text yields a zero vector, for which cosine similarity is undefined.
#[derive(Debug, Clone)]
pub struct LocalEmbeddingProvider {
    dimensions: usize,
}

impl LocalEmbeddingProvider {
    pub fn new(dimensions: usize) -> Result<Self, DomainError> {
        if dimensions == 0 {
            return Err(DomainError::configuration(
                "Local embedding dimensions must be greater than 0",
            ));
        }

        Ok(Self { dimensions })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lower = text.to_lowercase();
        let chars: Vec<char> = lower.chars().collect();

        for window_size in 2..=4 {
            for window in chars.windows(window_size) {
                let gram: String = window.iter().collect();
                vector[self.bucket(&gram)] += 1.0;
            }
        }

        for word in lower.split_whitespace() {
            vector[self.bucket(word)] += WORD_WEIGHT;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }

        vector
    }

    fn bucket(&self, feature: &str) -> usize {
        let digest = Sha256::digest(feature.as_bytes());

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);

        (u64::from_be_bytes(prefix) % self.dimensions as u64) as usize
    }
}

impl Default for LocalEmbeddingProvider {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_LOCAL_DIMENSIONS,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        let inputs = request.inputs();

        let embeddings = inputs
            .iter()
            .enumerate()
            .map(|(idx, text)| Embedding::new(idx, self.embed_text(text)))
            .collect();

        let tokens = inputs
            .iter()
            .map(|t| t.split_whitespace().count())
            .sum::<usize>() as u32;

        Ok(EmbeddingResponse::new(
            request.model(),
            embeddings,
            EmbeddingUsage::new(tokens, tokens),
        ))
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }

    fn default_model(&self) -> &str {
        DEFAULT_LOCAL_EMBEDDING_MODEL
    }

    fn dimensions(&self, _model: &str) -> Option<usize> {
        Some(self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::cosine_similarity;

    async fn similarity(provider: &LocalEmbeddingProvider, a: &str, b: &str) -> Option<f64> {
        let response = provider
            .embed(EmbeddingRequest::pair(DEFAULT_LOCAL_EMBEDDING_MODEL, a, b))
            .await
            .unwrap();
        cosine_similarity(
            response.get(0).unwrap().vector(),
            response.get(1).unwrap().vector(),
        )
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(LocalEmbeddingProvider::new(0).is_err());
    }

    #[tokio::test]
    async fn test_vectors_are_normalised() {
        let provider = LocalEmbeddingProvider::new(64).unwrap();
        let response = provider
            .embed(EmbeddingRequest::single("local-hash", "Paris is lovely"))
            .await
            .unwrap();

        let vector = response.get(0).unwrap().vector();
        assert_eq!(vector.len(), 64);
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_buckets_are_pinned() {
        let small = LocalEmbeddingProvider::new(64).unwrap();
        assert_eq!(small.bucket("ab"), 36);
        assert_eq!(small.bucket("paris"), 4);

        let default = LocalEmbeddingProvider::default();
        assert_eq!(default.bucket("ab"), 292);
        assert_eq!(default.bucket("paris"), 132);
    }

    #[test]
    fn test_single_feature_text_has_one_hot_vector() {
        // "ab" is both the only bigram and the only word
        let provider = LocalEmbeddingProvider::new(64).unwrap();
        let vector = provider.embed_text("AB");

        for (idx, value) in vector.iter().enumerate() {
            let expected = if idx == 36 { 1.0 } else { 0.0 };
            assert!((value - expected).abs() < 1e-6, "index {}", idx);
        }
    }

    #[tokio::test]
    async fn test_identical_texts_are_maximally_similar() {
        let provider = LocalEmbeddingProvider::default();
        let sim = similarity(&provider, "the capital of France", "The capital of France")
            .await
            .unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_related_texts_score_higher_than_unrelated() {
        let provider = LocalEmbeddingProvider::default();
        let related = similarity(
            &provider,
            "What is the capital of France?",
            "Paris is the capital of France.",
        )
        .await
        .unwrap();
        let unrelated = similarity(
            &provider,
            "What is the capital of France?",
            "Quantum chromodynamics governs gluons",
        )
        .await
        .unwrap();

        assert!(related > unrelated);
    }

    #[tokio::test]
    async fn test_empty_text_has_undefined_similarity() {
        let provider = LocalEmbeddingProvider::default();
        assert!(similarity(&provider, "", "anything").await.is_none());
    }
}
