//! Per-response metric evaluation

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::evaluation::{EvaluationInput, EvaluationMetrics, TokenPricing};
use crate::domain::DomainError;
use crate::infrastructure::timeout::bounded;

/// Score used when an embedding similarity cannot be computed
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Default bound on each embedding call
pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(2);

/// Lexical overlap of the prompt's vocabulary with the response's.
///
/// Case-insensitive and whitespace-tokenised, so punctuation stays attached to
/// words. Zero when the prompt has no words.
pub fn relevance_score(prompt: &str, response: &str) -> f64 {
    let prompt_lower = prompt.to_lowercase();
    let response_lower = response.to_lowercase();

    let prompt_words: HashSet<&str> = prompt_lower.split_whitespace().collect();
    if prompt_words.is_empty() {
        return 0.0;
    }

    let response_words: HashSet<&str> = response_lower.split_whitespace().collect();
    let overlap = prompt_words.intersection(&response_words).count();

    (overlap as f64 / prompt_words.len() as f64).min(1.0)
}

/// Computes `EvaluationMetrics` for prompt/response pairs.
///
/// Embedding failures and timeouts never surface: the affected score falls back
/// to [`NEUTRAL_SCORE`]. Calls are independent and may run concurrently.
#[derive(Debug, Clone)]
pub struct MetricEvaluator {
    provider: Arc<dyn EmbeddingProvider>,
    model: String,
    timeout: Duration,
    pricing: TokenPricing,
}

impl MetricEvaluator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, pricing: TokenPricing) -> Self {
        let model = provider.default_model().to_string();

        Self {
            provider,
            model,
            timeout: DEFAULT_EMBEDDING_TIMEOUT,
            pricing,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pricing(&self) -> &TokenPricing {
        &self.pricing
    }

    pub async fn evaluate(&self, input: &EvaluationInput) -> EvaluationMetrics {
        let coherence = self.similarity_score("coherence", &input.prompt, &input.response);
        let accuracy = async {
            match input.expected_output.as_deref() {
                Some(expected) => Some(
                    self.similarity_score("factual_accuracy", &input.response, expected)
                        .await,
                ),
                None => None,
            }
        };

        let (coherence, accuracy) = tokio::join!(coherence, accuracy);

        let relevance = relevance_score(&input.prompt, &input.response);
        let usage = input.token_usage.unwrap_or_default();
        let cost = self.pricing.cost(&usage);

        let metrics =
            EvaluationMetrics::new(input.execution_time_ms, usage, cost, coherence, relevance);

        debug!(
            coherence,
            relevance,
            factual_accuracy = ?accuracy,
            cost,
            "Response evaluated"
        );

        match accuracy {
            Some(accuracy) => metrics.with_factual_accuracy(accuracy),
            None => metrics,
        }
    }

    /// Cosine similarity rescaled from [-1, 1] to [0, 1], or the neutral score
    async fn similarity_score(&self, metric: &'static str, first: &str, second: &str) -> f64 {
        match self.similarity(first, second).await {
            Ok(similarity) => ((similarity + 1.0) / 2.0).clamp(0.0, 1.0),
            Err(e) => {
                warn!(
                    metric,
                    provider = self.provider.provider_name(),
                    error = %e,
                    "Embedding similarity unavailable, using neutral score"
                );
                NEUTRAL_SCORE
            }
        }
    }

    async fn similarity(&self, first: &str, second: &str) -> Result<f64, DomainError> {
        let request = EmbeddingRequest::pair(&self.model, first, second);
        let response = bounded("embedding", self.timeout, self.provider.embed(request)).await?;

        let (Some(a), Some(b)) = (response.get(0), response.get(1)) else {
            return Err(DomainError::provider(
                self.provider.provider_name(),
                format!(
                    "Expected 2 embeddings, got {}",
                    response.embeddings().len()
                ),
            ));
        };

        a.cosine_similarity(b).ok_or_else(|| {
            DomainError::provider(
                self.provider.provider_name(),
                format!(
                    "Cosine similarity undefined for embeddings of {} and {} dimensions",
                    a.dimensions(),
                    b.dimensions()
                ),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::evaluation::TokenUsage;

    fn evaluator(provider: MockEmbeddingProvider) -> MetricEvaluator {
        MetricEvaluator::new(Arc::new(provider), TokenPricing::default())
    }

    mod relevance_tests {
        use super::*;

        #[test]
        fn test_capital_of_france() {
            let score = relevance_score(
                "What is the capital of France?",
                "Paris is the capital of France.",
            );
            // {is, the, capital, of} of 6 prompt words; "france?" != "france."
            assert!((score - 4.0 / 6.0).abs() < 1e-9, "score = {}", score);
        }

        #[test]
        fn test_case_insensitive() {
            assert_eq!(relevance_score("HELLO World", "hello world"), 1.0);
        }

        #[test]
        fn test_empty_prompt() {
            assert_eq!(relevance_score("", "anything at all"), 0.0);
            assert_eq!(relevance_score("   \n\t", "anything"), 0.0);
        }

        #[test]
        fn test_duplicates_count_once() {
            let score = relevance_score("the the the cat", "the dog");
            assert!((score - 0.5).abs() < 1e-9);
        }

        #[test]
        fn test_bounded() {
            for (p, r) in [("a b c", ""), ("a", "a a a a"), ("x y", "y x z")] {
                let score = relevance_score(p, r);
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }

    mod coherence_tests {
        use super::*;

        #[tokio::test]
        async fn test_rescaled_similarity() {
            let provider = MockEmbeddingProvider::new(2)
                .with_vector("prompt", vec![1.0, 0.0])
                .with_vector("same", vec![2.0, 0.0])
                .with_vector("orthogonal", vec![0.0, 1.0])
                .with_vector("opposite", vec![-1.0, 0.0]);
            let evaluator = evaluator(provider);

            let same = evaluator.evaluate(&EvaluationInput::new("prompt", "same")).await;
            let orthogonal = evaluator
                .evaluate(&EvaluationInput::new("prompt", "orthogonal"))
                .await;
            let opposite = evaluator
                .evaluate(&EvaluationInput::new("prompt", "opposite"))
                .await;

            assert!((same.coherence_score() - 1.0).abs() < 1e-9);
            assert!((orthogonal.coherence_score() - 0.5).abs() < 1e-9);
            assert!(opposite.coherence_score().abs() < 1e-9);
        }

        #[tokio::test]
        async fn test_provider_error_falls_back_to_neutral() {
            let evaluator = evaluator(MockEmbeddingProvider::new(8).with_error("boom"));
            let metrics = evaluator
                .evaluate(&EvaluationInput::new("a prompt", "a response").with_expected_output("x"))
                .await;

            assert_eq!(metrics.coherence_score(), NEUTRAL_SCORE);
            assert_eq!(metrics.factual_accuracy(), Some(NEUTRAL_SCORE));
        }

        #[tokio::test]
        async fn test_timeout_falls_back_to_neutral() {
            let provider = MockEmbeddingProvider::new(8).with_delay(Duration::from_millis(500));
            let evaluator = evaluator(provider).with_timeout(Duration::from_millis(20));

            let metrics = evaluator
                .evaluate(&EvaluationInput::new("a prompt", "a response"))
                .await;

            assert_eq!(metrics.coherence_score(), NEUTRAL_SCORE);
        }

        #[tokio::test]
        async fn test_missing_embedding_falls_back_to_neutral() {
            let evaluator = evaluator(MockEmbeddingProvider::new(8).with_missing_embedding());
            let metrics = evaluator.evaluate(&EvaluationInput::new("p", "r")).await;

            assert_eq!(metrics.coherence_score(), NEUTRAL_SCORE);
        }

        #[tokio::test]
        async fn test_dimension_mismatch_falls_back_to_neutral() {
            let provider = MockEmbeddingProvider::new(2)
                .with_vector("p", vec![1.0, 0.0])
                .with_vector("r", vec![1.0, 0.0, 0.0]);
            let metrics = evaluator(provider)
                .evaluate(&EvaluationInput::new("p", "r"))
                .await;

            assert_eq!(metrics.coherence_score(), NEUTRAL_SCORE);
        }

        #[tokio::test]
        async fn test_zero_vector_falls_back_to_neutral() {
            let provider = MockEmbeddingProvider::new(2)
                .with_vector("p", vec![0.0, 0.0])
                .with_vector("r", vec![1.0, 0.0]);
            let metrics = evaluator(provider)
                .evaluate(&EvaluationInput::new("p", "r"))
                .await;

            assert_eq!(metrics.coherence_score(), NEUTRAL_SCORE);
        }
    }

    mod evaluate_tests {
        use super::*;

        #[tokio::test]
        async fn test_factual_accuracy_only_with_expected_output() {
            let provider = MockEmbeddingProvider::new(2)
                .with_vector("answer", vec![1.0, 0.0])
                .with_vector("reference", vec![1.0, 0.0]);
            let evaluator = evaluator(provider);

            let without = evaluator
                .evaluate(&EvaluationInput::new("question", "answer"))
                .await;
            assert_eq!(without.factual_accuracy(), None);

            let with = evaluator
                .evaluate(&EvaluationInput::new("question", "answer").with_expected_output("reference"))
                .await;
            assert!((with.factual_accuracy().unwrap() - 1.0).abs() < 1e-9);
        }

        #[tokio::test]
        async fn test_accuracy_and_coherence_run_as_separate_calls() {
            let provider = Arc::new(MockEmbeddingProvider::new(4));
            let evaluator = MetricEvaluator::new(provider.clone(), TokenPricing::default());

            evaluator
                .evaluate(&EvaluationInput::new("p", "r").with_expected_output("e"))
                .await;

            assert_eq!(provider.call_count(), 2);
        }

        #[tokio::test]
        async fn test_cost_and_latency() {
            let evaluator = MetricEvaluator::new(
                Arc::new(MockEmbeddingProvider::new(4)),
                TokenPricing::new(0.001, 0.002),
            );

            let metrics = evaluator
                .evaluate(
                    &EvaluationInput::new("p", "r")
                        .with_execution_time_ms(250.0)
                        .with_token_usage(TokenUsage::new(100, 50)),
                )
                .await;

            assert_eq!(metrics.latency_ms(), 250.0);
            assert_eq!(metrics.token_usage(), TokenUsage::new(100, 50));
            assert!((metrics.cost() - 0.2).abs() < 1e-12);
        }

        #[tokio::test]
        async fn test_missing_token_counts_cost_nothing() {
            let metrics = evaluator(MockEmbeddingProvider::new(4))
                .evaluate(&EvaluationInput::new("p", "r"))
                .await;

            assert_eq!(metrics.token_usage(), TokenUsage::default());
            assert_eq!(metrics.cost(), 0.0);
        }

        #[tokio::test]
        async fn test_scores_in_unit_interval() {
            let evaluator = evaluator(MockEmbeddingProvider::new(16));
            for (p, r) in [
                ("What is Rust?", "A systems language."),
                ("", ""),
                ("same text", "same text"),
            ] {
                let metrics = evaluator.evaluate(&EvaluationInput::new(p, r)).await;
                assert!((0.0..=1.0).contains(&metrics.coherence_score()));
                assert!((0.0..=1.0).contains(&metrics.relevance_score()));
            }
        }
    }
}
