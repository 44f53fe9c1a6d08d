//! Evaluate command - scores one prompt/response pair

use std::time::Duration;

use clap::Args;

use crate::domain::evaluation::{EvaluationInput, TokenUsage};
use crate::infrastructure::embedding::create_embedding_provider;
use crate::infrastructure::evaluation::MetricEvaluator;

/// Arguments for the evaluate command
#[derive(Args, Clone, Debug)]
pub struct EvaluateArgs {
    /// Prompt sent to the pipeline
    #[arg(long)]
    pub prompt: String,

    /// Response produced by the pipeline
    #[arg(long)]
    pub response: String,

    /// Reference answer for factual accuracy
    #[arg(long)]
    pub expected: Option<String>,

    /// Observed execution time in milliseconds
    #[arg(long, default_value_t = 0.0)]
    pub execution_time_ms: f64,

    #[arg(long, default_value_t = 0)]
    pub prompt_tokens: u32,

    #[arg(long, default_value_t = 0)]
    pub completion_tokens: u32,
}

impl EvaluateArgs {
    fn input(&self) -> EvaluationInput {
        let input = EvaluationInput::new(&self.prompt, &self.response)
            .with_execution_time_ms(self.execution_time_ms)
            .with_token_usage(TokenUsage::new(self.prompt_tokens, self.completion_tokens));

        match self.expected {
            Some(ref expected) => input.with_expected_output(expected),
            None => input,
        }
    }
}

/// Run the evaluate command
pub async fn run(args: EvaluateArgs) -> anyhow::Result<()> {
    let config = super::prepare()?;

    crate::domain::evaluation::validate_latency(args.execution_time_ms)?;

    let provider = create_embedding_provider(&config.embedding)?;
    let evaluator = MetricEvaluator::new(provider, config.evaluation.pricing())
        .with_timeout(Duration::from_millis(config.embedding.timeout_ms));

    let metrics = evaluator.evaluate(&args.input()).await;

    super::print_json(&metrics)
}
