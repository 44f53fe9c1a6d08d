//! Input to a single evaluation

use serde::{Deserialize, Serialize};

use super::metrics::TokenUsage;

/// A prompt/response pair with its observed timing and token counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationInput {
    pub prompt: String,
    pub response: String,
    /// Reference answer; factual accuracy is only computed when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    #[serde(default)]
    pub execution_time_ms: f64,
    /// Missing counts are treated as zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

impl EvaluationInput {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            expected_output: None,
            execution_time_ms: 0.0,
            token_usage: None,
        }
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    pub fn with_execution_time_ms(mut self, execution_time_ms: f64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }

    pub fn with_token_usage(mut self, usage: TokenUsage) -> Self {
        self.token_usage = Some(usage);
        self
    }
}
