//! Token pricing used for cost estimation

use serde::{Deserialize, Serialize};

use super::metrics::TokenUsage;
use crate::domain::DomainError;

/// Default price per prompt token (USD)
pub const DEFAULT_PROMPT_TOKEN_RATE: f64 = 0.000_03;

/// Default price per completion token (USD)
pub const DEFAULT_COMPLETION_TOKEN_RATE: f64 = 0.000_06;

/// Per-token rates used to estimate the cost of a response.
///
/// Cost is linear in token counts; there are no tiers or minimums.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPricing {
    /// Price per prompt token
    pub prompt_token_rate: f64,
    /// Price per completion token
    pub completion_token_rate: f64,
}

impl TokenPricing {
    /// Create pricing from per-token rates
    pub fn new(prompt_token_rate: f64, completion_token_rate: f64) -> Self {
        Self {
            prompt_token_rate,
            completion_token_rate,
        }
    }

    /// Create pricing from rates quoted per 1K tokens
    pub fn per_1k(prompt_per_1k: f64, completion_per_1k: f64) -> Self {
        Self::new(prompt_per_1k / 1000.0, completion_per_1k / 1000.0)
    }

    /// Estimate the cost for the given token usage
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        usage.prompt_tokens as f64 * self.prompt_token_rate
            + usage.completion_tokens as f64 * self.completion_token_rate
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for (name, rate) in [
            ("prompt_token_rate", self.prompt_token_rate),
            ("completion_token_rate", self.completion_token_rate),
        ] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(DomainError::configuration(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, rate
                )));
            }
        }

        Ok(())
    }
}

impl Default for TokenPricing {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_TOKEN_RATE, DEFAULT_COMPLETION_TOKEN_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates() {
        let pricing = TokenPricing::default();
        let cost = pricing.cost(&TokenUsage::new(1000, 1000));

        // 1000 * 0.00003 + 1000 * 0.00006
        assert!((cost - 0.09).abs() < 1e-12);
    }

    #[test]
    fn test_per_1k() {
        let pricing = TokenPricing::per_1k(0.03, 0.06);
        assert!((pricing.prompt_token_rate - 0.000_03).abs() < 1e-15);
        assert!((pricing.completion_token_rate - 0.000_06).abs() < 1e-15);
    }

    #[test]
    fn test_cost_is_linear() {
        let pricing = TokenPricing::new(0.5, 1.5);
        let single = pricing.cost(&TokenUsage::new(120, 45));
        let double = pricing.cost(&TokenUsage::new(240, 90));

        assert!((double - 2.0 * single).abs() < 1e-9);
    }

    #[test]
    fn test_zero_tokens_cost_nothing() {
        assert_eq!(TokenPricing::default().cost(&TokenUsage::default()), 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(TokenPricing::default().validate().is_ok());
        assert!(TokenPricing::new(-0.1, 0.0).validate().is_err());
        assert!(TokenPricing::new(0.0, f64::NAN).validate().is_err());
    }
}
