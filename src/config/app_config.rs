use serde::Deserialize;

use crate::domain::evaluation::{DEFAULT_COMPLETION_TOKEN_RATE, DEFAULT_PROMPT_TOKEN_RATE};
use crate::domain::{DomainError, TokenPricing};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub embedding: EmbeddingConfig,
    pub evaluation: EvaluationConfig,
    pub comparison: ComparisonConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    Local,
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    /// Model name; the provider's default when unset
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Vector size of the local embedder
    pub dimensions: usize,
    /// Bound on each embedding call before the neutral score is used
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub prompt_token_rate: f64,
    pub completion_token_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Mean difference below which variants tie, on the metric's own scale
    pub tie_tolerance: f64,
    /// p-value threshold reported alongside results
    pub significance_level: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bound on every store call made by the services
    pub timeout_ms: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: None,
            api_key: None,
            base_url: None,
            dimensions: 384,
            timeout_ms: 2_000,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            prompt_token_rate: DEFAULT_PROMPT_TOKEN_RATE,
            completion_token_rate: DEFAULT_COMPLETION_TOKEN_RATE,
        }
    }
}

impl EvaluationConfig {
    pub fn pricing(&self) -> TokenPricing {
        TokenPricing::new(self.prompt_token_rate, self.completion_token_rate)
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            tie_tolerance: 0.01,
            significance_level: 0.05,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { timeout_ms: 1_000 }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("FLOW_EVAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject values no component can run with
    pub fn validate(&self) -> Result<(), DomainError> {
        self.evaluation.pricing().validate()?;

        if self.embedding.timeout_ms == 0 {
            return Err(DomainError::configuration(
                "embedding.timeout_ms must be greater than 0",
            ));
        }

        if self.embedding.provider == EmbeddingProviderKind::Local && self.embedding.dimensions == 0
        {
            return Err(DomainError::configuration(
                "embedding.dimensions must be greater than 0",
            ));
        }

        if self.storage.timeout_ms == 0 {
            return Err(DomainError::configuration(
                "storage.timeout_ms must be greater than 0",
            ));
        }

        let tolerance = self.comparison.tie_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(DomainError::configuration(format!(
                "comparison.tie_tolerance must be a finite non-negative number, got {}",
                tolerance
            )));
        }

        let level = self.comparison.significance_level;
        if !(level > 0.0 && level < 1.0) {
            return Err(DomainError::configuration(format!(
                "comparison.significance_level must be within (0, 1), got {}",
                level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.embedding.provider, EmbeddingProviderKind::Local);
        assert_eq!(config.comparison.tie_tolerance, 0.01);
        assert_eq!(config.comparison.significance_level, 0.05);
        assert_eq!(config.evaluation.prompt_token_rate, 0.000_03);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_deserialize_with_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "embedding": { "provider": "openai", "api_key": "sk-test" },
            "comparison": { "tie_tolerance": 0.05 }
        }))
        .unwrap();

        assert_eq!(config.embedding.provider, EmbeddingProviderKind::OpenAi);
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.embedding.timeout_ms, 2_000);
        assert_eq!(config.comparison.tie_tolerance, 0.05);
        assert_eq!(config.comparison.significance_level, 0.05);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.evaluation.prompt_token_rate = -1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.embedding.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.comparison.significance_level = 1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.comparison.tie_tolerance = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_pricing_from_config() {
        let config = EvaluationConfig {
            prompt_token_rate: 0.001,
            completion_token_rate: 0.002,
        };
        let pricing = config.pricing();
        assert_eq!(pricing.prompt_token_rate, 0.001);
        assert_eq!(pricing.completion_token_rate, 0.002);
    }
}
