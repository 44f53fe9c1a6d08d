//! Per-response evaluation metrics

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DomainError;

/// Lowest value on the user satisfaction rating scale
pub const MIN_SATISFACTION: f64 = 1.0;

/// Highest value on the user satisfaction rating scale
pub const MAX_SATISFACTION: f64 = 5.0;

/// Validation errors for caller-supplied metric values
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricsValidationError {
    #[error("{0} must be a finite number")]
    NonFinite(String),

    #[error("{0} cannot be negative, got {1}")]
    Negative(String, f64),

    #[error("{metric} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        metric: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Custom metric name cannot be empty")]
    EmptyCustomMetricName,
}

impl From<MetricsValidationError> for DomainError {
    fn from(error: MetricsValidationError) -> Self {
        DomainError::validation(error.to_string())
    }
}

fn check_range(metric: &str, value: f64, min: f64, max: f64) -> Result<(), MetricsValidationError> {
    if !value.is_finite() {
        return Err(MetricsValidationError::NonFinite(metric.to_string()));
    }

    if value < min || value > max {
        return Err(MetricsValidationError::OutOfRange {
            metric: metric.to_string(),
            value,
            min,
            max,
        });
    }

    Ok(())
}

/// Validate an observed latency in milliseconds
pub fn validate_latency(latency_ms: f64) -> Result<(), MetricsValidationError> {
    if !latency_ms.is_finite() {
        return Err(MetricsValidationError::NonFinite("latency_ms".to_string()));
    }

    if latency_ms < 0.0 {
        return Err(MetricsValidationError::Negative(
            "latency_ms".to_string(),
            latency_ms,
        ));
    }

    Ok(())
}

/// Validate a set of custom metrics
pub fn validate_custom_metrics(
    metrics: &BTreeMap<String, f64>,
) -> Result<(), MetricsValidationError> {
    for (name, value) in metrics {
        if name.trim().is_empty() {
            return Err(MetricsValidationError::EmptyCustomMetricName);
        }

        if !value.is_finite() {
            return Err(MetricsValidationError::NonFinite(name.clone()));
        }
    }

    Ok(())
}

// ============================================================================
// TokenUsage
// ============================================================================

/// Token counts for a single generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens as u64 + self.completion_tokens as u64
    }
}

// ============================================================================
// BusinessMetrics
// ============================================================================

/// Optional business outcome metrics attached by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessMetrics {
    /// 1-5 rating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_satisfaction: Option<f64>,
    /// 0-1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_completion_rate: Option<f64>,
    /// 0-1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_rate: Option<f64>,
}

impl BusinessMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_satisfaction(mut self, value: f64) -> Self {
        self.user_satisfaction = Some(value);
        self
    }

    pub fn with_task_completion_rate(mut self, value: f64) -> Self {
        self.task_completion_rate = Some(value);
        self
    }

    pub fn with_conversion_rate(mut self, value: f64) -> Self {
        self.conversion_rate = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_satisfaction.is_none()
            && self.task_completion_rate.is_none()
            && self.conversion_rate.is_none()
    }

    /// Check every present value against its scale
    pub fn validate(&self) -> Result<(), MetricsValidationError> {
        if let Some(value) = self.user_satisfaction {
            check_range("user_satisfaction", value, MIN_SATISFACTION, MAX_SATISFACTION)?;
        }

        if let Some(value) = self.task_completion_rate {
            check_range("task_completion_rate", value, 0.0, 1.0)?;
        }

        if let Some(value) = self.conversion_rate {
            check_range("conversion_rate", value, 0.0, 1.0)?;
        }

        Ok(())
    }
}

// ============================================================================
// SuccessMetric
// ============================================================================

/// Name of the metric an experiment is judged on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SuccessMetric {
    CoherenceScore,
    RelevanceScore,
    FactualAccuracy,
    #[default]
    UserSatisfaction,
    TaskCompletionRate,
    ConversionRate,
    LatencyMs,
    Cost,
    /// A caller-defined entry of `custom_metrics`
    Custom(String),
}

impl SuccessMetric {
    /// Resolve a metric name; unknown names refer to custom metrics
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "coherence_score" => Self::CoherenceScore,
            "relevance_score" => Self::RelevanceScore,
            "factual_accuracy" => Self::FactualAccuracy,
            "user_satisfaction" => Self::UserSatisfaction,
            "task_completion_rate" => Self::TaskCompletionRate,
            "conversion_rate" => Self::ConversionRate,
            "latency_ms" => Self::LatencyMs,
            "cost" => Self::Cost,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::CoherenceScore => "coherence_score",
            Self::RelevanceScore => "relevance_score",
            Self::FactualAccuracy => "factual_accuracy",
            Self::UserSatisfaction => "user_satisfaction",
            Self::TaskCompletionRate => "task_completion_rate",
            Self::ConversionRate => "conversion_rate",
            Self::LatencyMs => "latency_ms",
            Self::Cost => "cost",
            Self::Custom(name) => name,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl From<String> for SuccessMetric {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for SuccessMetric {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<SuccessMetric> for String {
    fn from(metric: SuccessMetric) -> Self {
        metric.as_str().to_string()
    }
}

impl fmt::Display for SuccessMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// EvaluationMetrics
// ============================================================================

/// Quality and performance record for one prompt/response pair.
///
/// Built once by the evaluator and never mutated afterwards; there are no setters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    latency_ms: f64,
    token_usage: TokenUsage,
    cost: f64,
    coherence_score: f64,
    relevance_score: f64,
    /// Absent when no expected output was supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    factual_accuracy: Option<f64>,
    #[serde(flatten)]
    business: BusinessMetrics,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    custom_metrics: BTreeMap<String, f64>,
}

impl EvaluationMetrics {
    /// Create a new record; probability-scale scores are clamped to [0, 1]
    pub fn new(
        latency_ms: f64,
        token_usage: TokenUsage,
        cost: f64,
        coherence_score: f64,
        relevance_score: f64,
    ) -> Self {
        Self {
            latency_ms: latency_ms.max(0.0),
            token_usage,
            cost: cost.max(0.0),
            coherence_score: clamp_unit(coherence_score),
            relevance_score: clamp_unit(relevance_score),
            factual_accuracy: None,
            business: BusinessMetrics::default(),
            custom_metrics: BTreeMap::new(),
        }
    }

    pub fn with_factual_accuracy(mut self, accuracy: f64) -> Self {
        self.factual_accuracy = Some(clamp_unit(accuracy));
        self
    }

    pub fn with_business(mut self, business: BusinessMetrics) -> Self {
        self.business = business;
        self
    }

    pub fn with_custom_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.custom_metrics.insert(name.into(), value);
        self
    }

    pub fn with_custom_metrics(mut self, metrics: BTreeMap<String, f64>) -> Self {
        self.custom_metrics.extend(metrics);
        self
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency_ms
    }

    pub fn token_usage(&self) -> TokenUsage {
        self.token_usage
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn coherence_score(&self) -> f64 {
        self.coherence_score
    }

    pub fn relevance_score(&self) -> f64 {
        self.relevance_score
    }

    pub fn factual_accuracy(&self) -> Option<f64> {
        self.factual_accuracy
    }

    pub fn business(&self) -> &BusinessMetrics {
        &self.business
    }

    pub fn user_satisfaction(&self) -> Option<f64> {
        self.business.user_satisfaction
    }

    pub fn custom_metrics(&self) -> &BTreeMap<String, f64> {
        &self.custom_metrics
    }

    pub fn custom_metric(&self, name: &str) -> Option<f64> {
        self.custom_metrics.get(name).copied()
    }

    /// Value of the named metric, if this record carries it
    pub fn value_of(&self, metric: &SuccessMetric) -> Option<f64> {
        match metric {
            SuccessMetric::CoherenceScore => Some(self.coherence_score),
            SuccessMetric::RelevanceScore => Some(self.relevance_score),
            SuccessMetric::FactualAccuracy => self.factual_accuracy,
            SuccessMetric::UserSatisfaction => self.business.user_satisfaction,
            SuccessMetric::TaskCompletionRate => self.business.task_completion_rate,
            SuccessMetric::ConversionRate => self.business.conversion_rate,
            SuccessMetric::LatencyMs => Some(self.latency_ms),
            SuccessMetric::Cost => Some(self.cost),
            SuccessMetric::Custom(name) => self.custom_metric(name),
        }
    }

    /// Field-wise mean across a set of records.
    ///
    /// Optional fields average over the records that carry them and stay absent
    /// when none do. Token counts are rounded to the nearest integer.
    pub fn mean_of<'a, I>(samples: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a EvaluationMetrics>,
    {
        let mut count = 0usize;
        let mut latency = 0.0;
        let mut prompt_tokens = 0.0;
        let mut completion_tokens = 0.0;
        let mut cost = 0.0;
        let mut coherence = 0.0;
        let mut relevance = 0.0;
        let mut accuracy = RunningMean::default();
        let mut satisfaction = RunningMean::default();
        let mut completion_rate = RunningMean::default();
        let mut conversion = RunningMean::default();
        let mut custom: BTreeMap<String, RunningMean> = BTreeMap::new();

        for sample in samples {
            count += 1;
            latency += sample.latency_ms;
            prompt_tokens += sample.token_usage.prompt_tokens as f64;
            completion_tokens += sample.token_usage.completion_tokens as f64;
            cost += sample.cost;
            coherence += sample.coherence_score;
            relevance += sample.relevance_score;
            accuracy.push(sample.factual_accuracy);
            satisfaction.push(sample.business.user_satisfaction);
            completion_rate.push(sample.business.task_completion_rate);
            conversion.push(sample.business.conversion_rate);

            for (name, value) in &sample.custom_metrics {
                custom.entry(name.clone()).or_default().push(Some(*value));
            }
        }

        if count == 0 {
            return None;
        }

        let n = count as f64;

        Some(Self {
            latency_ms: latency / n,
            token_usage: TokenUsage::new(
                (prompt_tokens / n).round() as u32,
                (completion_tokens / n).round() as u32,
            ),
            cost: cost / n,
            coherence_score: coherence / n,
            relevance_score: relevance / n,
            factual_accuracy: accuracy.mean(),
            business: BusinessMetrics {
                user_satisfaction: satisfaction.mean(),
                task_completion_rate: completion_rate.mean(),
                conversion_rate: conversion.mean(),
            },
            custom_metrics: custom
                .into_iter()
                .filter_map(|(name, mean)| mean.mean().map(|m| (name, m)))
                .collect(),
        })
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[derive(Debug, Default)]
struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(coherence: f64, latency: f64) -> EvaluationMetrics {
        EvaluationMetrics::new(latency, TokenUsage::new(10, 20), 0.002, coherence, 0.5)
    }

    mod success_metric_tests {
        use super::*;

        #[test]
        fn test_parse_known_names() {
            assert_eq!(
                SuccessMetric::parse("coherence_score"),
                SuccessMetric::CoherenceScore
            );
            assert_eq!(SuccessMetric::parse("cost"), SuccessMetric::Cost);
            assert_eq!(
                SuccessMetric::parse("thumbs_up"),
                SuccessMetric::Custom("thumbs_up".to_string())
            );
        }

        #[test]
        fn test_default_is_user_satisfaction() {
            assert_eq!(SuccessMetric::default(), SuccessMetric::UserSatisfaction);
        }

        #[test]
        fn test_serializes_as_plain_string() {
            let json = serde_json::to_string(&SuccessMetric::RelevanceScore).unwrap();
            assert_eq!(json, "\"relevance_score\"");

            let parsed: SuccessMetric = serde_json::from_str("\"my_metric\"").unwrap();
            assert_eq!(parsed, SuccessMetric::Custom("my_metric".to_string()));
        }
    }

    mod evaluation_metrics_tests {
        use super::*;

        #[test]
        fn test_scores_are_clamped() {
            let metrics = EvaluationMetrics::new(-5.0, TokenUsage::default(), -1.0, 1.2, -0.3)
                .with_factual_accuracy(f64::NAN);

            assert_eq!(metrics.latency_ms(), 0.0);
            assert_eq!(metrics.cost(), 0.0);
            assert_eq!(metrics.coherence_score(), 1.0);
            assert_eq!(metrics.relevance_score(), 0.0);
            assert_eq!(metrics.factual_accuracy(), Some(0.0));
        }

        #[test]
        fn test_value_of() {
            let metrics = sample(0.7, 120.0)
                .with_business(BusinessMetrics::new().with_user_satisfaction(4.0))
                .with_custom_metric("thumbs_up", 1.0);

            assert_eq!(metrics.value_of(&SuccessMetric::CoherenceScore), Some(0.7));
            assert_eq!(metrics.value_of(&SuccessMetric::LatencyMs), Some(120.0));
            assert_eq!(metrics.value_of(&SuccessMetric::UserSatisfaction), Some(4.0));
            assert_eq!(metrics.value_of(&SuccessMetric::FactualAccuracy), None);
            assert_eq!(metrics.value_of(&SuccessMetric::parse("thumbs_up")), Some(1.0));
            assert_eq!(metrics.value_of(&SuccessMetric::parse("missing")), None);
        }

        #[test]
        fn test_factual_accuracy_absent_is_not_serialized() {
            let json = serde_json::to_value(sample(0.5, 10.0)).unwrap();
            assert!(json.get("factual_accuracy").is_none());
            assert!(json.get("user_satisfaction").is_none());
            assert_eq!(json["token_usage"]["prompt_tokens"], 10);
        }

        #[test]
        fn test_mean_of_empty_is_none() {
            let empty: Vec<EvaluationMetrics> = Vec::new();
            assert!(EvaluationMetrics::mean_of(&empty).is_none());
        }

        #[test]
        fn test_mean_of() {
            let samples = vec![
                sample(0.6, 100.0)
                    .with_factual_accuracy(0.8)
                    .with_custom_metric("clicks", 2.0),
                sample(0.8, 200.0)
                    .with_business(BusinessMetrics::new().with_user_satisfaction(5.0)),
            ];

            let mean = EvaluationMetrics::mean_of(&samples).unwrap();

            assert!((mean.coherence_score() - 0.7).abs() < 1e-9);
            assert!((mean.latency_ms() - 150.0).abs() < 1e-9);
            assert_eq!(mean.token_usage(), TokenUsage::new(10, 20));
            // Optional fields average only over records that carry them
            assert_eq!(mean.factual_accuracy(), Some(0.8));
            assert_eq!(mean.user_satisfaction(), Some(5.0));
            assert_eq!(mean.business().conversion_rate, None);
            assert_eq!(mean.custom_metric("clicks"), Some(2.0));
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_business_metric_ranges() {
            assert!(BusinessMetrics::new()
                .with_user_satisfaction(3.5)
                .with_conversion_rate(0.2)
                .validate()
                .is_ok());

            assert!(BusinessMetrics::new()
                .with_user_satisfaction(0.5)
                .validate()
                .is_err());
            assert!(BusinessMetrics::new()
                .with_task_completion_rate(1.1)
                .validate()
                .is_err());
            assert!(BusinessMetrics::new()
                .with_conversion_rate(f64::NAN)
                .validate()
                .is_err());
        }

        #[test]
        fn test_latency_validation() {
            assert!(validate_latency(0.0).is_ok());
            assert!(validate_latency(-1.0).is_err());
            assert!(validate_latency(f64::INFINITY).is_err());
        }

        #[test]
        fn test_custom_metric_validation() {
            let mut metrics = BTreeMap::new();
            metrics.insert("ok".to_string(), 1.0);
            assert!(validate_custom_metrics(&metrics).is_ok());

            metrics.insert(" ".to_string(), 1.0);
            assert_eq!(
                validate_custom_metrics(&metrics),
                Err(MetricsValidationError::EmptyCustomMetricName)
            );
        }
    }
}
