//! Experiment result types for comparison and progress reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::{ExperimentId, ExperimentStatus, Variant};
use crate::domain::evaluation::{EvaluationMetrics, SuccessMetric};

// ============================================================================
// Winner
// ============================================================================

/// Outcome of comparing two variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    A,
    B,
    /// Means within the tie tolerance
    Tie,
    /// Not enough usable data to say anything
    Undetermined,
}

impl Winner {
    /// The winning variant, if there is one
    pub fn variant(&self) -> Option<Variant> {
        match self {
            Self::A => Some(Variant::A),
            Self::B => Some(Variant::B),
            Self::Tie | Self::Undetermined => None,
        }
    }
}

impl From<Variant> for Winner {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::A => Self::A,
            Variant::B => Self::B,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::Tie => write!(f, "Tie"),
            Self::Undetermined => write!(f, "Undetermined"),
        }
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// Verdict of the statistical comparison of two score sequences
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Two-sided p-value; 1.0 means no evidence of a difference
    pub significance: f64,
    pub winner: Winner,
    /// Relative difference against the losing mean, in percent.
    /// `None` only when the winner is undetermined.
    pub improvement_percentage: Option<f64>,
}

impl Comparison {
    /// The conservative verdict produced for degenerate input
    pub fn undetermined() -> Self {
        Self {
            significance: 1.0,
            winner: Winner::Undetermined,
            improvement_percentage: None,
        }
    }

    pub fn tie(significance: f64) -> Self {
        Self {
            significance,
            winner: Winner::Tie,
            improvement_percentage: Some(0.0),
        }
    }

    pub fn decided(winner: Variant, significance: f64, improvement_percentage: f64) -> Self {
        Self {
            significance,
            winner: winner.into(),
            improvement_percentage: Some(improvement_percentage),
        }
    }

    /// Whether a variant won with a p-value below the given level
    pub fn is_significant(&self, significance_level: f64) -> bool {
        self.winner.variant().is_some() && self.significance < significance_level
    }
}

// ============================================================================
// VariantSummary
// ============================================================================

/// Aggregate view of one variant's samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSummary {
    pub variant: Variant,
    pub sample_count: usize,
    /// Field-wise mean of the samples; absent when there are none
    pub metrics: Option<EvaluationMetrics>,
}

impl VariantSummary {
    pub fn from_samples<'a, I>(variant: Variant, samples: I) -> Self
    where
        I: IntoIterator<Item = &'a EvaluationMetrics>,
        I::IntoIter: Clone,
    {
        let iter = samples.into_iter();
        Self {
            variant,
            sample_count: iter.clone().count(),
            metrics: EvaluationMetrics::mean_of(iter),
        }
    }
}

// ============================================================================
// ABTestResult
// ============================================================================

/// Recomputed-on-demand verdict for an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ABTestResult {
    pub experiment_id: ExperimentId,
    /// Metric the verdict was computed on
    pub success_metric: SuccessMetric,
    pub variant_a: VariantSummary,
    pub variant_b: VariantSummary,
    /// Total samples across both variants at computation time
    pub sample_size: usize,
    pub significance: f64,
    pub winner: Winner,
    pub improvement_percentage: Option<f64>,
    /// Threshold used by `is_significant`
    pub significance_level: f64,
    pub computed_at: DateTime<Utc>,
}

impl ABTestResult {
    pub fn new(
        experiment_id: ExperimentId,
        success_metric: SuccessMetric,
        variant_a: VariantSummary,
        variant_b: VariantSummary,
        comparison: Comparison,
        significance_level: f64,
    ) -> Self {
        Self {
            experiment_id,
            success_metric,
            sample_size: variant_a.sample_count + variant_b.sample_count,
            variant_a,
            variant_b,
            significance: comparison.significance,
            winner: comparison.winner,
            improvement_percentage: comparison.improvement_percentage,
            significance_level,
            computed_at: Utc::now(),
        }
    }

    pub fn comparison(&self) -> Comparison {
        Comparison {
            significance: self.significance,
            winner: self.winner,
            improvement_percentage: self.improvement_percentage,
        }
    }

    pub fn is_significant(&self) -> bool {
        self.comparison().is_significant(self.significance_level)
    }

    pub fn summary(&self, variant: Variant) -> &VariantSummary {
        match variant {
            Variant::A => &self.variant_a,
            Variant::B => &self.variant_b,
        }
    }
}

// ============================================================================
// ExperimentProgress
// ============================================================================

/// Counters an external scheduler uses to decide when to complete an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentProgress {
    pub experiment_id: ExperimentId,
    pub status: ExperimentStatus,
    pub samples_a: usize,
    pub samples_b: usize,
    /// Sessions routed to each variant, whether or not they produced a sample
    pub assignments_a: usize,
    pub assignments_b: usize,
    pub minimum_sample_size: u32,
    pub elapsed_days: f64,
    pub max_duration_days: u32,
}

impl ExperimentProgress {
    pub fn sample_size(&self) -> usize {
        self.samples_a + self.samples_b
    }

    pub fn minimum_sample_size_reached(&self) -> bool {
        self.sample_size() >= self.minimum_sample_size as usize
    }

    pub fn max_duration_exceeded(&self) -> bool {
        self.elapsed_days >= self.max_duration_days as f64
    }
}

// ============================================================================
// Dashboard
// ============================================================================

/// One row of the dashboard: a metric compared across variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: SuccessMetric,
    pub mean_a: Option<f64>,
    pub mean_b: Option<f64>,
    pub comparison: Comparison,
}

/// Per-metric overview of an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDashboard {
    pub experiment_id: ExperimentId,
    pub name: String,
    pub progress: ExperimentProgress,
    pub metrics: Vec<MetricComparison>,
    pub computed_at: DateTime<Utc>,
}

impl ExperimentDashboard {
    pub fn metric(&self, metric: &SuccessMetric) -> Option<&MetricComparison> {
        self.metrics.iter().find(|row| &row.metric == metric)
    }
}
