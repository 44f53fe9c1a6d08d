//! Compare command - runs the statistical comparator over two score files

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::domain::experiment::Comparison;
use crate::infrastructure::experiment::{mean, ComparatorConfig, StatisticalComparator};

/// Arguments for the compare command
#[derive(Args, Clone, Debug)]
pub struct CompareArgs {
    /// JSON file of the form {"variant_a": [..], "variant_b": [..]}
    pub file: PathBuf,

    /// Mean difference below which the variants tie (overrides config)
    #[arg(long)]
    pub tie_tolerance: Option<f64>,
}

/// Score sequences to compare
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreSets {
    pub variant_a: Vec<f64>,
    pub variant_b: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub samples_a: usize,
    pub samples_b: usize,
    pub mean_a: Option<f64>,
    pub mean_b: Option<f64>,
    #[serde(flatten)]
    pub comparison: Comparison,
    pub significance_level: f64,
    pub significant: bool,
}

/// Compare two score sets with the given comparator
pub fn compare_scores(
    comparator: &StatisticalComparator,
    scores: &ScoreSets,
    tie_tolerance: Option<f64>,
) -> CompareReport {
    let tolerance = tie_tolerance.unwrap_or(comparator.config().tie_tolerance);
    let comparison =
        comparator.compare_with_tolerance(&scores.variant_a, &scores.variant_b, tolerance);
    let level = comparator.config().significance_level;

    CompareReport {
        samples_a: scores.variant_a.len(),
        samples_b: scores.variant_b.len(),
        mean_a: (!scores.variant_a.is_empty()).then(|| mean(&scores.variant_a)),
        mean_b: (!scores.variant_b.is_empty()).then(|| mean(&scores.variant_b)),
        significant: comparison.is_significant(level),
        comparison,
        significance_level: level,
    }
}

/// Run the compare command
pub async fn run(args: CompareArgs) -> anyhow::Result<()> {
    let config = super::prepare()?;

    if let Some(tolerance) = args.tie_tolerance {
        anyhow::ensure!(
            tolerance.is_finite() && tolerance >= 0.0,
            "--tie-tolerance must be a finite non-negative number"
        );
    }

    let raw = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let scores: ScoreSets = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid score file {}", args.file.display()))?;

    let comparator = StatisticalComparator::new(ComparatorConfig::from(&config.comparison));
    let report = compare_scores(&comparator, &scores, args.tie_tolerance);

    super::print_json(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::Winner;

    #[test]
    fn test_parse_score_file() {
        let scores: ScoreSets =
            serde_json::from_str(r#"{"variant_a": [0.8, 0.82], "variant_b": [0.9]}"#).unwrap();

        assert_eq!(scores.variant_a, vec![0.8, 0.82]);
        assert_eq!(scores.variant_b, vec![0.9]);
    }

    #[test]
    fn test_report() {
        let scores = ScoreSets {
            variant_a: vec![0.80; 100],
            variant_b: vec![0.85; 100],
        };

        let report = compare_scores(&StatisticalComparator::default(), &scores, None);

        assert_eq!(report.comparison.winner, Winner::B);
        assert!((report.comparison.improvement_percentage.unwrap() - 6.25).abs() < 1e-6);
        assert!((report.mean_b.unwrap() - 0.85).abs() < 1e-9);
        assert_eq!(report.samples_a, 100);
    }

    #[test]
    fn test_report_empty_side() {
        let scores = ScoreSets {
            variant_a: vec![],
            variant_b: vec![0.5],
        };

        let report = compare_scores(&StatisticalComparator::default(), &scores, None);

        assert_eq!(report.comparison.winner, Winner::Undetermined);
        assert!(report.mean_a.is_none());
        assert!(!report.significant);
    }

    #[test]
    fn test_tolerance_override() {
        let scores = ScoreSets {
            variant_a: vec![1.0, 1.1, 0.9],
            variant_b: vec![1.2, 1.3, 1.1],
        };

        let report = compare_scores(&StatisticalComparator::default(), &scores, Some(0.5));
        assert_eq!(report.comparison.winner, Winner::Tie);
    }
}
