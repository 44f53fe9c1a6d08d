//! Statistical comparison of experiment variants
//!
//! Two-sided Student's t-test with pooled variance, plus the winner and
//! improvement policy built on top of it.

use tracing::{debug, warn};

use crate::config::ComparisonConfig;
use crate::domain::experiment::{Comparison, Variant};

/// Default mean difference below which two variants tie
pub const DEFAULT_TIE_TOLERANCE: f64 = 0.01;

/// Default p-value threshold for `is_significant`
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

const LANCZOS_G: f64 = 7.0;

const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const BETA_MAX_ITERATIONS: usize = 300;
const BETA_EPSILON: f64 = 1e-14;
const BETA_TINY: f64 = 1e-300;

/// Calculate mean of a sample
pub fn mean(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    sample.iter().sum::<f64>() / sample.len() as f64
}

/// Calculate variance of a sample (sample variance, n-1 denominator)
pub fn variance(sample: &[f64]) -> f64 {
    if sample.len() < 2 {
        return 0.0;
    }

    let m = mean(sample);
    let n = sample.len() as f64;
    sample.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1.0)
}

/// Two-sided p-value of the equal-variance two-sample t-test.
///
/// Returns `None` when the test is undefined: fewer than two observations on
/// either side, or zero pooled variance.
pub fn student_t_test(sample1: &[f64], sample2: &[f64]) -> Option<f64> {
    if sample1.len() < 2 || sample2.len() < 2 {
        return None;
    }

    let n1 = sample1.len() as f64;
    let n2 = sample2.len() as f64;
    let df = n1 + n2 - 2.0;

    let pooled = ((n1 - 1.0) * variance(sample1) + (n2 - 1.0) * variance(sample2)) / df;
    let se = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();

    if se == 0.0 || !se.is_finite() {
        return None;
    }

    let t = (mean(sample1) - mean(sample2)) / se;

    student_t_two_sided_p(t, df)
}

/// P(|T| >= |t|) for Student's t distribution with `df` degrees of freedom
pub fn student_t_two_sided_p(t: f64, df: f64) -> Option<f64> {
    if !t.is_finite() || !(df > 0.0) {
        return None;
    }

    let x = df / (df + t * t);
    regularized_incomplete_beta(df / 2.0, 0.5, x).map(|p| p.clamp(0.0, 1.0))
}

/// Natural log of the gamma function for positive arguments (Lanczos)
fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    let series = LANCZOS_COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS_COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64));

    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// Regularized incomplete beta function I_x(a, b)
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&x) || a <= 0.0 || b <= 0.0 {
        return None;
    }
    if x == 0.0 {
        return Some(0.0);
    }
    if x == 1.0 {
        return Some(1.0);
    }

    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // The continued fraction converges quickly only on this side of the mean
    if x < (a + 1.0) / (a + b + 2.0) {
        Some(front * beta_continued_fraction(a, b, x)? / a)
    } else {
        Some(1.0 - front * beta_continued_fraction(b, a, 1.0 - x)? / b)
    }
}

/// Modified Lentz evaluation of the incomplete beta continued fraction
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> Option<f64> {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let guard = |v: f64| if v.abs() < BETA_TINY { BETA_TINY } else { v };

    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=BETA_MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < BETA_EPSILON {
            return Some(h);
        }
    }

    None
}

// ============================================================================
// StatisticalComparator
// ============================================================================

/// Thresholds used by the comparator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparatorConfig {
    pub tie_tolerance: f64,
    pub significance_level: f64,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            tie_tolerance: DEFAULT_TIE_TOLERANCE,
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
        }
    }
}

impl From<&ComparisonConfig> for ComparatorConfig {
    fn from(config: &ComparisonConfig) -> Self {
        Self {
            tie_tolerance: config.tie_tolerance,
            significance_level: config.significance_level,
        }
    }
}

/// Decides between two score sequences. Never fails: degenerate input yields
/// an undetermined verdict with significance 1.0.
#[derive(Debug, Clone, Default)]
pub struct StatisticalComparator {
    config: ComparatorConfig,
}

impl StatisticalComparator {
    pub fn new(config: ComparatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Compare using the configured tie tolerance
    pub fn compare(&self, samples_a: &[f64], samples_b: &[f64]) -> Comparison {
        self.compare_with_tolerance(samples_a, samples_b, self.config.tie_tolerance)
    }

    /// Compare with an explicit tie tolerance on the scores' own scale
    pub fn compare_with_tolerance(
        &self,
        samples_a: &[f64],
        samples_b: &[f64],
        tie_tolerance: f64,
    ) -> Comparison {
        let a: Vec<f64> = samples_a.iter().copied().filter(|v| v.is_finite()).collect();
        let b: Vec<f64> = samples_b.iter().copied().filter(|v| v.is_finite()).collect();

        if a.len() != samples_a.len() || b.len() != samples_b.len() {
            warn!(
                dropped = (samples_a.len() - a.len()) + (samples_b.len() - b.len()),
                "Ignoring non-finite scores"
            );
        }

        if a.is_empty() || b.is_empty() {
            debug!(n_a = a.len(), n_b = b.len(), "Comparison undetermined: empty variant");
            return Comparison::undetermined();
        }

        let mean_a = mean(&a);
        let mean_b = mean(&b);
        let p_value = student_t_test(&a, &b);

        if (mean_a - mean_b).abs() < tie_tolerance {
            return Comparison::tie(p_value.unwrap_or(1.0));
        }

        if a.len() < 2 || b.len() < 2 {
            debug!(n_a = a.len(), n_b = b.len(), "Comparison undetermined: too few samples");
            return Comparison::undetermined();
        }

        let (winner, winner_mean, loser_mean) = if mean_b > mean_a {
            (Variant::B, mean_b, mean_a)
        } else {
            (Variant::A, mean_a, mean_b)
        };

        let improvement = (winner_mean - loser_mean) / loser_mean.abs() * 100.0;

        if !improvement.is_finite() {
            warn!(
                mean_a,
                mean_b, "Comparison undetermined: improvement undefined for losing mean"
            );
            return Comparison::undetermined();
        }

        let significance = p_value.unwrap_or_else(|| {
            warn!(mean_a, mean_b, "t-test undefined (zero variance); reporting no evidence");
            1.0
        });

        debug!(
            winner = %winner,
            mean_a,
            mean_b,
            significance,
            improvement,
            "Variants compared"
        );

        Comparison::decided(winner, significance, improvement)
    }
}
