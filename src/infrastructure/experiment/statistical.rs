//! Statistical helpers for comparing experiment variants
//!
//! An optional Welch's t-test callers can layer on top of a comparison report.

use crate::domain::experiment::{mean, variance, StatisticalSignificance};

/// Outcome of a Welch's t-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchTest {
    /// t-statistic (baseline minus candidate)
    pub t_stat: f64,
    /// Welch–Satterthwaite degrees of freedom
    pub degrees_of_freedom: f64,
    /// Two-tailed p-value estimate
    pub p_value: f64,
}

/// Welch's t-test for two independent samples with possibly unequal variances
///
/// Returns `None` when either sample has fewer than two values or both are
/// constant.
pub fn welch_t_test(baseline: &[f64], candidate: &[f64]) -> Option<WelchTest> {
    if baseline.len() < 2 || candidate.len() < 2 {
        return None;
    }

    let n1 = baseline.len() as f64;
    let n2 = candidate.len() as f64;

    let se1 = variance(baseline) / n1;
    let se2 = variance(candidate) / n2;
    let se = (se1 + se2).sqrt();

    if se == 0.0 {
        return None;
    }

    let t_stat = (mean(baseline) - mean(candidate)) / se;

    let df_denom = se1.powi(2) / (n1 - 1.0) + se2.powi(2) / (n2 - 1.0);

    if df_denom == 0.0 {
        return None;
    }

    let degrees_of_freedom = (se1 + se2).powi(2) / df_denom;

    Some(WelchTest {
        t_stat,
        degrees_of_freedom,
        p_value: two_tailed_p_value(t_stat.abs(), degrees_of_freedom),
    })
}

/// Compare one metric of two variants with Welch's t-test
///
/// Returns `None` when the samples are too small for the test.
pub fn calculate_significance(
    baseline_samples: &[f64],
    candidate_samples: &[f64],
    baseline_id: &str,
    candidate_id: &str,
    metric: &str,
    confidence_level: f64,
) -> Option<StatisticalSignificance> {
    let test = welch_t_test(baseline_samples, candidate_samples)?;

    Some(StatisticalSignificance::new(
        test.p_value,
        confidence_level,
        baseline_id,
        candidate_id,
        metric,
        mean(baseline_samples),
        mean(candidate_samples),
    ))
}

/// Normal approximation of the two-tailed p-value, with a small-df correction
fn two_tailed_p_value(t: f64, df: f64) -> f64 {
    let z = if df > 30.0 {
        t
    } else {
        t * (1.0 - 1.0 / (4.0 * df)).sqrt()
    };

    (2.0 * (1.0 - normal_cdf(z))).clamp(0.0, 1.0)
}

/// Standard normal cumulative distribution function
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Abramowitz–Stegun 7.1.26 approximation of the error function (|ε| < 1.5e-7)
fn erf(x: f64) -> f64 {
    const A: [f64; 5] = [
        0.254829592,
        -0.284496736,
        1.421413741,
        -1.453152027,
        1.061405429,
    ];
    const P: f64 = 0.3275911;

    let sign = x.signum();
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let poly = A.iter().rev().fold(0.0, |acc, a| acc * t + a) * t;

    sign * (1.0 - poly * (-x * x).exp())
}
