//! Maximum-Sharpe mean-variance allocation under box and budget constraints.

use super::stats::{covariance_matrix, dot, mat_vec, mean, symmetric_eigenvalues, Matrix};
use super::{project_capped_simplex, MarkowitzConfig, ReturnMatrix};
use crate::domain::error::{RankfolioError, Result};
use tracing::{debug, warn};

const ARMIJO_C: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;
const MAX_STEP: f64 = 1e6;

fn infeasible(reason: impl Into<String>) -> RankfolioError {
    RankfolioError::OptimizationInfeasible {
        reason: reason.into(),
    }
}

fn condition_ratio(cov: &Matrix) -> f64 {
    let eigen = symmetric_eigenvalues(cov);
    match (eigen.first(), eigen.last()) {
        (Some(&min), Some(&max)) if max > 0.0 => min / max,
        _ => 0.0,
    }
}

fn submatrix(cov: &Matrix, keep: &[usize]) -> Matrix {
    keep.iter()
        .map(|&i| keep.iter().map(|&j| cov[i][j]).collect())
        .collect()
}

fn shrink(cov: &Matrix, delta: f64) -> Matrix {
    cov.iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, v)| if i == j { *v } else { (1.0 - delta) * v })
                .collect()
        })
        .collect()
}

struct Objective<'a> {
    mu: &'a [f64],
    cov: &'a Matrix,
    rf: f64,
}

impl Objective<'_> {
    fn sharpe(&self, w: &[f64]) -> f64 {
        let var = dot(w, &mat_vec(self.cov, w));
        if var <= 0.0 {
            return f64::NEG_INFINITY;
        }
        (dot(self.mu, w) - self.rf) / var.sqrt()
    }

    /// ∇S = μ/σ - (μ·w - rf)·Σw/σ³
    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let sw = mat_vec(self.cov, w);
        let var = dot(w, &sw);
        let sigma = var.sqrt();
        let excess = dot(self.mu, w) - self.rf;
        self.mu
            .iter()
            .zip(&sw)
            .map(|(m, s)| m / sigma - excess * s / (var * sigma))
            .collect()
    }
}

/// Projected-gradient ascent with Armijo backtracking from one start.
fn ascend(
    start: Vec<f64>,
    objective: &Objective<'_>,
    matrix: &ReturnMatrix<'_>,
    cfg: &MarkowitzConfig,
) -> (Vec<f64>, f64) {
    let mut w = start;
    let mut value = objective.sharpe(&w);
    let mut step = 1.0;

    for _ in 0..cfg.max_iterations {
        let grad = objective.gradient(&w);
        let mut accepted = None;

        for _ in 0..MAX_BACKTRACKS {
            let trial: Vec<f64> = w.iter().zip(&grad).map(|(x, g)| x + step * g).collect();
            let candidate = project_capped_simplex(&trial, &matrix.bounds);
            let moved: Vec<f64> = candidate.iter().zip(&w).map(|(a, b)| a - b).collect();
            let candidate_value = objective.sharpe(&candidate);
            if candidate_value >= value + ARMIJO_C * dot(&grad, &moved) {
                accepted = Some((candidate, candidate_value));
                break;
            }
            step *= 0.5;
        }

        let Some((next, next_value)) = accepted else {
            break;
        };
        let improvement = next_value - value;
        w = next;
        value = next_value;
        if improvement.abs() <= cfg.tolerance {
            break;
        }
        step = (step * 2.0).min(MAX_STEP);
    }
    (w, value)
}

pub fn optimize(
    matrix: &ReturnMatrix<'_>,
    cfg: &MarkowitzConfig,
    variance_floor: f64,
) -> Result<Vec<f64>> {
    let n = matrix.len();
    let mut cov = covariance_matrix(&matrix.series);

    let active: Vec<usize> = (0..n).filter(|&i| cov[i][i] > variance_floor).collect();
    if active.is_empty() {
        return Err(infeasible("degenerate covariance: every instrument has zero variance"));
    }
    if active.len() < n {
        debug!(
            flat = n - active.len(),
            instruments = n,
            "zero-variance instruments carry no risk term"
        );
    }

    let mu: Vec<f64> = matrix.series.iter().map(|s| mean(s)).collect();
    if mu.iter().all(|m| *m <= cfg.risk_free_rate) {
        return Err(infeasible(format!(
            "no instrument has mean return above the risk-free rate {}",
            cfg.risk_free_rate
        )));
    }

    // Flat rows and columns are all zero, so conditioning is judged on the rest.
    let mut ratio = condition_ratio(&submatrix(&cov, &active));
    if ratio < cfg.condition_threshold || matrix.periods() <= active.len() {
        warn!(
            condition = ratio,
            periods = matrix.periods(),
            instruments = active.len(),
            shrinkage = cfg.shrinkage,
            "covariance ill-conditioned, shrinking toward diagonal"
        );
        cov = shrink(&cov, cfg.shrinkage);
        ratio = condition_ratio(&submatrix(&cov, &active));
        if ratio < cfg.condition_threshold {
            return Err(infeasible(format!(
                "covariance condition ratio {ratio:e} below {:e} after shrinkage",
                cfg.condition_threshold
            )));
        }
    }

    let objective = Objective {
        mu: &mu,
        cov: &cov,
        rf: cfg.risk_free_rate,
    };

    let equal = project_capped_simplex(&vec![1.0 / n as f64; n], &matrix.bounds);
    let starts = std::iter::once(equal).chain((0..n).map(|i| {
        let unit: Vec<f64> = (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect();
        project_capped_simplex(&unit, &matrix.bounds)
    }));

    let mut best: Option<(Vec<f64>, f64)> = None;
    // A start holding only flat instruments has no defined gradient.
    for start in starts.filter(|w| objective.sharpe(w).is_finite()) {
        let (w, value) = ascend(start, &objective, matrix, cfg);
        if best.as_ref().is_none_or(|(_, b)| value > *b) {
            best = Some((w, value));
        }
    }

    let (weights, sharpe) = best.ok_or_else(|| infeasible("no starting point"))?;
    if !sharpe.is_finite() {
        return Err(infeasible("no weight vector has finite Sharpe ratio"));
    }

    debug!(sharpe, condition = ratio, "markowitz solution");
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::optimizer::WeightBounds;
    use approx::assert_relative_eq;

    fn matrix<'a>(series: &'a [Vec<f64>], bounds: WeightBounds) -> ReturnMatrix<'a> {
        const CODES: [&str; 4] = ["AAA", "BBB", "CCC", "DDD"];
        ReturnMatrix {
            codes: CODES[..series.len()].to_vec(),
            series: series.iter().map(Vec::as_slice).collect(),
            bounds: vec![bounds; series.len()],
        }
    }

    fn sample() -> Vec<Vec<f64>> {
        vec![
            vec![0.010, 0.020, -0.005, 0.015, 0.008, 0.012, -0.002, 0.018],
            vec![0.004, -0.010, 0.012, 0.003, -0.004, 0.009, 0.006, -0.001],
            vec![0.002, 0.001, 0.003, -0.001, 0.002, 0.000, 0.001, 0.002],
        ]
    }

    #[test]
    fn flat_series_are_infeasible() {
        let series = vec![vec![0.0; 10]; 3];
        let err = optimize(
            &matrix(&series, WeightBounds::default()),
            &MarkowitzConfig::default(),
            1e-12,
        )
        .unwrap_err();
        assert!(matches!(err, RankfolioError::OptimizationInfeasible { .. }));
    }

    #[test]
    fn one_flat_instrument_still_solves() {
        let mut series = sample();
        series[2] = vec![0.0; 8];
        let bounds = WeightBounds { min: 0.0, max: 0.8 };
        let w = optimize(&matrix(&series, bounds), &MarkowitzConfig::default(), 1e-12).unwrap();
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        assert!(w.iter().all(|x| *x >= -1e-9 && *x <= 0.8 + 1e-9));
        assert!(w[0] + w[1] > 0.0);
    }

    #[test]
    fn collinear_series_without_shrinkage_are_infeasible() {
        let a = sample().swap_remove(0);
        let b: Vec<f64> = a.iter().map(|x| 2.0 * x).collect();
        let series = vec![a, b];
        let cfg = MarkowitzConfig {
            shrinkage: 0.0,
            ..MarkowitzConfig::default()
        };
        let err = optimize(&matrix(&series, WeightBounds::default()), &cfg, 1e-12).unwrap_err();
        assert!(
            matches!(err, RankfolioError::OptimizationInfeasible { ref reason } if reason.contains("after shrinkage"))
        );
    }

    #[test]
    fn all_negative_means_are_infeasible() {
        let series = vec![
            vec![-0.01, -0.02, 0.00, -0.01],
            vec![-0.02, 0.01, -0.03, -0.01],
        ];
        let err = optimize(
            &matrix(&series, WeightBounds::default()),
            &MarkowitzConfig::default(),
            1e-12,
        )
        .unwrap_err();
        assert!(matches!(err, RankfolioError::OptimizationInfeasible { .. }));
    }

    #[test]
    fn weights_sum_to_one_within_bounds() {
        let series = sample();
        let bounds = WeightBounds { min: 0.05, max: 0.6 };
        let w = optimize(&matrix(&series, bounds), &MarkowitzConfig::default(), 1e-12).unwrap();
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        assert!(w.iter().all(|x| *x >= 0.05 - 1e-9 && *x <= 0.6 + 1e-9));
    }

    #[test]
    fn solution_beats_equal_weights() {
        let series = sample();
        let m = matrix(&series, WeightBounds::default());
        let cfg = MarkowitzConfig::default();
        let w = optimize(&m, &cfg, 1e-12).unwrap();

        let mu: Vec<f64> = series.iter().map(|s| mean(s)).collect();
        let cov = covariance_matrix(&m.series);
        let objective = Objective {
            mu: &mu,
            cov: &cov,
            rf: 0.0,
        };
        assert!(objective.sharpe(&w) >= objective.sharpe(&[1.0 / 3.0; 3]) - 1e-12);
    }

    #[test]
    fn shrinkage_keeps_variances() {
        let cov = vec![vec![1.0, 0.8], vec![0.8, 2.0]];
        let shrunk = shrink(&cov, 0.25);
        assert_eq!(shrunk[0][0], 1.0);
        assert_eq!(shrunk[1][1], 2.0);
        assert_relative_eq!(shrunk[0][1], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn few_periods_still_solve_with_shrinkage() {
        // two periods for three instruments: sample covariance is singular
        let series = vec![vec![0.01, 0.03], vec![0.02, 0.01], vec![0.00, 0.02]];
        let cfg = MarkowitzConfig {
            shrinkage: 0.5,
            ..MarkowitzConfig::default()
        };
        let w = optimize(&matrix(&series, WeightBounds::default()), &cfg, 1e-12).unwrap();
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn identical_inputs_give_identical_weights() {
        let series = sample();
        let m = matrix(&series, WeightBounds::default());
        let cfg = MarkowitzConfig::default();
        assert_eq!(optimize(&m, &cfg, 1e-12).unwrap(), optimize(&m, &cfg, 1e-12).unwrap());
    }
}
