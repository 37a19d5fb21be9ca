//! Portfolio weight optimization across the selected strategies.
//!
//! Both methods share input validation, bound feasibility checks and a final
//! verification that weights sum to one and respect every bound. The method
//! is chosen by configuration; a failing method never falls back to the
//! other.

pub mod hrp;
pub mod markowitz;
pub mod stats;

use crate::domain::error::{RankfolioError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
const BOUND_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizerMethod {
    #[default]
    Markowitz,
    Hrp,
}

impl fmt::Display for OptimizerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerMethod::Markowitz => f.write_str("markowitz"),
            OptimizerMethod::Hrp => f.write_str("hrp"),
        }
    }
}

impl FromStr for OptimizerMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markowitz" => Ok(OptimizerMethod::Markowitz),
            "hrp" => Ok(OptimizerMethod::Hrp),
            other => Err(format!("unknown method '{other}', expected markowitz or hrp")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundsConfig {
    pub default: WeightBounds,
    pub per_instrument: BTreeMap<String, WeightBounds>,
}

impl BoundsConfig {
    pub fn for_instrument(&self, code: &str) -> WeightBounds {
        self.per_instrument.get(code).copied().unwrap_or(self.default)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkowitzConfig {
    pub risk_free_rate: f64,
    /// Blend toward the diagonal, `(1 - δ)Σ + δ·diag(Σ)`.
    pub shrinkage: f64,
    /// Smallest/largest eigenvalue ratio below which Σ is ill-conditioned.
    pub condition_threshold: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for MarkowitzConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            shrinkage: 0.25,
            condition_threshold: 1e-10,
            max_iterations: 500,
            tolerance: 1e-10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioConfig {
    pub method: OptimizerMethod,
    pub bounds: BoundsConfig,
    /// Per-period variance at or below which a series counts as flat.
    pub variance_floor: f64,
    pub markowitz: MarkowitzConfig,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            method: OptimizerMethod::default(),
            bounds: BoundsConfig::default(),
            variance_floor: 1e-12,
            markowitz: MarkowitzConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioWeights {
    pub method: OptimizerMethod,
    pub weights: BTreeMap<String, f64>,
}

/// Validated optimizer input in instrument-code order.
pub struct ReturnMatrix<'a> {
    pub codes: Vec<&'a str>,
    pub series: Vec<&'a [f64]>,
    pub bounds: Vec<WeightBounds>,
}

impl ReturnMatrix<'_> {
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn periods(&self) -> usize {
        self.series.first().map_or(0, |s| s.len())
    }
}

fn infeasible(reason: impl Into<String>) -> RankfolioError {
    RankfolioError::OptimizationInfeasible {
        reason: reason.into(),
    }
}

fn validate<'a>(
    returns: &'a BTreeMap<String, Vec<f64>>,
    bounds: &BoundsConfig,
) -> Result<ReturnMatrix<'a>> {
    if returns.is_empty() {
        return Err(infeasible("no return series to allocate"));
    }

    let periods = returns.values().next().map_or(0, Vec::len);
    for (code, series) in returns {
        if series.len() != periods {
            return Err(RankfolioError::InvalidReturns {
                instrument: code.clone(),
                reason: format!("{} periods, expected {periods}", series.len()),
            });
        }
        if let Some(bad) = series.iter().find(|v| !v.is_finite()) {
            return Err(RankfolioError::InvalidReturns {
                instrument: code.clone(),
                reason: format!("non-finite return {bad}"),
            });
        }
    }
    if returns.len() > 1 && periods < 2 {
        return Err(RankfolioError::InvalidReturns {
            instrument: returns.keys().next().cloned().unwrap_or_default(),
            reason: format!("{periods} periods, need at least 2"),
        });
    }

    let matrix = ReturnMatrix {
        codes: returns.keys().map(String::as_str).collect(),
        series: returns.values().map(Vec::as_slice).collect(),
        bounds: returns.keys().map(|c| bounds.for_instrument(c)).collect(),
    };
    check_bounds(&matrix)?;
    Ok(matrix)
}

fn check_bounds(matrix: &ReturnMatrix<'_>) -> Result<()> {
    for (code, b) in matrix.codes.iter().zip(&matrix.bounds) {
        if !(0.0..=1.0).contains(&b.min) || !(0.0..=1.0).contains(&b.max) || b.min > b.max {
            return Err(infeasible(format!(
                "bounds for {code} must satisfy 0 <= min <= max <= 1, got [{}, {}]",
                b.min, b.max
            )));
        }
    }
    let min_sum: f64 = matrix.bounds.iter().map(|b| b.min).sum();
    let max_sum: f64 = matrix.bounds.iter().map(|b| b.max).sum();
    if min_sum > 1.0 + BOUND_TOLERANCE {
        return Err(infeasible(format!("minimum weights sum to {min_sum} > 1")));
    }
    if max_sum < 1.0 - BOUND_TOLERANCE {
        return Err(infeasible(format!("maximum weights sum to {max_sum} < 1")));
    }
    Ok(())
}

fn verify(weights: &[f64], matrix: &ReturnMatrix<'_>) -> Result<()> {
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(infeasible(format!("weights sum to {sum}")));
    }
    for ((w, b), code) in weights.iter().zip(&matrix.bounds).zip(&matrix.codes) {
        if !w.is_finite() || *w < b.min - BOUND_TOLERANCE || *w > b.max + BOUND_TOLERANCE {
            return Err(infeasible(format!(
                "weight {w} for {code} outside [{}, {}]",
                b.min, b.max
            )));
        }
    }
    Ok(())
}

/// Euclidean projection onto `{w : Σw = 1, lo ≤ w ≤ hi}`.
///
/// Finds τ with `Σ clamp(v - τ, lo, hi) = 1` by bisection; the bounds must
/// already be known to admit a solution.
pub fn project_capped_simplex(v: &[f64], bounds: &[WeightBounds]) -> Vec<f64> {
    let clamped = |tau: f64| -> Vec<f64> {
        v.iter()
            .zip(bounds)
            .map(|(x, b)| (x - tau).clamp(b.min, b.max))
            .collect()
    };

    let mut lo = v
        .iter()
        .zip(bounds)
        .map(|(x, b)| x - b.max)
        .fold(f64::INFINITY, f64::min);
    let mut hi = v
        .iter()
        .zip(bounds)
        .map(|(x, b)| x - b.min)
        .fold(f64::NEG_INFINITY, f64::max);

    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        let sum: f64 = clamped(mid).iter().sum();
        if sum > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= f64::EPSILON * hi.abs().max(1.0) {
            break;
        }
    }
    clamped(0.5 * (lo + hi))
}

pub fn within_bounds(weights: &[f64], bounds: &[WeightBounds]) -> bool {
    weights
        .iter()
        .zip(bounds)
        .all(|(w, b)| *w >= b.min - BOUND_TOLERANCE && *w <= b.max + BOUND_TOLERANCE)
}

/// Allocates weights across instruments from their per-period returns.
pub fn optimize_portfolio(
    returns: &BTreeMap<String, Vec<f64>>,
    config: &PortfolioConfig,
) -> Result<PortfolioWeights> {
    let matrix = validate(returns, &config.bounds)?;

    let weights = if matrix.len() == 1 {
        vec![1.0]
    } else {
        match config.method {
            OptimizerMethod::Markowitz => {
                markowitz::optimize(&matrix, &config.markowitz, config.variance_floor)?
            }
            OptimizerMethod::Hrp => hrp::optimize(&matrix, config.variance_floor),
        }
    };

    verify(&weights, &matrix)?;

    debug!(
        method = %config.method,
        instruments = matrix.len(),
        periods = matrix.periods(),
        "portfolio optimized"
    );

    Ok(PortfolioWeights {
        method: config.method,
        weights: matrix
            .codes
            .iter()
            .map(|c| c.to_string())
            .zip(weights)
            .collect(),
    })
}
