//! Candidate ranking within one instrument.
//!
//! Sharpe and drawdown are min-max normalized across the pool (higher Sharpe
//! and shallower drawdown score higher); win rate is already on [0, 1] and is
//! used raw. Ties fall back to trade count (more first), then drawdown
//! (shallower first), then strategy id.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::{RankfolioError, Result};
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    pub weight_sharpe: f64,
    pub weight_drawdown: f64,
    pub weight_win_rate: f64,
    /// Candidates with fewer closed trades are not eligible.
    pub min_trades: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weight_sharpe: 0.5,
            weight_drawdown: 0.3,
            weight_win_rate: 0.2,
            min_trades: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedStrategy {
    pub instrument: String,
    pub strategy_id: String,
    pub rank_score: f64,
    pub result: BacktestResult,
}

/// Maps `value` onto [0, 1] over `[min, max]`. A pool with no spread
/// scores everyone 1.
fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range > 0.0 {
        (value - min) / range
    } else {
        1.0
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn compare(a: &RankedStrategy, b: &RankedStrategy) -> Ordering {
    let (ma, mb) = (&a.result.metrics, &b.result.metrics);
    b.rank_score
        .total_cmp(&a.rank_score)
        .then_with(|| mb.trade_count.cmp(&ma.trade_count))
        .then_with(|| ma.max_drawdown.total_cmp(&mb.max_drawdown))
        .then_with(|| a.strategy_id.cmp(&b.strategy_id))
}

/// Scores and orders every eligible candidate, best first.
pub fn rank_candidates(
    results: Vec<BacktestResult>,
    config: &RankingConfig,
) -> Result<Vec<RankedStrategy>> {
    if let Some(first) = results.first() {
        if let Some(other) = results.iter().find(|r| r.instrument != first.instrument) {
            return Err(RankfolioError::MixedCandidatePool {
                first: first.instrument.clone(),
                other: other.instrument.clone(),
            });
        }
    }

    let evaluated = results.len();
    let pool: Vec<BacktestResult> = results
        .into_iter()
        .filter(|r| r.metrics.trade_count >= config.min_trades && r.metrics.is_rankable())
        .collect();

    if pool.is_empty() {
        return Err(RankfolioError::NoCandidates { evaluated });
    }

    let (sharpe_min, sharpe_max) = bounds(pool.iter().map(|r| r.metrics.sharpe_ratio));
    let (dd_min, dd_max) = bounds(pool.iter().map(|r| -r.metrics.max_drawdown));

    let mut ranked: Vec<RankedStrategy> = pool
        .into_iter()
        .map(|result| {
            let m = &result.metrics;
            let rank_score = config.weight_sharpe * normalize(m.sharpe_ratio, sharpe_min, sharpe_max)
                + config.weight_drawdown * normalize(-m.max_drawdown, dd_min, dd_max)
                + config.weight_win_rate * m.win_rate;
            RankedStrategy {
                instrument: result.instrument.clone(),
                strategy_id: result.strategy_id.clone(),
                rank_score,
                result,
            }
        })
        .collect();

    ranked.sort_by(compare);

    debug!(
        evaluated,
        eligible = ranked.len(),
        best = %ranked[0].strategy_id,
        score = ranked[0].rank_score,
        "ranked candidates"
    );

    Ok(ranked)
}

/// The single best candidate for an instrument.
pub fn select_best(results: Vec<BacktestResult>, config: &RankingConfig) -> Result<RankedStrategy> {
    let evaluated = results.len();
    rank_candidates(results, config)?
        .into_iter()
        .next()
        .ok_or(RankfolioError::NoCandidates { evaluated })
}
