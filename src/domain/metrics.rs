//! Performance metrics computed from a trade ledger alone.
//!
//! Return-based figures (total return, Sharpe, drawdown) use every ledger
//! return including the open position's mark. Trade statistics (win rate,
//! profit factor, counts) use closed trades only.

use crate::domain::position::TradeLedger;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub trade_count: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub profit_factor: f64,
    pub average_trade_return: f64,
}

impl Metrics {
    pub fn from_ledger(ledger: &TradeLedger, annualization_factor: f64) -> Self {
        let returns = ledger.returns();

        let total_return = returns.iter().fold(1.0, |equity, r| equity * (1.0 + r)) - 1.0;
        let sharpe_ratio = compute_sharpe(&returns, annualization_factor);
        let max_drawdown = compute_drawdown(&returns);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;

        for trade in &ledger.closed {
            let r = trade.net_return;
            if r > 0.0 {
                trades_won += 1;
                total_wins += r;
            } else if r < 0.0 {
                trades_lost += 1;
                total_losses += r.abs();
            } else {
                trades_breakeven += 1;
            }
        }

        let trade_count = ledger.trade_count();
        let win_rate = if trade_count > 0 {
            trades_won as f64 / trade_count as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let average_trade_return = if trade_count > 0 {
            ledger.closed.iter().map(|t| t.net_return).sum::<f64>() / trade_count as f64
        } else {
            0.0
        };

        Metrics {
            total_return,
            sharpe_ratio,
            max_drawdown,
            win_rate,
            trade_count,
            trades_won,
            trades_lost,
            trades_breakeven,
            profit_factor,
            average_trade_return,
        }
    }

    /// The figures the ranker scores on are all finite.
    pub fn is_rankable(&self) -> bool {
        self.sharpe_ratio.is_finite() && self.max_drawdown.is_finite() && self.win_rate.is_finite()
    }
}

/// mean / population stddev × sqrt(annualization); 0 with fewer than two
/// returns or no dispersion.
fn compute_sharpe(returns: &[f64], annualization_factor: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        mean / stddev * annualization_factor.sqrt()
    } else {
        0.0
    }
}

/// Largest peak-to-trough fall of the compounded equity curve starting at 1.
fn compute_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;

    for r in returns {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - equity) / peak);
        }
    }
    max_dd
}
