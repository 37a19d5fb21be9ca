//! Score-driven backtest engine.
//!
//! Per bar, in order:
//! 1. a pending signal exit fills at the open
//! 2. a pending entry fills at the open
//! 3. stop-loss, then take-profit, checked against the bar's range
//! 4. the holding cap closes the position at the close
//! 5. the bar's composite score is compared with the previous usable score
//!    to schedule an entry or exit for the next open
//!
//! At most one position is open at any time. A position still open after
//! the last bar is reported in the ledger, marked to the last close.

use crate::domain::error::{RankfolioError, Result};
use crate::domain::execution::{entry_fill, exit_fill, net_return};
use crate::domain::metrics::{Metrics, TRADING_DAYS_PER_YEAR};
use crate::domain::ohlcv::{clean_bars, OhlcvBar};
use crate::domain::position::{ExitReason, OpenPosition, Position, Trade, TradeLedger};
use crate::domain::signal::CompositeSignal;
use crate::domain::strategy::StrategyDefinition;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub annualization_factor: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            commission_pct: 0.1,
            slippage_pct: 0.0,
            annualization_factor: TRADING_DAYS_PER_YEAR,
        }
    }
}

/// Strategy return over one bar, close to close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodReturn {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub strategy_id: String,
    pub instrument: String,
    pub ledger: TradeLedger,
    pub metrics: Metrics,
    pub period_returns: Vec<PeriodReturn>,
}

struct Simulation<'a> {
    strategy: &'a StrategyDefinition,
    config: &'a BacktestConfig,
    position: Option<Position>,
    closed: Vec<Trade>,
    /// Compounded value of all closed trades.
    realized: f64,
}

impl<'a> Simulation<'a> {
    fn enter(&mut self, index: usize, bar: &OhlcvBar) {
        let side = self.strategy.side;
        let price = entry_fill(side, bar.open, self.config.slippage_pct);
        self.position = Some(Position {
            side,
            entry_price: price,
            entry_date: bar.date,
            entry_index: index,
            stop_loss: self.strategy.stop_price(price),
            take_profit: self.strategy.take_profit_price(price),
        });
    }

    fn exit(&mut self, bar: &OhlcvBar, market_price: f64, reason: ExitReason) {
        if let Some(pos) = self.position.take() {
            let price = exit_fill(pos.side, market_price, self.config.slippage_pct);
            let r = net_return(pos.side, pos.entry_price, price, self.config.commission_pct);
            self.realized *= 1.0 + r;
            self.closed.push(Trade {
                side: pos.side,
                entry_date: pos.entry_date,
                entry_price: pos.entry_price,
                exit_date: bar.date,
                exit_price: price,
                exit_reason: reason,
                net_return: r,
            });
        }
    }

    fn check_protective_exits(&mut self, index: usize, bar: &OhlcvBar) {
        let Some(pos) = &self.position else {
            return;
        };
        if let Some(fill) = pos.stop_fill(bar) {
            self.exit(bar, fill, ExitReason::StopLoss);
        } else if let Some(fill) = pos.take_profit_fill(bar) {
            self.exit(bar, fill, ExitReason::TakeProfit);
        } else if self
            .strategy
            .max_holding_bars
            .is_some_and(|cap| pos.bars_held(index) >= cap)
        {
            self.exit(bar, bar.close, ExitReason::TimeLimit);
        }
    }

    /// Mark-to-market equity at the bar's close.
    fn equity(&self, bar: &OhlcvBar) -> f64 {
        match &self.position {
            Some(pos) => {
                let mark = exit_fill(pos.side, bar.close, self.config.slippage_pct);
                self.realized * (1.0 + pos.unrealized_return(mark, self.config.commission_pct))
            }
            None => self.realized,
        }
    }
}

pub fn backtest(
    instrument: &str,
    signals: &[CompositeSignal],
    bars: &[OhlcvBar],
    strategy: &StrategyDefinition,
    config: &BacktestConfig,
) -> Result<BacktestResult> {
    let bars = clean_bars(bars);
    let by_date: HashMap<NaiveDate, f64> = signals
        .iter()
        .filter_map(|s| s.score.map(|score| (s.date, score)))
        .collect();
    let scores: Vec<Option<f64>> = bars.iter().map(|b| by_date.get(&b.date).copied()).collect();

    if scores.iter().all(|s| s.is_none()) {
        return Err(RankfolioError::EmptySignalWindow {
            instrument: instrument.to_string(),
        });
    }

    let mut sim = Simulation {
        strategy,
        config,
        position: None,
        closed: Vec::new(),
        realized: 1.0,
    };
    let mut pending_entry = false;
    let mut pending_exit = false;
    let mut prev_score: Option<f64> = None;
    let mut prev_equity = 1.0;
    let mut period_returns = Vec::with_capacity(bars.len());
    let last = bars.len() - 1;

    for (i, bar) in bars.iter().enumerate() {
        if pending_exit {
            sim.exit(bar, bar.open, ExitReason::Signal);
            pending_exit = false;
        }
        if pending_entry && sim.position.is_none() {
            sim.enter(i, bar);
        }
        pending_entry = false;

        sim.check_protective_exits(i, bar);

        if let Some(curr) = scores[i] {
            if let Some(prev) = prev_score {
                if sim.position.is_some() {
                    pending_exit = i < last && strategy.is_exit(prev, curr);
                } else {
                    pending_entry = i < last && strategy.is_entry(prev, curr);
                }
            }
            prev_score = Some(curr);
        }

        let equity = sim.equity(bar);
        if i > 0 {
            period_returns.push(PeriodReturn {
                date: bar.date,
                value: equity / prev_equity - 1.0,
            });
        }
        prev_equity = equity;
    }

    let open = sim.position.as_ref().map(|pos| {
        let bar = &bars[last];
        let mark = exit_fill(pos.side, bar.close, config.slippage_pct);
        OpenPosition {
            side: pos.side,
            entry_date: pos.entry_date,
            entry_price: pos.entry_price,
            mark_date: bar.date,
            mark_price: mark,
            unrealized_return: pos.unrealized_return(mark, config.commission_pct),
        }
    });

    let ledger = TradeLedger {
        closed: sim.closed,
        open,
    };
    let metrics = Metrics::from_ledger(&ledger, config.annualization_factor);

    debug!(
        instrument,
        strategy = %strategy.id,
        trades = metrics.trade_count,
        open = ledger.open.is_some(),
        total_return = metrics.total_return,
        "backtest finished"
    );

    Ok(BacktestResult {
        strategy_id: strategy.id.clone(),
        instrument: instrument.to_string(),
        ledger,
        metrics,
        period_returns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Direction;
    use crate::domain::strategy::Side;
    use approx::assert_relative_eq;

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
    }

    fn flat_bars(n: usize, price: f64) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| OhlcvBar {
                date: day(i),
                open: price,
                high: price,
                low: price,
                close: price,
                volume: 1000,
            })
            .collect()
    }

    fn signals(scores: &[Option<f64>]) -> Vec<CompositeSignal> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| CompositeSignal {
                date: day(i),
                score: *s,
                direction: Direction::Neutral,
                contributions: Vec::new(),
            })
            .collect()
    }

    fn no_costs() -> BacktestConfig {
        BacktestConfig {
            commission_pct: 0.0,
            slippage_pct: 0.0,
            annualization_factor: TRADING_DAYS_PER_YEAR,
        }
    }

    fn long(entry: f64, exit: f64) -> StrategyDefinition {
        StrategyDefinition::new("test", Side::Long, entry, exit)
    }

    #[test]
    fn no_usable_score_is_an_error() {
        let err = backtest(
            "ABC",
            &signals(&[None, None, None]),
            &flat_bars(3, 10.0),
            &long(0.5, -0.2),
            &no_costs(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RankfolioError::EmptySignalWindow {
                instrument: "ABC".into()
            }
        );
    }

    #[test]
    fn entry_fills_at_next_open() {
        let mut bars = flat_bars(4, 10.0);
        bars[2].open = 11.0;
        bars[2].high = 11.0;
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(0.6), Some(0.7), Some(0.7)]),
            &bars,
            &long(0.5, -0.2),
            &no_costs(),
        )
        .unwrap();
        let open = result.ledger.open.unwrap();
        assert_eq!(open.entry_date, day(2));
        assert_eq!(open.entry_price, 11.0);
    }

    #[test]
    fn signal_exit_fills_at_next_open() {
        let mut bars = flat_bars(5, 10.0);
        bars[4].open = 12.0;
        bars[4].high = 12.0;
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(0.6), Some(0.6), Some(-0.5), Some(-0.5)]),
            &bars,
            &long(0.5, -0.2),
            &no_costs(),
        )
        .unwrap();
        let trades = &result.ledger.closed;
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::Signal);
        assert_eq!(trades[0].exit_date, day(4));
        assert_relative_eq!(trades[0].net_return, 0.2, epsilon = 1e-12);
        assert!(result.ledger.open.is_none());
    }

    #[test]
    fn stop_loss_wins_over_take_profit() {
        let mut bars = flat_bars(4, 100.0);
        // wide bar touches both levels
        bars[2].high = 120.0;
        bars[2].low = 80.0;
        let strategy = long(0.5, -0.2).with_stop_loss(5.0).with_take_profit(5.0);
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(0.9), Some(0.9), Some(0.9)]),
            &bars,
            &strategy,
            &no_costs(),
        )
        .unwrap();
        let trade = &result.ledger.closed[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_relative_eq!(trade.exit_price, 95.0, epsilon = 1e-9);
    }

    #[test]
    fn take_profit_when_stop_not_touched() {
        let mut bars = flat_bars(4, 100.0);
        bars[3].high = 110.0;
        let strategy = long(0.5, -0.2).with_stop_loss(5.0).with_take_profit(5.0);
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(0.9), Some(0.9), Some(0.9)]),
            &bars,
            &strategy,
            &no_costs(),
        )
        .unwrap();
        let trade = &result.ledger.closed[0];
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert_relative_eq!(trade.exit_price, 105.0, epsilon = 1e-9);
    }

    #[test]
    fn stop_loss_wins_over_time_limit() {
        // bar 3 reaches the holding cap and also trades through the stop
        let mut bars = flat_bars(6, 100.0);
        bars[3].low = 90.0;
        let strategy = long(0.5, -0.2)
            .with_stop_loss(5.0)
            .with_max_holding_bars(2);
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(0.9), Some(0.9), Some(0.9), Some(0.9), Some(0.9)]),
            &bars,
            &strategy,
            &no_costs(),
        )
        .unwrap();
        let trade = &result.ledger.closed[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_date, day(3));
        assert_relative_eq!(trade.exit_price, 95.0, epsilon = 1e-9);
    }

    #[test]
    fn take_profit_wins_over_signal_exit() {
        // bar 3 hits the target and its score crosses the exit threshold
        let mut bars = flat_bars(5, 100.0);
        bars[3].high = 110.0;
        let strategy = long(0.5, -0.2).with_take_profit(5.0);
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(0.9), Some(0.9), Some(-0.9), Some(-0.9)]),
            &bars,
            &strategy,
            &no_costs(),
        )
        .unwrap();
        let trades = &result.ledger.closed;
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::TakeProfit);
        assert_eq!(trades[0].exit_date, day(3));
        assert_relative_eq!(trades[0].exit_price, 105.0, epsilon = 1e-9);
        assert!(result.ledger.open.is_none());
    }

    #[test]
    fn pending_signal_exit_fills_before_stop_check() {
        // bar 4 gaps through the stop, but the exit scheduled at bar 3 fills at its open
        let mut bars = flat_bars(5, 100.0);
        bars[4].open = 90.0;
        bars[4].low = 90.0;
        let strategy = long(0.5, -0.2).with_stop_loss(5.0);
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(0.9), Some(0.9), Some(-0.9), Some(-0.9)]),
            &bars,
            &strategy,
            &no_costs(),
        )
        .unwrap();
        assert_eq!(result.ledger.closed.len(), 1);
        assert_eq!(result.ledger.closed[0].exit_price, 90.0);
    }

    #[test]
    fn time_limit_closes_at_close() {
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(0.9), Some(0.9), Some(0.9), Some(0.9), Some(0.9)]),
            &flat_bars(6, 10.0),
            &long(0.5, -0.2).with_max_holding_bars(2),
            &no_costs(),
        )
        .unwrap();
        let trade = &result.ledger.closed[0];
        assert_eq!(trade.exit_reason, ExitReason::TimeLimit);
        assert_eq!(trade.entry_date, day(2));
        assert_eq!(trade.exit_date, day(3));
    }

    #[test]
    fn no_pyramiding_while_entered() {
        let scores = [
            Some(0.0),
            Some(0.6),
            Some(0.0),
            Some(0.6),
            Some(0.0),
            Some(0.6),
            Some(0.6),
        ];
        let result = backtest(
            "ABC",
            &signals(&scores),
            &flat_bars(7, 10.0),
            &long(0.5, -0.2),
            &no_costs(),
        )
        .unwrap();
        assert!(result.ledger.closed.is_empty());
        assert_eq!(result.ledger.open.as_ref().unwrap().entry_date, day(2));
    }

    #[test]
    fn cross_on_last_bar_is_ignored() {
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(0.0), Some(0.9)]),
            &flat_bars(3, 10.0),
            &long(0.5, -0.2),
            &no_costs(),
        )
        .unwrap();
        assert!(result.ledger.open.is_none());
        assert!(result.ledger.closed.is_empty());
    }

    #[test]
    fn unusable_scores_are_skipped_for_crossing() {
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), None, Some(0.9), Some(0.9)]),
            &flat_bars(4, 10.0),
            &long(0.5, -0.2),
            &no_costs(),
        )
        .unwrap();
        assert_eq!(result.ledger.open.unwrap().entry_date, day(3));
    }

    #[test]
    fn short_side_profits_on_decline() {
        let mut bars = flat_bars(5, 100.0);
        for (i, bar) in bars.iter_mut().enumerate().skip(2) {
            let p = 100.0 - 5.0 * (i as f64 - 1.0);
            bar.open = p;
            bar.high = p;
            bar.low = p;
            bar.close = p;
        }
        let strategy = StrategyDefinition::new("s", Side::Short, -0.5, 0.2);
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(-0.9), Some(-0.9), Some(-0.9), Some(-0.9)]),
            &bars,
            &strategy,
            &no_costs(),
        )
        .unwrap();
        let open = result.ledger.open.unwrap();
        assert_eq!(open.entry_price, 95.0);
        assert_relative_eq!(open.unrealized_return, (95.0 - 85.0) / 95.0, epsilon = 1e-12);
        assert!(result.metrics.total_return > 0.0);
    }

    #[test]
    fn period_returns_compound_to_total_return() {
        let mut bars = flat_bars(6, 10.0);
        for (i, bar) in bars.iter_mut().enumerate() {
            let p = 10.0 + i as f64;
            bar.open = p;
            bar.high = p;
            bar.low = p;
            bar.close = p;
        }
        let config = BacktestConfig {
            commission_pct: 0.1,
            ..no_costs()
        };
        let result = backtest(
            "ABC",
            &signals(&[Some(0.0), Some(0.9), Some(0.9), Some(-0.9), Some(0.0), Some(0.0)]),
            &bars,
            &long(0.5, -0.2),
            &config,
        )
        .unwrap();
        assert_eq!(result.period_returns.len(), 5);
        let compounded = result
            .period_returns
            .iter()
            .fold(1.0, |acc, p| acc * (1.0 + p.value))
            - 1.0;
        assert_relative_eq!(compounded, result.metrics.total_return, epsilon = 1e-12);
    }

    #[test]
    fn signals_align_by_date() {
        let mut sigs = signals(&[Some(0.0), Some(0.9), Some(0.9), Some(0.9)]);
        sigs.reverse();
        let result = backtest(
            "ABC",
            &sigs,
            &flat_bars(4, 10.0),
            &long(0.5, -0.2),
            &no_costs(),
        )
        .unwrap();
        assert_eq!(result.ledger.open.unwrap().entry_date, day(2));
    }
}
