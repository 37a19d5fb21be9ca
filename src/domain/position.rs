//! Position tracking and the trade ledger.

use crate::domain::execution::net_return;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::strategy::Side;
use chrono::NaiveDate;
use std::fmt;

/// A live position inside the backtest loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub entry_index: usize,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Position {
    /// Bars held at bar `index`, counting the entry bar as one.
    pub fn bars_held(&self, index: usize) -> usize {
        index + 1 - self.entry_index
    }

    /// Market price at which the stop fills on this bar, if breached. A bar
    /// that opens beyond the stop fills at the open.
    pub fn stop_fill(&self, bar: &OhlcvBar) -> Option<f64> {
        let stop = self.stop_loss?;
        match self.side {
            Side::Long if bar.low <= stop => Some(if bar.open <= stop { bar.open } else { stop }),
            Side::Short if bar.high >= stop => Some(if bar.open >= stop { bar.open } else { stop }),
            _ => None,
        }
    }

    /// Market price at which the take-profit fills on this bar, if reached.
    pub fn take_profit_fill(&self, bar: &OhlcvBar) -> Option<f64> {
        let target = self.take_profit?;
        match self.side {
            Side::Long if bar.high >= target => {
                Some(if bar.open >= target { bar.open } else { target })
            }
            Side::Short if bar.low <= target => {
                Some(if bar.open <= target { bar.open } else { target })
            }
            _ => None,
        }
    }

    pub fn unrealized_return(&self, price: f64, commission_pct: f64) -> f64 {
        net_return(self.side, self.entry_price, price, commission_pct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeLimit,
    Signal,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::TimeLimit => "time_limit",
            ExitReason::Signal => "signal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub side: Side,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Net of commission, as a fraction of entry notional.
    pub net_return: f64,
}

/// A position still open at the end of the series, marked to the last close.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub side: Side,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub mark_date: NaiveDate,
    pub mark_price: f64,
    pub unrealized_return: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeLedger {
    pub closed: Vec<Trade>,
    pub open: Option<OpenPosition>,
}

impl TradeLedger {
    /// Closed trade returns in order, followed by the open mark if any.
    pub fn returns(&self) -> Vec<f64> {
        self.closed
            .iter()
            .map(|t| t.net_return)
            .chain(self.open.iter().map(|p| p.unrealized_return))
            .collect()
    }

    pub fn trade_count(&self) -> usize {
        self.closed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    fn long_position() -> Position {
        Position {
            side: Side::Long,
            entry_price: 50.0,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            entry_index: 3,
            stop_loss: Some(45.0),
            take_profit: Some(60.0),
        }
    }

    fn short_position() -> Position {
        Position {
            side: Side::Short,
            entry_price: 100.0,
            stop_loss: Some(110.0),
            take_profit: Some(90.0),
            ..long_position()
        }
    }

    #[test]
    fn bars_held_counts_entry_bar() {
        assert_eq!(long_position().bars_held(3), 1);
        assert_eq!(long_position().bars_held(7), 5);
    }

    #[test]
    fn long_stop_fills_at_level_intrabar() {
        assert_eq!(long_position().stop_fill(&bar(48.0, 49.0, 44.0, 46.0)), Some(45.0));
    }

    #[test]
    fn long_stop_gap_fills_at_open() {
        assert_eq!(long_position().stop_fill(&bar(42.0, 43.0, 41.0, 42.5)), Some(42.0));
    }

    #[test]
    fn long_take_profit() {
        let p = long_position();
        assert_eq!(p.take_profit_fill(&bar(55.0, 61.0, 54.0, 58.0)), Some(60.0));
        assert_eq!(p.take_profit_fill(&bar(62.0, 63.0, 61.0, 62.0)), Some(62.0));
        assert_eq!(p.take_profit_fill(&bar(55.0, 59.0, 54.0, 58.0)), None);
    }

    #[test]
    fn short_levels_are_mirrored() {
        let p = short_position();
        assert_eq!(p.stop_fill(&bar(105.0, 111.0, 104.0, 108.0)), Some(110.0));
        assert_eq!(p.take_profit_fill(&bar(95.0, 96.0, 89.0, 92.0)), Some(90.0));
        assert_eq!(p.stop_fill(&bar(95.0, 96.0, 89.0, 92.0)), None);
    }

    #[test]
    fn no_levels_never_trigger() {
        let p = Position {
            stop_loss: None,
            take_profit: None,
            ..long_position()
        };
        assert_eq!(p.stop_fill(&bar(1.0, 1000.0, 0.5, 2.0)), None);
        assert_eq!(p.take_profit_fill(&bar(1.0, 1000.0, 0.5, 2.0)), None);
    }

    #[test]
    fn ledger_returns_include_open_mark() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let ledger = TradeLedger {
            closed: vec![Trade {
                side: Side::Long,
                entry_date: d,
                entry_price: 10.0,
                exit_date: d,
                exit_price: 11.0,
                exit_reason: ExitReason::Signal,
                net_return: 0.1,
            }],
            open: Some(OpenPosition {
                side: Side::Long,
                entry_date: d,
                entry_price: 10.0,
                mark_date: d,
                mark_price: 9.0,
                unrealized_return: -0.1,
            }),
        };
        assert_eq!(ledger.returns(), vec![0.1, -0.1]);
        assert_eq!(ledger.trade_count(), 1);
    }
}
