//! Candidate strategy definitions driven by the composite score.
//!
//! A definition is a plain parameter record; one evaluation function
//! interprets every definition, with `side` selecting which way the score
//! must cross the thresholds.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("long"),
            Side::Short => f.write_str("short"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Side::Long),
            "short" => Ok(Side::Short),
            other => Err(format!("unknown side '{other}', expected long or short")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyDefinition {
    pub id: String,
    pub side: Side,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    /// Percent distance from the fill price, e.g. 5.0 for 5%.
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    /// Bars held including the entry bar.
    pub max_holding_bars: Option<usize>,
}

impl StrategyDefinition {
    pub fn new(id: impl Into<String>, side: Side, entry_threshold: f64, exit_threshold: f64) -> Self {
        Self {
            id: id.into(),
            side,
            entry_threshold,
            exit_threshold,
            stop_loss_pct: None,
            take_profit_pct: None,
            max_holding_bars: None,
        }
    }

    pub fn with_stop_loss(mut self, pct: f64) -> Self {
        self.stop_loss_pct = Some(pct);
        self
    }

    pub fn with_take_profit(mut self, pct: f64) -> Self {
        self.take_profit_pct = Some(pct);
        self
    }

    pub fn with_max_holding_bars(mut self, bars: usize) -> Self {
        self.max_holding_bars = Some(bars);
        self
    }

    /// Long: prev < entry <= curr. Short: prev > entry >= curr.
    pub fn is_entry(&self, prev: f64, curr: f64) -> bool {
        let th = self.entry_threshold;
        match self.side {
            Side::Long => prev < th && curr >= th,
            Side::Short => prev > th && curr <= th,
        }
    }

    /// Long: prev > exit >= curr. Short: prev < exit <= curr.
    pub fn is_exit(&self, prev: f64, curr: f64) -> bool {
        let th = self.exit_threshold;
        match self.side {
            Side::Long => prev > th && curr <= th,
            Side::Short => prev < th && curr >= th,
        }
    }

    pub fn stop_price(&self, fill_price: f64) -> Option<f64> {
        self.stop_loss_pct.filter(|p| *p > 0.0).map(|pct| match self.side {
            Side::Long => fill_price * (1.0 - pct / 100.0),
            Side::Short => fill_price * (1.0 + pct / 100.0),
        })
    }

    pub fn take_profit_price(&self, fill_price: f64) -> Option<f64> {
        self.take_profit_pct.filter(|p| *p > 0.0).map(|pct| match self.side {
            Side::Long => fill_price * (1.0 + pct / 100.0),
            Side::Short => fill_price * (1.0 - pct / 100.0),
        })
    }
}
