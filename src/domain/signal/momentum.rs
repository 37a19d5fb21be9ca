//! Momentum axis: RSI extremes and MACD histogram crosses.
//!
//! RSI below `oversold` scores +(oversold - rsi) / oversold, above
//! `overbought` scores -(rsi - overbought) / (100 - overbought). A MACD
//! histogram sign change scores ±0.75; a persisting sign scores ±0.25.
//! The axis score is the mean of the available components.

use crate::domain::enrichment::IndicatorRow;
use crate::domain::indicator::{IndicatorType, IndicatorValue};
use crate::domain::signal::{mean_score, Axis, Interpreter, Signal};

pub const MACD_CROSS_STRENGTH: f64 = 0.75;
pub const MACD_REGIME_STRENGTH: f64 = 0.25;

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumInterpreter {
    pub rsi_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for MomentumInterpreter {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            oversold: 30.0,
            overbought: 70.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl MomentumInterpreter {
    fn rsi(&self) -> IndicatorType {
        IndicatorType::Rsi(self.rsi_period)
    }

    fn macd(&self) -> IndicatorType {
        IndicatorType::Macd {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    fn rsi_score(&self, rsi: f64) -> f64 {
        if rsi < self.oversold {
            (self.oversold - rsi) / self.oversold
        } else if rsi > self.overbought {
            -(rsi - self.overbought) / (100.0 - self.overbought)
        } else {
            0.0
        }
    }

    fn histogram(&self, row: &IndicatorRow<'_>) -> Option<f64> {
        match row.get(&self.macd()) {
            Some(IndicatorValue::Macd { histogram, .. }) => Some(*histogram),
            _ => None,
        }
    }
}

fn macd_score(prev: Option<f64>, curr: f64) -> f64 {
    match prev {
        Some(p) if p <= 0.0 && curr > 0.0 => MACD_CROSS_STRENGTH,
        Some(p) if p >= 0.0 && curr < 0.0 => -MACD_CROSS_STRENGTH,
        _ if curr > 0.0 => MACD_REGIME_STRENGTH,
        _ if curr < 0.0 => -MACD_REGIME_STRENGTH,
        _ => 0.0,
    }
}

impl Interpreter for MomentumInterpreter {
    fn axis(&self) -> Axis {
        Axis::Momentum
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![self.rsi(), self.macd()]
    }

    fn lookback(&self) -> usize {
        2
    }

    fn interpret(&self, window: &[IndicatorRow<'_>]) -> Option<Signal> {
        let current = window.last()?;
        let previous = window.len().checked_sub(2).map(|i| &window[i]);

        let rsi = current.simple(&self.rsi()).map(|v| self.rsi_score(v));
        let macd = self
            .histogram(current)
            .map(|h| macd_score(previous.and_then(|p| self.histogram(p)), h));

        let score = mean_score(&[rsi, macd])?;
        Some(Signal::from_score(current.date(), Axis::Momentum, score))
    }
}
