//! Risk axis: ATR expansion relative to its recent mean.

use crate::domain::enrichment::IndicatorRow;
use crate::domain::indicator::IndicatorType;
use crate::domain::signal::{Axis, Interpreter, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct RiskInterpreter {
    pub atr_period: usize,
    /// Rows averaged for the ATR baseline, including the scored bar.
    pub window: usize,
    /// ATR / mean ATR above which the axis turns bearish.
    pub elevated_ratio: f64,
}

impl Default for RiskInterpreter {
    fn default() -> Self {
        Self {
            atr_period: 14,
            window: 20,
            elevated_ratio: 1.5,
        }
    }
}

impl RiskInterpreter {
    fn atr(&self) -> IndicatorType {
        IndicatorType::Atr(self.atr_period)
    }
}

impl Interpreter for RiskInterpreter {
    fn axis(&self) -> Axis {
        Axis::Risk
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![self.atr()]
    }

    fn lookback(&self) -> usize {
        self.window.max(1)
    }

    fn interpret(&self, window: &[IndicatorRow<'_>]) -> Option<Signal> {
        let current = window.last()?;
        let atrs: Vec<f64> = window
            .iter()
            .map(|row| row.simple(&self.atr()))
            .collect::<Option<Vec<f64>>>()?;
        let mean = atrs.iter().sum::<f64>() / atrs.len() as f64;
        let atr = *atrs.last()?;

        let ratio = if mean > 0.0 { atr / mean } else { 1.0 };
        let score = if ratio > self.elevated_ratio {
            -((ratio - self.elevated_ratio) / self.elevated_ratio + 0.5).min(1.0)
        } else {
            0.0
        };
        Some(Signal::from_score(current.date(), Axis::Risk, score))
    }
}
