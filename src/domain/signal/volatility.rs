//! Volatility axis: Bollinger %B mean reversion.
//!
//! %B = (close - lower) / (upper - lower). The score runs linearly from
//! +EDGE_STRENGTH at the lower band to -EDGE_STRENGTH at the upper band and
//! is clamped outside the bands. Collapsed bands are neutral.

use crate::domain::enrichment::IndicatorRow;
use crate::domain::indicator::{IndicatorType, IndicatorValue};
use crate::domain::signal::{Axis, Interpreter, Signal};

pub const EDGE_STRENGTH: f64 = 0.65;

#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityInterpreter {
    pub period: usize,
    pub stddev_mult_x100: u32,
}

impl Default for VolatilityInterpreter {
    fn default() -> Self {
        Self {
            period: 20,
            stddev_mult_x100: 200,
        }
    }
}

impl VolatilityInterpreter {
    fn bands(&self) -> IndicatorType {
        IndicatorType::Bollinger {
            period: self.period,
            stddev_mult_x100: self.stddev_mult_x100,
        }
    }
}

impl Interpreter for VolatilityInterpreter {
    fn axis(&self) -> Axis {
        Axis::Volatility
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![self.bands()]
    }

    fn interpret(&self, window: &[IndicatorRow<'_>]) -> Option<Signal> {
        let row = window.last()?;
        let (upper, lower) = match row.get(&self.bands())? {
            IndicatorValue::Bollinger { upper, lower, .. } => (*upper, *lower),
            _ => return None,
        };

        let width = upper - lower;
        let score = if width > 0.0 {
            let percent_b = (row.bar().close - lower) / width;
            (EDGE_STRENGTH * (1.0 - 2.0 * percent_b)).clamp(-EDGE_STRENGTH, EDGE_STRENGTH)
        } else {
            0.0
        };
        Some(Signal::from_score(row.date(), Axis::Volatility, score))
    }
}
