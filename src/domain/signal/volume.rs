//! Volume axis: OBV divergence and volume spikes.
//!
//! Over the lookback window, price falling while OBV rises is a bullish
//! divergence (and vice versa). A bar whose volume is at least
//! `spike_multiplier` times its volume SMA confirms that bar's price move.

use crate::domain::enrichment::IndicatorRow;
use crate::domain::indicator::IndicatorType;
use crate::domain::signal::{mean_score, Axis, Interpreter, Signal};

pub const DIVERGENCE_STRENGTH: f64 = 0.65;

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeInterpreter {
    pub volume_period: usize,
    pub spike_multiplier: f64,
    pub divergence_window: usize,
}

impl Default for VolumeInterpreter {
    fn default() -> Self {
        Self {
            volume_period: 20,
            spike_multiplier: 2.0,
            divergence_window: 5,
        }
    }
}

impl VolumeInterpreter {
    fn volume_sma(&self) -> IndicatorType {
        IndicatorType::VolumeSma(self.volume_period)
    }

    fn divergence(&self, window: &[IndicatorRow<'_>]) -> Option<f64> {
        let first = window.first()?;
        let last = window.last()?;
        if window.len() < 2 {
            return None;
        }
        let obv_change = last.simple(&IndicatorType::Obv)? - first.simple(&IndicatorType::Obv)?;
        let price_change = last.bar().close - first.bar().close;

        Some(if price_change < 0.0 && obv_change > 0.0 {
            DIVERGENCE_STRENGTH
        } else if price_change > 0.0 && obv_change < 0.0 {
            -DIVERGENCE_STRENGTH
        } else {
            0.0
        })
    }

    fn spike(&self, window: &[IndicatorRow<'_>]) -> Option<f64> {
        let last = window.last()?;
        let prev = window.len().checked_sub(2).map(|i| &window[i])?;
        let average = last.simple(&self.volume_sma())?;
        if average <= 0.0 {
            return Some(0.0);
        }

        let ratio = last.bar().volume as f64 / average;
        if ratio < self.spike_multiplier {
            return Some(0.0);
        }
        let strength = (ratio / (2.0 * self.spike_multiplier)).min(1.0);
        let change = last.bar().close - prev.bar().close;
        Some(if change == 0.0 {
            0.0
        } else {
            change.signum() * strength
        })
    }
}

impl Interpreter for VolumeInterpreter {
    fn axis(&self) -> Axis {
        Axis::Volume
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![IndicatorType::Obv, self.volume_sma()]
    }

    fn lookback(&self) -> usize {
        self.divergence_window.max(2)
    }

    fn interpret(&self, window: &[IndicatorRow<'_>]) -> Option<Signal> {
        let current = window.last()?;
        let score = mean_score(&[self.divergence(window), self.spike(window)])?;
        Some(Signal::from_score(current.date(), Axis::Volume, score))
    }
}
