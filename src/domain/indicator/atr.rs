//! ATR (Average True Range) with Wilder smoothing.
//!
//! TR[0] = high - low; TR[i] = true range against the previous close.
//! Seed: mean of the first n true ranges; then ATR = (prev * (n-1) + TR) / n.
//! Warmup: first (n-1) bars are unavailable.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < period {
        return IndicatorSeries::unavailable(IndicatorType::Atr(period), bars);
    }

    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut values = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i + 1 < period {
            values.push(IndicatorPoint::unavailable(bar.date));
            continue;
        }
        atr = if i + 1 == period {
            tr_values[..period].iter().sum::<f64>() / period as f64
        } else {
            (atr * (period - 1) as f64 + tr_values[i]) / period as f64
        };
        values.push(IndicatorPoint {
            date: bar.date,
            value: Some(IndicatorValue::Simple(atr)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}
