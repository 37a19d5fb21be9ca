//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are unavailable.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_bollinger(
    bars: &[OhlcvBar],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100,
    };
    if period == 0 {
        return IndicatorSeries::unavailable(indicator_type, bars);
    }

    let mult = stddev_mult_x100 as f64 / 100.0;
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        if i + 1 < period {
            values.push(IndicatorPoint::unavailable(bar.date));
            continue;
        }

        let window = &bars[i + 1 - period..=i];
        let middle: f64 = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
        let variance: f64 = window
            .iter()
            .map(|b| {
                let diff = b.close - middle;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();

        values.push(IndicatorPoint {
            date: bar.date,
            value: Some(IndicatorValue::Bollinger {
                upper: middle + mult * stddev,
                middle,
                lower: middle - mult * stddev,
            }),
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn bollinger_warmup() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let series = calculate_bollinger(&bars, 3, 200);
        assert!(!series.values[1].is_available());
        assert!(series.values[2].is_available());
    }

    #[test]
    fn bollinger_population_stddev() {
        let bars = make_bars(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let series = calculate_bollinger(&bars, 8, 200);
        // mean 5, population stddev 2
        match series.values[7].value {
            Some(IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            }) => {
                assert!((middle - 5.0).abs() < 1e-12);
                assert!((upper - 9.0).abs() < 1e-12);
                assert!((lower - 1.0).abs() < 1e-12);
            }
            other => panic!("expected Bollinger value, got {other:?}"),
        }
    }

    #[test]
    fn bollinger_flat_prices_collapse_bands() {
        let bars = make_bars(&[10.0; 5]);
        let series = calculate_bollinger(&bars, 5, 200);
        match series.values[4].value {
            Some(IndicatorValue::Bollinger { upper, lower, .. }) => {
                assert_eq!(upper, lower);
            }
            other => panic!("expected Bollinger value, got {other:?}"),
        }
    }

    #[test]
    fn bollinger_zero_period() {
        let bars = make_bars(&[1.0, 2.0]);
        let series = calculate_bollinger(&bars, 0, 200);
        assert!(series.first_available().is_none());
    }
}
