//! Rolling least-squares trend of closes.
//!
//! Over each window of `window` closes ending at t, fit close = a + b·x with
//! x = 0..window-1. `slope_pct` is b as a percentage of the window mean,
//! `r_squared` the coefficient of determination (0 for a flat window).
//! Warmup: first (window-1) bars.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

fn fit(closes: &[f64]) -> (f64, f64) {
    let n = closes.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = closes.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (i, y) in closes.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let r_squared = if syy > 0.0 {
        ((sxy * sxy) / (sxx * syy)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let slope_pct = if y_mean != 0.0 { slope / y_mean * 100.0 } else { 0.0 };
    (slope_pct, r_squared)
}

pub fn calculate_trend(bars: &[OhlcvBar], window: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Trend { window };
    if window < 2 {
        return IndicatorSeries::unavailable(indicator_type, bars);
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i + 1 < window {
                return IndicatorPoint::unavailable(bar.date);
            }
            let (slope_pct, r_squared) = fit(&closes[i + 1 - window..=i]);
            IndicatorPoint {
                date: bar.date,
                value: Some(IndicatorValue::Trend {
                    slope_pct,
                    r_squared,
                }),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
