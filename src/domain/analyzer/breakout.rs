//! Support/resistance breakout detector.
//!
//! Support and resistance at bar t are the lowest low and highest high of the
//! `window` bars strictly before t. A close more than [`BREAKOUT_TOLERANCE`]
//! beyond either level is a breakout. Warmup: first `window` bars.

use crate::domain::indicator::{
    BreakoutState, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::OhlcvBar;

/// Fractional margin a close must clear beyond a level.
pub const BREAKOUT_TOLERANCE: f64 = 0.002;

pub fn calculate_breakout(bars: &[OhlcvBar], window: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Breakout { window };
    if window == 0 {
        return IndicatorSeries::unavailable(indicator_type, bars);
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i < window {
                return IndicatorPoint::unavailable(bar.date);
            }
            let prior = &bars[i - window..i];
            let support = prior.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let resistance = prior.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);

            let state = if bar.close > resistance * (1.0 + BREAKOUT_TOLERANCE) {
                BreakoutState::Above
            } else if bar.close < support * (1.0 - BREAKOUT_TOLERANCE) {
                BreakoutState::Below
            } else {
                BreakoutState::Inside
            };

            IndicatorPoint {
                date: bar.date,
                value: Some(IndicatorValue::Breakout {
                    support,
                    resistance,
                    state,
                }),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    fn state_at(series: &IndicatorSeries, i: usize) -> BreakoutState {
        match series.values[i].value {
            Some(IndicatorValue::Breakout { state, .. }) => state,
            other => panic!("expected breakout value, got {other:?}"),
        }
    }

    fn range_bars() -> Vec<OhlcvBar> {
        vec![
            make_bar(1, 101.0, 99.0, 100.0),
            make_bar(2, 102.0, 98.0, 100.0),
            make_bar(3, 101.0, 99.0, 100.0),
        ]
    }

    #[test]
    fn levels_exclude_current_bar() {
        let mut bars = range_bars();
        bars.push(make_bar(4, 150.0, 50.0, 100.0));
        let series = calculate_breakout(&bars, 3);
        match series.values[3].value {
            Some(IndicatorValue::Breakout {
                support,
                resistance,
                ..
            }) => {
                assert_eq!(support, 98.0);
                assert_eq!(resistance, 102.0);
            }
            other => panic!("expected breakout value, got {other:?}"),
        }
    }

    #[test]
    fn close_above_resistance_breaks_out() {
        let mut bars = range_bars();
        bars.push(make_bar(4, 105.0, 101.0, 104.0));
        let series = calculate_breakout(&bars, 3);
        assert!(!series.values[2].is_available());
        assert_eq!(state_at(&series, 3), BreakoutState::Above);
    }

    #[test]
    fn close_within_tolerance_stays_inside() {
        let mut bars = range_bars();
        bars.push(make_bar(4, 102.5, 101.0, 102.1));
        let series = calculate_breakout(&bars, 3);
        assert_eq!(state_at(&series, 3), BreakoutState::Inside);
    }

    #[test]
    fn close_below_support_breaks_down() {
        let mut bars = range_bars();
        bars.push(make_bar(4, 99.0, 94.0, 95.0));
        let series = calculate_breakout(&bars, 3);
        assert_eq!(state_at(&series, 3), BreakoutState::Below);
    }
}
