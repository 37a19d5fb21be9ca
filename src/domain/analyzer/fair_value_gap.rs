//! Three-bar fair value gap detector.
//!
//! Bullish gap at t: low[t] > high[t-2]. Bearish gap at t: high[t] < low[t-2].
//! The gap size is the uncovered price distance. Warmup: first 2 bars.

use crate::domain::indicator::{GapKind, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_fair_value_gap(bars: &[OhlcvBar]) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i < 2 {
                return IndicatorPoint::unavailable(bar.date);
            }
            let first = &bars[i - 2];
            let (kind, size) = if bar.low > first.high {
                (GapKind::Bullish, bar.low - first.high)
            } else if bar.high < first.low {
                (GapKind::Bearish, first.low - bar.high)
            } else {
                (GapKind::None, 0.0)
            };
            IndicatorPoint {
                date: bar.date,
                value: Some(IndicatorValue::FairValueGap { kind, size }),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::FairValueGap,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1000,
        }
    }

    fn gap_at(series: &IndicatorSeries, i: usize) -> (GapKind, f64) {
        match series.values[i].value {
            Some(IndicatorValue::FairValueGap { kind, size }) => (kind, size),
            other => panic!("expected gap value, got {other:?}"),
        }
    }

    #[test]
    fn bullish_gap() {
        let bars = vec![
            make_bar(1, 101.0, 99.0),
            make_bar(2, 106.0, 100.0),
            make_bar(3, 108.0, 103.0),
        ];
        let series = calculate_fair_value_gap(&bars);
        assert!(!series.values[1].is_available());
        assert_eq!(gap_at(&series, 2), (GapKind::Bullish, 2.0));
    }

    #[test]
    fn bearish_gap() {
        let bars = vec![
            make_bar(1, 101.0, 99.0),
            make_bar(2, 100.0, 94.0),
            make_bar(3, 96.0, 92.0),
        ];
        let series = calculate_fair_value_gap(&bars);
        assert_eq!(gap_at(&series, 2), (GapKind::Bearish, 3.0));
    }

    #[test]
    fn overlapping_bars_have_no_gap() {
        let bars = vec![
            make_bar(1, 101.0, 99.0),
            make_bar(2, 102.0, 100.0),
            make_bar(3, 103.0, 100.5),
        ];
        let series = calculate_fair_value_gap(&bars);
        assert_eq!(gap_at(&series, 2), (GapKind::None, 0.0));
    }
}
