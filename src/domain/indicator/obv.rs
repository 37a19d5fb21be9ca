//! OBV (On-Balance Volume) indicator implementation.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

/// Calculate OBV (On-Balance Volume) indicator.
///
/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period; every bar carries a value.
pub fn calculate_obv(bars: &[OhlcvBar]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut obv: f64 = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            obv = bar.volume as f64;
        } else if bar.close > bars[i - 1].close {
            obv += bar.volume as f64;
        } else if bar.close < bars[i - 1].close {
            obv -= bar.volume as f64;
        }

        values.push(IndicatorPoint {
            date: bar.date,
            value: Some(IndicatorValue::Simple(obv)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Obv,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, close: f64, volume: i64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    fn obv_values(series: &IndicatorSeries) -> Vec<f64> {
        series
            .values
            .iter()
            .filter_map(|p| p.value.and_then(|v| v.as_simple()))
            .collect()
    }

    #[test]
    fn obv_accumulates_by_direction() {
        let bars = vec![
            make_bar(1, 10.0, 100),
            make_bar(2, 11.0, 200),
            make_bar(3, 10.5, 50),
            make_bar(4, 10.5, 75),
        ];
        let series = calculate_obv(&bars);
        assert_eq!(obv_values(&series), vec![100.0, 300.0, 250.0, 250.0]);
    }

    #[test]
    fn obv_has_no_warmup() {
        let bars = vec![make_bar(1, 10.0, 100)];
        let series = calculate_obv(&bars);
        assert_eq!(series.first_available(), Some(0));
    }

    #[test]
    fn obv_empty() {
        assert!(calculate_obv(&[]).values.is_empty());
    }
}
