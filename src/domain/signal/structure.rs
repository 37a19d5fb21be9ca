//! Structure axis: breakouts, fair value gaps and trend slope.

use crate::domain::enrichment::IndicatorRow;
use crate::domain::indicator::{BreakoutState, GapKind, IndicatorType, IndicatorValue};
use crate::domain::signal::{mean_score, Axis, Interpreter, Signal};

pub const BREAKOUT_STRENGTH: f64 = 0.8;
pub const GAP_STRENGTH: f64 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct StructureInterpreter {
    pub breakout_window: usize,
    pub trend_window: usize,
    /// Minimum |slope| in percent of price per bar before the trend counts.
    pub trend_threshold_pct: f64,
}

impl Default for StructureInterpreter {
    fn default() -> Self {
        Self {
            breakout_window: 20,
            trend_window: 30,
            trend_threshold_pct: 0.05,
        }
    }
}

impl StructureInterpreter {
    fn breakout(&self) -> IndicatorType {
        IndicatorType::Breakout {
            window: self.breakout_window,
        }
    }

    fn trend(&self) -> IndicatorType {
        IndicatorType::Trend {
            window: self.trend_window,
        }
    }
}

impl Interpreter for StructureInterpreter {
    fn axis(&self) -> Axis {
        Axis::Structure
    }

    fn indicators(&self) -> Vec<IndicatorType> {
        vec![self.breakout(), IndicatorType::FairValueGap, self.trend()]
    }

    fn interpret(&self, window: &[IndicatorRow<'_>]) -> Option<Signal> {
        let row = window.last()?;

        let breakout = match row.get(&self.breakout()) {
            Some(IndicatorValue::Breakout { state, .. }) => Some(match state {
                BreakoutState::Above => BREAKOUT_STRENGTH,
                BreakoutState::Below => -BREAKOUT_STRENGTH,
                BreakoutState::Inside => 0.0,
            }),
            _ => None,
        };

        let gap = match row.get(&IndicatorType::FairValueGap) {
            Some(IndicatorValue::FairValueGap { kind, .. }) => Some(match kind {
                GapKind::Bullish => GAP_STRENGTH,
                GapKind::Bearish => -GAP_STRENGTH,
                GapKind::None => 0.0,
            }),
            _ => None,
        };

        let trend = match row.get(&self.trend()) {
            Some(IndicatorValue::Trend {
                slope_pct,
                r_squared,
            }) => Some(if slope_pct.abs() > self.trend_threshold_pct {
                slope_pct.signum() * r_squared
            } else {
                0.0
            }),
            _ => None,
        };

        let score = mean_score(&[breakout, gap, trend])?;
        Some(Signal::from_score(row.date(), Axis::Structure, score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enrichment::IndicatorTable;
    use crate::domain::signal::test_support::bars;
    use crate::domain::signal::Direction;

    fn table(
        breakout: Option<BreakoutState>,
        gap: Option<GapKind>,
        trend: Option<(f64, f64)>,
    ) -> IndicatorTable {
        let interp = StructureInterpreter::default();
        IndicatorTable::from_columns(
            bars(&[100.0]),
            vec![
                (
                    interp.breakout(),
                    vec![breakout.map(|state| IndicatorValue::Breakout {
                        support: 95.0,
                        resistance: 105.0,
                        state,
                    })],
                ),
                (
                    IndicatorType::FairValueGap,
                    vec![gap.map(|kind| IndicatorValue::FairValueGap { kind, size: 1.0 })],
                ),
                (
                    interp.trend(),
                    vec![trend.map(|(slope_pct, r_squared)| IndicatorValue::Trend {
                        slope_pct,
                        r_squared,
                    })],
                ),
            ],
        )
    }

    fn interpret(table: &IndicatorTable) -> Option<Signal> {
        let rows: Vec<_> = table.rows().collect();
        StructureInterpreter::default().interpret(&rows)
    }

    #[test]
    fn breakout_alone() {
        let s = interpret(&table(Some(BreakoutState::Above), None, None)).unwrap();
        assert_eq!(s.direction, Direction::Bullish);
        assert!((s.strength - BREAKOUT_STRENGTH).abs() < 1e-12);
    }

    #[test]
    fn bearish_gap_and_inside_range_average() {
        let s = interpret(&table(Some(BreakoutState::Inside), Some(GapKind::Bearish), None)).unwrap();
        assert_eq!(s.direction, Direction::Bearish);
        assert!((s.strength - GAP_STRENGTH / 2.0).abs() < 1e-12);
    }

    #[test]
    fn weak_trend_is_ignored() {
        let s = interpret(&table(None, None, Some((0.01, 0.9)))).unwrap();
        assert_eq!(s.direction, Direction::Neutral);
    }

    #[test]
    fn strong_trend_scales_by_fit() {
        let s = interpret(&table(None, None, Some((-0.4, 0.6)))).unwrap();
        assert_eq!(s.direction, Direction::Bearish);
        assert!((s.strength - 0.6).abs() < 1e-12);
    }

    #[test]
    fn unavailable_when_no_component() {
        assert!(interpret(&table(None, None, None)).is_none());
    }
}
