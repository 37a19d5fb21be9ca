//! Weighted aggregation of axis signals into one composite score per bar.
//!
//! score = Σ w_a · sign_a · strength_a / Σ w_a over the axes available at
//! the bar. Unavailable or zero-weight axes drop out of both sums, so the
//! remaining weights renormalize.

use crate::domain::enrichment::{enrich, IndicatorRow, IndicatorTable};
use crate::domain::error::Result;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::research::EngineConfig;
use crate::domain::signal::{Axis, CompositeSignal, Direction, Signal, SignalConfig};
use chrono::NaiveDate;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct AxisWeights {
    pub momentum: f64,
    pub structure: f64,
    pub volume: f64,
    pub volatility: f64,
    pub risk: f64,
}

impl Default for AxisWeights {
    fn default() -> Self {
        Self {
            momentum: 1.0,
            structure: 1.0,
            volume: 1.0,
            volatility: 1.0,
            risk: 1.0,
        }
    }
}

impl AxisWeights {
    pub fn weight(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Momentum => self.momentum,
            Axis::Structure => self.structure,
            Axis::Volume => self.volume,
            Axis::Volatility => self.volatility,
            Axis::Risk => self.risk,
        }
    }
}

pub fn aggregate(date: NaiveDate, mut signals: Vec<Signal>, weights: &AxisWeights) -> CompositeSignal {
    signals.retain(|s| weights.weight(s.axis) > 0.0);
    if signals.is_empty() {
        return CompositeSignal::unavailable(date);
    }
    signals.sort_by_key(|s| s.axis);

    let total_weight: f64 = signals.iter().map(|s| weights.weight(s.axis)).sum();
    let weighted: f64 = signals
        .iter()
        .map(|s| weights.weight(s.axis) * s.signed_strength())
        .sum();
    let score = (weighted / total_weight).clamp(-1.0, 1.0);

    let direction = if score > 0.0 {
        Direction::Bullish
    } else if score < 0.0 {
        Direction::Bearish
    } else {
        // exact cancellation: strongest non-neutral axis wins, earliest axis on ties
        let mut strongest: Option<&Signal> = None;
        for s in signals.iter().filter(|s| s.direction != Direction::Neutral) {
            if strongest.is_none_or(|best| s.strength > best.strength) {
                strongest = Some(s);
            }
        }
        strongest.map_or(Direction::Neutral, |s| s.direction)
    };

    CompositeSignal {
        date,
        score: Some(score),
        direction,
        contributions: signals,
    }
}

pub fn composite_signals(table: &IndicatorTable, config: &SignalConfig) -> Vec<CompositeSignal> {
    let rows: Vec<IndicatorRow<'_>> = table.rows().collect();

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            if i < table.warmup() {
                return CompositeSignal::unavailable(row.date());
            }
            let signals: Vec<Signal> = config
                .interpreters()
                .iter()
                .filter_map(|interpreter| {
                    let lookback = interpreter.lookback().max(1);
                    if i + 1 < lookback {
                        return None;
                    }
                    interpreter.interpret(&rows[i + 1 - lookback..=i])
                })
                .collect();
            aggregate(row.date(), signals, &config.weights)
        })
        .collect()
}

/// Enriches `bars` and scores every cleaned bar. The output has one entry
/// per cleaned bar, in date order.
pub fn enrich_and_signal(bars: &[OhlcvBar], config: &EngineConfig) -> Result<Vec<CompositeSignal>> {
    let table = enrich(bars, &config.enrichment_plan())?;
    let signals = composite_signals(&table, &config.signals);

    debug!(
        bars = table.len(),
        usable = signals.iter().filter(|s| s.is_usable()).count(),
        "composite signals computed"
    );
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::RankfolioError;
    use crate::domain::signal::test_support::bars;
    use proptest::prelude::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn sig(axis: Axis, score: f64) -> Signal {
        Signal::from_score(date(), axis, score)
    }

    #[test]
    fn equal_weights_average_signed_strengths() {
        let c = aggregate(
            date(),
            vec![sig(Axis::Momentum, 0.6), sig(Axis::Volume, -0.2)],
            &AxisWeights::default(),
        );
        assert!((c.score.unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(c.direction, Direction::Bullish);
    }

    #[test]
    fn missing_axes_renormalize() {
        let weights = AxisWeights {
            momentum: 3.0,
            risk: 1.0,
            ..AxisWeights::default()
        };
        let c = aggregate(
            date(),
            vec![sig(Axis::Momentum, 0.4), sig(Axis::Risk, -0.8)],
            &weights,
        );
        // (3*0.4 - 0.8) / 4
        assert!((c.score.unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_axis_is_skipped() {
        let weights = AxisWeights {
            volume: 0.0,
            ..AxisWeights::default()
        };
        let c = aggregate(date(), vec![sig(Axis::Volume, 1.0)], &weights);
        assert!(c.score.is_none());
        assert!(c.contributions.is_empty());
    }

    #[test]
    fn no_signals_is_unusable() {
        let c = aggregate(date(), vec![], &AxisWeights::default());
        assert!(!c.is_usable());
        assert_eq!(c.direction, Direction::Neutral);
    }

    #[test]
    fn cancellation_takes_strongest_direction() {
        let c = aggregate(
            date(),
            vec![
                sig(Axis::Momentum, 0.2),
                sig(Axis::Structure, 0.2),
                sig(Axis::Volatility, -0.4),
            ],
            &AxisWeights::default(),
        );
        assert_eq!(c.score, Some(0.0));
        assert_eq!(c.direction, Direction::Bearish);
    }

    #[test]
    fn cancellation_tie_goes_to_earliest_axis() {
        let c = aggregate(
            date(),
            vec![sig(Axis::Volatility, -0.5), sig(Axis::Momentum, 0.5)],
            &AxisWeights::default(),
        );
        assert_eq!(c.score, Some(0.0));
        assert_eq!(c.direction, Direction::Bullish);
    }

    #[test]
    fn all_neutral_stays_neutral() {
        let c = aggregate(date(), vec![sig(Axis::Risk, 0.0)], &AxisWeights::default());
        assert_eq!(c.score, Some(0.0));
        assert_eq!(c.direction, Direction::Neutral);
    }

    fn wavy_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.4).sin() * 6.0 + (i as f64 * 0.05))
            .collect()
    }

    #[test]
    fn enrich_and_signal_masks_warmup_and_is_deterministic() {
        let config = EngineConfig::default();
        let input = bars(&wavy_closes(80));
        let first = enrich_and_signal(&input, &config).unwrap();
        let second = enrich_and_signal(&input, &config).unwrap();

        assert_eq!(first.len(), 80);
        assert!(first[..33].iter().all(|c| !c.is_usable()));
        assert!(first[33..].iter().all(|c| c.is_usable()));
        assert_eq!(first, second);
    }

    #[test]
    fn enrich_and_signal_rejects_short_series() {
        let err = enrich_and_signal(&bars(&wavy_closes(10)), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, RankfolioError::InsufficientData { bars: 10, .. }));
    }

    proptest! {
        #[test]
        fn composite_score_stays_in_range(
            scores in proptest::collection::vec(-1.0f64..=1.0, 1..=5),
            weights in proptest::collection::vec(0.0f64..5.0, 5),
        ) {
            let weights = AxisWeights {
                momentum: weights[0],
                structure: weights[1],
                volume: weights[2],
                volatility: weights[3],
                risk: weights[4],
            };
            let signals: Vec<Signal> = scores
                .iter()
                .zip(Axis::ALL)
                .map(|(s, axis)| sig(axis, *s))
                .collect();
            let c = aggregate(date(), signals, &weights);
            if let Some(score) = c.score {
                prop_assert!((-1.0..=1.0).contains(&score));
            }
        }
    }
}
