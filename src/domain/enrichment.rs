//! Enrichment pipeline: cleaned bars plus aligned indicator columns.
//!
//! Every column has one entry per cleaned bar. Rows before the largest
//! warm-up of the requested indicators are masked so that no row carries a
//! partial set of readings.

use crate::domain::error::{RankfolioError, Result};
use crate::domain::indicator::{IndicatorType, IndicatorValue};
use crate::domain::ohlcv::{clean_bars, OhlcvBar};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentConfig {
    pub indicators: Vec<IndicatorType>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            indicators: vec![
                IndicatorType::Rsi(14),
                IndicatorType::Macd {
                    fast: 12,
                    slow: 26,
                    signal: 9,
                },
                IndicatorType::Bollinger {
                    period: 20,
                    stddev_mult_x100: 200,
                },
                IndicatorType::Atr(14),
                IndicatorType::Obv,
                IndicatorType::VolumeSma(20),
                IndicatorType::Breakout { window: 20 },
                IndicatorType::FairValueGap,
                IndicatorType::Trend { window: 30 },
            ],
        }
    }
}

impl EnrichmentConfig {
    /// Adds indicators not already requested, keeping the original order.
    pub fn with_indicators<I: IntoIterator<Item = IndicatorType>>(mut self, extra: I) -> Self {
        for t in extra {
            if !self.indicators.contains(&t) {
                self.indicators.push(t);
            }
        }
        self
    }

    pub fn warmup(&self) -> usize {
        self.indicators.iter().map(|t| t.warmup()).max().unwrap_or(0)
    }

    pub fn min_bars(&self) -> usize {
        self.warmup() + 1
    }
}

/// One indicator value at one date, as exposed to consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorReading {
    pub date: NaiveDate,
    pub indicator: IndicatorType,
    pub value: Option<IndicatorValue>,
}

#[derive(Debug, Clone)]
pub struct IndicatorTable {
    bars: Vec<OhlcvBar>,
    columns: BTreeMap<IndicatorType, Vec<Option<IndicatorValue>>>,
    warmup: usize,
}

impl IndicatorTable {
    /// Hand-built table for interpreter tests.
    #[cfg(test)]
    pub(crate) fn from_columns(
        bars: Vec<OhlcvBar>,
        columns: Vec<(IndicatorType, Vec<Option<IndicatorValue>>)>,
    ) -> Self {
        Self {
            bars,
            columns: columns.into_iter().collect(),
            warmup: 0,
        }
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Number of leading rows masked as unavailable.
    pub fn warmup(&self) -> usize {
        self.warmup
    }

    pub fn indicators(&self) -> impl Iterator<Item = &IndicatorType> {
        self.columns.keys()
    }

    pub fn value(&self, index: usize, indicator: &IndicatorType) -> Option<&IndicatorValue> {
        self.columns
            .get(indicator)
            .and_then(|col| col.get(index))
            .and_then(|v| v.as_ref())
    }

    pub fn row(&self, index: usize) -> Option<IndicatorRow<'_>> {
        (index < self.bars.len()).then_some(IndicatorRow { index, table: self })
    }

    pub fn rows(&self) -> impl Iterator<Item = IndicatorRow<'_>> + '_ {
        (0..self.bars.len()).map(move |index| IndicatorRow { index, table: self })
    }

    /// Lazily yields every reading in date order, indicators in key order.
    pub fn readings(&self) -> impl Iterator<Item = IndicatorReading> + '_ {
        self.bars.iter().enumerate().flat_map(move |(i, bar)| {
            self.columns.iter().map(move |(indicator, col)| IndicatorReading {
                date: bar.date,
                indicator: *indicator,
                value: col[i],
            })
        })
    }
}

/// A view of one enriched bar.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorRow<'a> {
    index: usize,
    table: &'a IndicatorTable,
}

impl<'a> IndicatorRow<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bar(&self) -> &'a OhlcvBar {
        &self.table.bars[self.index]
    }

    pub fn date(&self) -> NaiveDate {
        self.bar().date
    }

    pub fn get(&self, indicator: &IndicatorType) -> Option<&'a IndicatorValue> {
        self.table.value(self.index, indicator)
    }

    pub fn simple(&self, indicator: &IndicatorType) -> Option<f64> {
        self.get(indicator).and_then(|v| v.as_simple())
    }
}

pub fn enrich(bars: &[OhlcvBar], config: &EnrichmentConfig) -> Result<IndicatorTable> {
    let bars = clean_bars(bars);
    let minimum = config.min_bars();
    if bars.len() < minimum {
        return Err(RankfolioError::InsufficientData {
            bars: bars.len(),
            minimum,
        });
    }

    let warmup = config.warmup();
    let mut columns = BTreeMap::new();
    for indicator in &config.indicators {
        let series = indicator.compute(&bars);
        let column: Vec<Option<IndicatorValue>> = series
            .values
            .into_iter()
            .enumerate()
            .map(|(i, p)| if i < warmup { None } else { p.value })
            .collect();
        columns.insert(*indicator, column);
    }

    debug!(
        bars = bars.len(),
        indicators = columns.len(),
        warmup,
        "enriched bar series"
    );

    Ok(IndicatorTable {
        bars,
        columns,
        warmup,
    })
}
