//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as map key)
//! - `IndicatorSeries`: A time series of indicator values
//!
//! A point whose `value` is `None` is not yet available (warm-up). No
//! calculation ever substitutes a numeric default for a missing value.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;

pub use atr::calculate_atr;
pub use bollinger::calculate_bollinger;
pub use ema::{calculate_ema, ema_values};
pub use macd::calculate_macd;
pub use obv::calculate_obv;
pub use rsi::calculate_rsi;
pub use sma::{calculate_sma, calculate_volume_sma, rolling_mean};

use crate::domain::analyzer::{calculate_breakout, calculate_fair_value_gap, calculate_trend};
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<IndicatorValue>,
}

impl IndicatorPoint {
    pub fn unavailable(date: NaiveDate) -> Self {
        Self { date, value: None }
    }

    pub fn is_available(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakoutState {
    Inside,
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GapKind {
    None,
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Breakout {
        support: f64,
        resistance: f64,
        state: BreakoutState,
    },
    FairValueGap {
        kind: GapKind,
        size: f64,
    },
    Trend {
        slope_pct: f64,
        r_squared: f64,
    },
}

impl IndicatorValue {
    pub fn as_simple(&self) -> Option<f64> {
        match self {
            IndicatorValue::Simple(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Obv,
    VolumeSma(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    Breakout {
        window: usize,
    },
    FairValueGap,
    Trend {
        window: usize,
    },
}

impl IndicatorType {
    /// Index of the first bar that can carry a value.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Sma(n)
            | IndicatorType::Ema(n)
            | IndicatorType::VolumeSma(n)
            | IndicatorType::Atr(n) => n.saturating_sub(1),
            IndicatorType::Bollinger { period, .. } => period.saturating_sub(1),
            IndicatorType::Rsi(n) => n,
            IndicatorType::Obv => 0,
            IndicatorType::Macd { fast, slow, signal } => {
                fast.max(slow).saturating_sub(1) + signal.saturating_sub(1)
            }
            IndicatorType::Breakout { window } => window,
            IndicatorType::FairValueGap => 2,
            IndicatorType::Trend { window } => window.saturating_sub(1),
        }
    }

    /// Minimum series length for at least one available value.
    pub fn min_bars(&self) -> usize {
        self.warmup() + 1
    }

    pub fn compute(&self, bars: &[OhlcvBar]) -> IndicatorSeries {
        match *self {
            IndicatorType::Sma(n) => calculate_sma(bars, n),
            IndicatorType::Ema(n) => calculate_ema(bars, n),
            IndicatorType::Rsi(n) => calculate_rsi(bars, n),
            IndicatorType::Atr(n) => calculate_atr(bars, n),
            IndicatorType::Obv => calculate_obv(bars),
            IndicatorType::VolumeSma(n) => calculate_volume_sma(bars, n),
            IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => calculate_bollinger(bars, period, stddev_mult_x100),
            IndicatorType::Breakout { window } => calculate_breakout(bars, window),
            IndicatorType::FairValueGap => calculate_fair_value_gap(bars),
            IndicatorType::Trend { window } => calculate_trend(bars, window),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// A series of the right length with every point unavailable.
    pub fn unavailable(indicator_type: IndicatorType, bars: &[OhlcvBar]) -> Self {
        Self {
            indicator_type,
            values: bars
                .iter()
                .map(|b| IndicatorPoint::unavailable(b.date))
                .collect(),
        }
    }

    pub fn first_available(&self) -> Option<usize> {
        self.values.iter().position(|p| p.is_available())
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
            IndicatorType::Breakout { window } => write!(f, "BREAKOUT({})", window),
            IndicatorType::FairValueGap => write!(f, "FVG"),
            IndicatorType::Trend { window } => write!(f, "TREND({})", window),
        }
    }
}
