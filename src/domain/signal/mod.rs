//! Signal interpretation along five axes and composite aggregation.
//!
//! Each [`Interpreter`] sees only the rows of its declared lookback window
//! ending at the bar being scored, so no interpreter can read ahead.

pub mod aggregator;
pub mod momentum;
pub mod risk;
pub mod structure;
pub mod volatility;
pub mod volume;

pub use aggregator::{aggregate, composite_signals, enrich_and_signal, AxisWeights};
pub use momentum::MomentumInterpreter;
pub use risk::RiskInterpreter;
pub use structure::StructureInterpreter;
pub use volatility::VolatilityInterpreter;
pub use volume::VolumeInterpreter;

use crate::domain::enrichment::IndicatorRow;
use crate::domain::indicator::IndicatorType;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    Momentum,
    Structure,
    Volume,
    Volatility,
    Risk,
}

impl Axis {
    pub const ALL: [Axis; 5] = [
        Axis::Momentum,
        Axis::Structure,
        Axis::Volume,
        Axis::Volatility,
        Axis::Risk,
    ];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Momentum => "momentum",
            Axis::Structure => "structure",
            Axis::Volume => "volume",
            Axis::Volatility => "volatility",
            Axis::Risk => "risk",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
            Direction::Neutral => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub date: NaiveDate,
    pub axis: Axis,
    pub direction: Direction,
    /// Always within [0, 1].
    pub strength: f64,
}

impl Signal {
    /// Builds a signal from a signed score; the sign gives the direction and
    /// the clamped magnitude the strength.
    pub fn from_score(date: NaiveDate, axis: Axis, score: f64) -> Self {
        let direction = if score > 0.0 {
            Direction::Bullish
        } else if score < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        };
        Self {
            date,
            axis,
            direction,
            strength: score.abs().min(1.0),
        }
    }

    pub fn signed_strength(&self) -> f64 {
        self.direction.sign() * self.strength
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSignal {
    pub date: NaiveDate,
    /// `None` when no axis was available at this bar.
    pub score: Option<f64>,
    pub direction: Direction,
    pub contributions: Vec<Signal>,
}

impl CompositeSignal {
    pub fn unavailable(date: NaiveDate) -> Self {
        Self {
            date,
            score: None,
            direction: Direction::Neutral,
            contributions: Vec::new(),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.score.is_some()
    }
}

pub trait Interpreter: Send + Sync {
    fn axis(&self) -> Axis;

    /// Indicators this interpreter reads.
    fn indicators(&self) -> Vec<IndicatorType>;

    /// Number of rows, ending at the scored bar, passed to `interpret`.
    fn lookback(&self) -> usize {
        1
    }

    /// `window` holds exactly `lookback()` rows; the last one is the bar
    /// being scored. Returns `None` when the axis cannot be evaluated.
    fn interpret(&self, window: &[IndicatorRow<'_>]) -> Option<Signal>;
}

/// Averages the available components of an axis into one signed score.
pub(crate) fn mean_score(components: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = components.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub weights: AxisWeights,
    pub momentum: MomentumInterpreter,
    pub structure: StructureInterpreter,
    pub volume: VolumeInterpreter,
    pub volatility: VolatilityInterpreter,
    pub risk: RiskInterpreter,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            weights: AxisWeights::default(),
            momentum: MomentumInterpreter::default(),
            structure: StructureInterpreter::default(),
            volume: VolumeInterpreter::default(),
            volatility: VolatilityInterpreter::default(),
            risk: RiskInterpreter::default(),
        }
    }
}

impl SignalConfig {
    pub fn interpreters(&self) -> [&dyn Interpreter; 5] {
        [
            &self.momentum,
            &self.structure,
            &self.volume,
            &self.volatility,
            &self.risk,
        ]
    }

    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        let mut all: Vec<IndicatorType> = self
            .interpreters()
            .iter()
            .flat_map(|i| i.indicators())
            .collect();
        all.sort();
        all.dedup();
        all
    }
}
