//! Price-structure pattern detectors.
//!
//! Detectors produce ordinary [`IndicatorSeries`](crate::domain::indicator::IndicatorSeries)
//! so the enrichment table treats them exactly like indicators.

pub mod breakout;
pub mod fair_value_gap;
pub mod trend;

pub use breakout::calculate_breakout;
pub use fair_value_gap::calculate_fair_value_gap;
pub use trend::calculate_trend;
