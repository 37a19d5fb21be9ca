//! OHLCV bar representation and cleaning.

use chrono::NaiveDate;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// A bar is well-formed when every price is finite and positive, the
    /// range is not inverted and volume is non-negative.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.high >= self.low
            && self.volume >= 0
    }
}

/// Drop malformed bars, sort by date and keep the first bar of any
/// duplicated date. The result has strictly increasing dates.
pub fn clean_bars(bars: &[OhlcvBar]) -> Vec<OhlcvBar> {
    let mut cleaned: Vec<OhlcvBar> = bars.iter().filter(|b| b.is_well_formed()).cloned().collect();
    let malformed = bars.len() - cleaned.len();

    // stable sort keeps input order within a date, so dedup keeps the first
    cleaned.sort_by_key(|b| b.date);
    let before_dedup = cleaned.len();
    cleaned.dedup_by_key(|b| b.date);
    let duplicates = before_dedup - cleaned.len();

    if malformed > 0 || duplicates > 0 {
        warn!(malformed, duplicates, kept = cleaned.len(), "dropped bars during cleaning");
    }

    cleaned
}
