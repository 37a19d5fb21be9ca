#![allow(dead_code)]

use chrono::NaiveDate;
pub use rankfolio::domain::ohlcv::OhlcvBar;
use rankfolio::domain::error::RankfolioError;
use rankfolio::domain::signal::{CompositeSignal, Direction};
use rankfolio::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, RankfolioError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(RankfolioError::Data {
                reason: reason.clone(),
            });
        }
        let bars: Vec<OhlcvBar> = self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| start_date.is_none_or(|s| b.date >= s))
                    .filter(|b| end_date.is_none_or(|e| b.date <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(RankfolioError::NoData {
                code: code.to_string(),
            });
        }
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, RankfolioError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(offset: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset as i64)
}

pub fn make_bar(offset: usize, open: f64, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: date(offset),
        open,
        high: open.max(close) * 1.01,
        low: open.min(close) * 0.99,
        close,
        volume: 100_000,
    }
}

/// Bars whose open equals the previous close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            make_bar(i, open, close)
        })
        .collect()
}

/// A deterministic oscillating series around a drift, with a volume
/// pattern that changes over time.
pub fn generate_bars(count: usize, base: f64, drift: f64, amplitude: f64, phase: f64) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64;
            base * (1.0 + drift * t) + amplitude * (t / 5.0 + phase).sin()
        })
        .collect();
    let mut bars = bars_from_closes(&closes);
    for (i, bar) in bars.iter_mut().enumerate() {
        bar.volume = 50_000 + ((i * 7919) % 40_000) as i64;
    }
    bars
}

pub fn flat_bars(count: usize, price: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| OhlcvBar {
            date: date(i),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 10_000,
        })
        .collect()
}

pub fn scores(values: &[f64]) -> Vec<CompositeSignal> {
    values
        .iter()
        .enumerate()
        .map(|(i, &score)| CompositeSignal {
            date: date(i),
            score: Some(score),
            direction: if score > 0.0 {
                Direction::Bullish
            } else if score < 0.0 {
                Direction::Bearish
            } else {
                Direction::Neutral
            },
            contributions: Vec::new(),
        })
        .collect()
}

pub fn write_csv(dir: &std::path::Path, code: &str, bars: &[OhlcvBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date, b.open, b.high, b.low, b.close, b.volume
        ));
    }
    std::fs::write(dir.join(format!("{code}.csv")), content).unwrap();
}
