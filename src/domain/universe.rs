//! Instrument universe: code list parsing and bar loading.
//!
//! Codes without data or with too few bars are skipped with a warning; the
//! load only fails when nothing usable remains.

use crate::domain::error::{RankfolioError, Result};
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> std::result::Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData(String),
    InsufficientBars { bars: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct Universe {
    pub bars: BTreeMap<String, Vec<OhlcvBar>>,
    pub skipped: Vec<SkippedCode>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.bars.len()
    }
}

pub fn load_universe(
    data_port: &dyn DataPort,
    codes: &[String],
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    min_bars: usize,
) -> Result<Universe> {
    let mut bars = BTreeMap::new();
    let mut skipped = Vec::new();

    for code in codes {
        let series = match data_port.fetch_ohlcv(code, start_date, end_date) {
            Ok(series) => series,
            Err(e) => {
                warn!(instrument = %code, error = %e, "skipping instrument");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData(e.to_string()),
                });
                continue;
            }
        };

        if series.len() < min_bars {
            warn!(
                instrument = %code,
                bars = series.len(),
                minimum = min_bars,
                "skipping instrument with too few bars"
            );
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::InsufficientBars { bars: series.len() },
            });
            continue;
        }

        info!(instrument = %code, bars = series.len(), "loaded");
        bars.insert(code.clone(), series);
    }

    if bars.is_empty() {
        return Err(RankfolioError::InsufficientData {
            bars: 0,
            minimum: min_bars,
        });
    }

    Ok(Universe { bars, skipped })
}
