//! End-to-end research run: signals, candidate backtests, selection per
//! instrument, then one portfolio allocation over the winners.

use crate::domain::backtest::{backtest, BacktestConfig, BacktestResult};
use crate::domain::enrichment::EnrichmentConfig;
use crate::domain::error::{RankfolioError, Result};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::optimizer::{optimize_portfolio, PortfolioConfig, PortfolioWeights};
use crate::domain::ranking::{select_best, RankedStrategy, RankingConfig};
use crate::domain::signal::{enrich_and_signal, SignalConfig};
use crate::domain::strategy::StrategyDefinition;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Every tunable of a research run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub enrichment: EnrichmentConfig,
    pub signals: SignalConfig,
    pub backtest: BacktestConfig,
    pub ranking: RankingConfig,
    pub portfolio: PortfolioConfig,
}

impl EngineConfig {
    /// The configured indicators plus everything the interpreters read.
    pub fn enrichment_plan(&self) -> EnrichmentConfig {
        self.enrichment
            .clone()
            .with_indicators(self.signals.required_indicators())
    }

    /// Fewest bars an instrument needs before it can be scored.
    pub fn min_bars(&self) -> usize {
        self.enrichment_plan().min_bars()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResearchReport {
    /// One outcome per instrument; a failure never affects its siblings.
    pub selections: BTreeMap<String, Result<RankedStrategy>>,
    pub portfolio: Result<PortfolioWeights>,
}

impl ResearchReport {
    pub fn weight(&self, code: &str) -> Option<f64> {
        self.portfolio
            .as_ref()
            .ok()
            .and_then(|p| p.weights.get(code).copied())
    }

    pub fn selected(&self) -> impl Iterator<Item = (&String, &RankedStrategy)> {
        self.selections
            .iter()
            .filter_map(|(code, r)| r.as_ref().ok().map(|s| (code, s)))
    }
}

/// Signals once, every candidate backtested in parallel, best one selected.
pub fn research_instrument(
    code: &str,
    bars: &[OhlcvBar],
    strategies: &[StrategyDefinition],
    config: &EngineConfig,
) -> Result<RankedStrategy> {
    let signals = enrich_and_signal(bars, config)?;

    let results: Vec<BacktestResult> = strategies
        .par_iter()
        .map(|strategy| backtest(code, &signals, bars, strategy, &config.backtest))
        .collect::<Result<Vec<_>>>()?;

    select_best(results, &config.ranking)
}

/// Per-period returns of each selection restricted to the dates they all
/// share, in date order.
pub fn aligned_returns<'a, I>(selections: I) -> BTreeMap<String, Vec<f64>>
where
    I: IntoIterator<Item = (&'a String, &'a RankedStrategy)>,
{
    let series: Vec<(&String, BTreeMap<NaiveDate, f64>)> = selections
        .into_iter()
        .map(|(code, s)| {
            let by_date = s
                .result
                .period_returns
                .iter()
                .map(|p| (p.date, p.value))
                .collect();
            (code, by_date)
        })
        .collect();

    let Some((_, first)) = series.first() else {
        return BTreeMap::new();
    };
    let common: BTreeSet<NaiveDate> = first
        .keys()
        .filter(|d| series.iter().all(|(_, m)| m.contains_key(d)))
        .copied()
        .collect();

    series
        .iter()
        .map(|(code, by_date)| {
            let values = common.iter().filter_map(|d| by_date.get(d).copied()).collect();
            ((*code).clone(), values)
        })
        .collect()
}

pub fn run_research(
    inputs: &BTreeMap<String, Vec<OhlcvBar>>,
    strategies: &[StrategyDefinition],
    config: &EngineConfig,
) -> ResearchReport {
    let selections: BTreeMap<String, Result<RankedStrategy>> = inputs
        .par_iter()
        .map(|(code, bars)| {
            let outcome = research_instrument(code, bars, strategies, config);
            match &outcome {
                Ok(best) => info!(
                    instrument = %code,
                    strategy = %best.strategy_id,
                    score = best.rank_score,
                    "strategy selected"
                ),
                Err(e) => warn!(instrument = %code, error = %e, "instrument failed"),
            }
            (code.clone(), outcome)
        })
        .collect();

    let returns = aligned_returns(
        selections
            .iter()
            .filter_map(|(code, r)| r.as_ref().ok().map(|s| (code, s))),
    );

    let portfolio = if returns.is_empty() {
        Err(RankfolioError::OptimizationInfeasible {
            reason: "no instrument produced a selection".to_string(),
        })
    } else {
        optimize_portfolio(&returns, &config.portfolio)
    };

    match &portfolio {
        Ok(p) => info!(method = %p.method, instruments = p.weights.len(), "portfolio allocated"),
        Err(e) => warn!(error = %e, "portfolio optimization failed"),
    }

    ResearchReport {
        selections,
        portfolio,
    }
}
