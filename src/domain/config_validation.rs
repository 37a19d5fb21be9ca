//! Configuration validation.
//!
//! Turns raw INI values into typed engine, data and strategy configs. Every
//! key is optional unless stated and falls back to the engine default;
//! present values are checked and rejected with the section and key named.

use crate::domain::backtest::BacktestConfig;
use crate::domain::enrichment::EnrichmentConfig;
use crate::domain::error::{RankfolioError, Result};
use crate::domain::indicator_parser::parse_indicators;
use crate::domain::optimizer::{
    BoundsConfig, MarkowitzConfig, OptimizerMethod, PortfolioConfig, WeightBounds,
};
use crate::domain::ranking::RankingConfig;
use crate::domain::research::EngineConfig;
use crate::domain::signal::{
    AxisWeights, MomentumInterpreter, RiskInterpreter, SignalConfig, StructureInterpreter,
    VolatilityInterpreter, VolumeInterpreter,
};
use crate::domain::strategy::{Side, StrategyDefinition};
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;

const STRATEGY_PREFIX: &str = "strategy.";
const BOUNDS_PREFIX: &str = "bounds.";

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub directory: PathBuf,
    pub instruments: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> RankfolioError {
    RankfolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> RankfolioError {
    RankfolioError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn double(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64> {
    match config.get_double(section, key) {
        Ok(Some(v)) if v.is_finite() => Ok(v),
        Ok(Some(v)) => Err(invalid(section, key, format!("{key} must be finite, got {v}"))),
        Ok(None) => Ok(default),
        Err(_) => Err(invalid(section, key, format!("{key} must be a number"))),
    }
}

fn non_negative(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64> {
    let value = double(config, section, key, default)?;
    if value < 0.0 {
        return Err(invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(value)
}

fn positive(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64> {
    let value = double(config, section, key, default)?;
    if value <= 0.0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value)
}

fn fraction(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64> {
    let value = double(config, section, key, default)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(section, key, format!("{key} must be between 0 and 1")));
    }
    Ok(value)
}

fn count(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> Result<usize> {
    match config.get_int(section, key) {
        Ok(Some(v)) if v >= 0 => Ok(v as usize),
        Ok(Some(_)) => Err(invalid(section, key, format!("{key} must be non-negative"))),
        Ok(None) => Ok(default),
        Err(_) => Err(invalid(section, key, format!("{key} must be an integer"))),
    }
}

fn period(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> Result<usize> {
    let value = count(config, section, key, default)?;
    if value == 0 {
        return Err(invalid(section, key, format!("{key} must be at least 1")));
    }
    Ok(value)
}

fn optional_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<NaiveDate>> {
    config
        .get_string(section, key)
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
                invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))
            })
        })
        .transpose()
}

pub fn build_data_config(config: &dyn ConfigPort) -> Result<DataConfig> {
    let directory = config
        .get_string("data", "directory")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing("data", "directory"))?;

    let instruments = match config.get_string("data", "instruments") {
        Some(s) if !s.trim().is_empty() => {
            parse_codes(&s).map_err(|e| invalid("data", "instruments", e.to_string()))?
        }
        _ => return Err(missing("data", "instruments")),
    };

    let start_date = optional_date(config, "data", "start_date")?;
    let end_date = optional_date(config, "data", "end_date")?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start >= end {
            return Err(invalid(
                "data",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }

    Ok(DataConfig {
        directory: PathBuf::from(directory.trim()),
        instruments,
        start_date,
        end_date,
    })
}

fn build_enrichment(config: &dyn ConfigPort) -> Result<EnrichmentConfig> {
    match config.get_string("enrichment", "indicators") {
        Some(list) => {
            let indicators = parse_indicators(&list)
                .map_err(|e| invalid("enrichment", "indicators", e.to_string()))?;
            Ok(EnrichmentConfig { indicators })
        }
        None => Ok(EnrichmentConfig::default()),
    }
}

fn build_signals(config: &dyn ConfigPort) -> Result<SignalConfig> {
    const S: &str = "signals";
    let d = SignalConfig::default();

    let weights = AxisWeights {
        momentum: non_negative(config, S, "weight_momentum", d.weights.momentum)?,
        structure: non_negative(config, S, "weight_structure", d.weights.structure)?,
        volume: non_negative(config, S, "weight_volume", d.weights.volume)?,
        volatility: non_negative(config, S, "weight_volatility", d.weights.volatility)?,
        risk: non_negative(config, S, "weight_risk", d.weights.risk)?,
    };
    let total = weights.momentum
        + weights.structure
        + weights.volume
        + weights.volatility
        + weights.risk;
    if total <= 0.0 {
        return Err(invalid(S, "weight_momentum", "at least one axis weight must be positive"));
    }

    let momentum = MomentumInterpreter {
        rsi_period: period(config, S, "rsi_period", d.momentum.rsi_period)?,
        oversold: double(config, S, "rsi_oversold", d.momentum.oversold)?,
        overbought: double(config, S, "rsi_overbought", d.momentum.overbought)?,
        macd_fast: period(config, S, "macd_fast", d.momentum.macd_fast)?,
        macd_slow: period(config, S, "macd_slow", d.momentum.macd_slow)?,
        macd_signal: period(config, S, "macd_signal", d.momentum.macd_signal)?,
    };
    if !(0.0 < momentum.oversold
        && momentum.oversold < momentum.overbought
        && momentum.overbought < 100.0)
    {
        return Err(invalid(
            S,
            "rsi_oversold",
            "require 0 < rsi_oversold < rsi_overbought < 100",
        ));
    }
    if momentum.macd_fast >= momentum.macd_slow {
        return Err(invalid(S, "macd_fast", "macd_fast must be below macd_slow"));
    }

    let structure = StructureInterpreter {
        breakout_window: period(config, S, "breakout_window", d.structure.breakout_window)?,
        trend_window: period(config, S, "trend_window", d.structure.trend_window)?,
        trend_threshold_pct: non_negative(
            config,
            S,
            "trend_threshold_pct",
            d.structure.trend_threshold_pct,
        )?,
    };
    if structure.trend_window < 2 {
        return Err(invalid(S, "trend_window", "trend_window must be at least 2"));
    }

    let volume = VolumeInterpreter {
        volume_period: period(config, S, "volume_period", d.volume.volume_period)?,
        spike_multiplier: positive(config, S, "spike_multiplier", d.volume.spike_multiplier)?,
        divergence_window: period(config, S, "divergence_window", d.volume.divergence_window)?,
    };

    let stddev = positive(
        config,
        S,
        "bollinger_stddev",
        d.volatility.stddev_mult_x100 as f64 / 100.0,
    )?;
    let volatility = VolatilityInterpreter {
        period: period(config, S, "bollinger_period", d.volatility.period)?,
        stddev_mult_x100: (stddev * 100.0).round() as u32,
    };

    let risk = RiskInterpreter {
        atr_period: period(config, S, "atr_period", d.risk.atr_period)?,
        window: period(config, S, "risk_window", d.risk.window)?,
        elevated_ratio: positive(config, S, "elevated_ratio", d.risk.elevated_ratio)?,
    };

    Ok(SignalConfig {
        weights,
        momentum,
        structure,
        volume,
        volatility,
        risk,
    })
}

fn build_backtest(config: &dyn ConfigPort) -> Result<BacktestConfig> {
    const S: &str = "backtest";
    let d = BacktestConfig::default();
    Ok(BacktestConfig {
        commission_pct: non_negative(config, S, "commission_pct", d.commission_pct)?,
        slippage_pct: non_negative(config, S, "slippage_pct", d.slippage_pct)?,
        annualization_factor: positive(
            config,
            S,
            "annualization_factor",
            d.annualization_factor,
        )?,
    })
}

fn build_ranking(config: &dyn ConfigPort) -> Result<RankingConfig> {
    const S: &str = "ranking";
    let d = RankingConfig::default();
    let ranking = RankingConfig {
        weight_sharpe: non_negative(config, S, "weight_sharpe", d.weight_sharpe)?,
        weight_drawdown: non_negative(config, S, "weight_drawdown", d.weight_drawdown)?,
        weight_win_rate: non_negative(config, S, "weight_win_rate", d.weight_win_rate)?,
        min_trades: count(config, S, "min_trades", d.min_trades)?,
    };
    if ranking.weight_sharpe + ranking.weight_drawdown + ranking.weight_win_rate <= 0.0 {
        return Err(invalid(S, "weight_sharpe", "at least one ranking weight must be positive"));
    }
    Ok(ranking)
}

fn build_bounds(config: &dyn ConfigPort, section: &str, default: WeightBounds) -> Result<WeightBounds> {
    let bounds = WeightBounds {
        min: fraction(config, section, "min_weight", default.min)?,
        max: fraction(config, section, "max_weight", default.max)?,
    };
    if bounds.min > bounds.max {
        return Err(invalid(section, "min_weight", "min_weight must not exceed max_weight"));
    }
    Ok(bounds)
}

fn build_portfolio(config: &dyn ConfigPort) -> Result<PortfolioConfig> {
    const S: &str = "portfolio";
    let d = PortfolioConfig::default();

    let method = match config.get_string(S, "method") {
        Some(m) => m
            .parse::<OptimizerMethod>()
            .map_err(|reason| invalid(S, "method", reason))?,
        None => d.method,
    };

    let default = build_bounds(config, S, d.bounds.default)?;
    let mut bounds = BoundsConfig {
        default,
        ..BoundsConfig::default()
    };
    for section in config.sections() {
        if let Some(code) = section.strip_prefix(BOUNDS_PREFIX) {
            let b = build_bounds(config, &section, default)?;
            bounds.per_instrument.insert(code.to_uppercase(), b);
        }
    }

    let dm = &d.markowitz;
    let markowitz = MarkowitzConfig {
        risk_free_rate: double(config, S, "risk_free_rate", dm.risk_free_rate)?,
        shrinkage: fraction(config, S, "shrinkage", dm.shrinkage)?,
        condition_threshold: non_negative(
            config,
            S,
            "condition_threshold",
            dm.condition_threshold,
        )?,
        max_iterations: period(config, S, "max_iterations", dm.max_iterations)?,
        tolerance: positive(config, S, "tolerance", dm.tolerance)?,
    };

    Ok(PortfolioConfig {
        method,
        bounds,
        variance_floor: non_negative(config, S, "variance_floor", d.variance_floor)?,
        markowitz,
    })
}

pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig> {
    Ok(EngineConfig {
        enrichment: build_enrichment(config)?,
        signals: build_signals(config)?,
        backtest: build_backtest(config)?,
        ranking: build_ranking(config)?,
        portfolio: build_portfolio(config)?,
    })
}

fn build_strategy(config: &dyn ConfigPort, section: &str, id: &str) -> Result<StrategyDefinition> {
    let side = match config.get_string(section, "side") {
        Some(s) => s.parse::<Side>().map_err(|reason| invalid(section, "side", reason))?,
        None => Side::Long,
    };

    let threshold = |key: &str| -> Result<f64> {
        let value = match config.get_double(section, key) {
            Ok(Some(v)) => v,
            Ok(None) => return Err(missing(section, key)),
            Err(_) => return Err(invalid(section, key, format!("{key} must be a number"))),
        };
        if !(-1.0..=1.0).contains(&value) {
            return Err(invalid(section, key, format!("{key} must be between -1 and 1")));
        }
        Ok(value)
    };

    let mut strategy = StrategyDefinition::new(
        id,
        side,
        threshold("entry_threshold")?,
        threshold("exit_threshold")?,
    );

    let stop = non_negative(config, section, "stop_loss_pct", 0.0)?;
    if stop > 0.0 {
        strategy = strategy.with_stop_loss(stop);
    }
    let target = non_negative(config, section, "take_profit_pct", 0.0)?;
    if target > 0.0 {
        strategy = strategy.with_take_profit(target);
    }
    let cap = count(config, section, "max_holding_bars", 0)?;
    if cap > 0 {
        strategy = strategy.with_max_holding_bars(cap);
    }
    Ok(strategy)
}

/// One candidate per `[strategy.<id>]` section, ordered by id.
pub fn build_strategies(config: &dyn ConfigPort) -> Result<Vec<StrategyDefinition>> {
    let strategies = config
        .sections()
        .iter()
        .filter_map(|section| {
            section
                .strip_prefix(STRATEGY_PREFIX)
                .map(|id| build_strategy(config, section, id))
        })
        .collect::<Result<Vec<_>>>()?;

    if strategies.is_empty() {
        return Err(missing("strategy.<id>", "entry_threshold"));
    }
    Ok(strategies)
}
