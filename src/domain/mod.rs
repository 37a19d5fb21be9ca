//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod indicator_parser;
pub mod analyzer;
pub mod enrichment;
pub mod signal;
pub mod strategy;
pub mod position;
pub mod execution;
pub mod backtest;
pub mod metrics;
pub mod ranking;
pub mod optimizer;
pub mod research;
pub mod universe;
pub mod config_validation;
pub mod error;
