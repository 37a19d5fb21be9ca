//! Fill simulation: slippage and commission on percent units.

use crate::domain::strategy::Side;

/// Buying pays up, selling gives up: long entry and short exit fill above
/// the market, short entry and long exit below it.
pub fn entry_fill(side: Side, market_price: f64, slippage_pct: f64) -> f64 {
    let s = slippage_pct / 100.0;
    match side {
        Side::Long => market_price * (1.0 + s),
        Side::Short => market_price * (1.0 - s),
    }
}

pub fn exit_fill(side: Side, market_price: f64, slippage_pct: f64) -> f64 {
    let s = slippage_pct / 100.0;
    match side {
        Side::Long => market_price * (1.0 - s),
        Side::Short => market_price * (1.0 + s),
    }
}

/// Return on entry notional after commission on both legs.
///
/// long:  (exit·(1-c) - entry·(1+c)) / entry
/// short: (entry·(1-c) - exit·(1+c)) / entry
pub fn net_return(side: Side, entry_price: f64, exit_price: f64, commission_pct: f64) -> f64 {
    let c = commission_pct / 100.0;
    match side {
        Side::Long => (exit_price * (1.0 - c) - entry_price * (1.0 + c)) / entry_price,
        Side::Short => (entry_price * (1.0 - c) - exit_price * (1.0 + c)) / entry_price,
    }
}
