//! Symbol metrics — pure functions over a simulated trade log.
//!
//! Every metric is a pure function: trade list (and series length for
//! exposure) in, scalar out. An empty trade log yields the neutral metric
//! set — legitimately untradeable symbols are a normal outcome, not an
//! error.

use serde::{Deserialize, Serialize};

use gatelab_core::TradeRecord;

/// Aggregate performance metrics for one symbol under one rule-set.
///
/// Immutable once computed; the pipeline recomputes fresh metrics each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMetrics {
    pub trade_count: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Mean net pnl per trade, in price units.
    pub expectancy: f64,
    /// Deepest peak-to-trough drop of the cumulative net-pnl curve,
    /// in price units, reported <= 0.
    pub max_drawdown: f64,
    /// Fraction of bars spent in a position, clamped to [0, 1].
    pub exposure_time: f64,
}

impl SymbolMetrics {
    /// Neutral metrics for a symbol with no qualifying trades.
    pub fn neutral() -> Self {
        Self {
            trade_count: 0,
            win_rate: 0.0,
            profit_factor: 0.0,
            expectancy: 0.0,
            max_drawdown: 0.0,
            exposure_time: 0.0,
        }
    }

    /// Compute all metrics from a trade log and the series bar count.
    pub fn compute(trades: &[TradeRecord], total_bars: usize) -> Self {
        if trades.is_empty() {
            return Self::neutral();
        }
        Self {
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            expectancy: expectancy(trades),
            max_drawdown: max_drawdown(trades),
            exposure_time: exposure_time(trades, total_bars),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades with positive net pnl.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profits / gross losses, capped at 100.0 when losses are ~zero.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > 0.0)
        .map(|t| t.net_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| t.net_pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Mean net pnl per trade.
pub fn expectancy(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.net_pnl).sum::<f64>() / trades.len() as f64
}

/// Deepest peak-to-trough drop of the cumulative net-pnl curve (<= 0).
pub fn max_drawdown(trades: &[TradeRecord]) -> f64 {
    let mut equity = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;

    for trade in trades {
        equity += trade.net_pnl;
        if equity > peak {
            peak = equity;
        }
        let dd = equity - peak;
        if dd < max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Fraction of bars spent in a position, clamped to [0, 1].
pub fn exposure_time(trades: &[TradeRecord], total_bars: usize) -> f64 {
    if total_bars == 0 {
        return 0.0;
    }
    let held: usize = trades.iter().map(|t| t.bars_held).sum();
    (held as f64 / total_bars as f64).clamp(0.0, 1.0)
}
