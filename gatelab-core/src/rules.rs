//! Trade rules — the fixed strategy as a pure function `bars → trade log`.
//!
//! The evaluation pipeline treats the rule-set as an opaque deterministic
//! function: identical (series, params, costs) always produce an identical
//! trade log. No wall clock, no RNG, no I/O.
//!
//! The shipped rule-set is a displacement-reclaim breakout:
//! - long entry when a bar closes above the prior N-bar high by at least
//!   `displacement_atr_mult × ATR`, after the prior bar reclaimed its open
//!   by `reclaim_buffer_atr × ATR`;
//! - initial stop below the entry bar low, target at `rr_target × risk`;
//! - intrabar exit resolution is stop-first (conservative).

use chrono::Timelike;

use crate::cost::CostModel;
use crate::domain::{BarSeries, ExitReason, TradeRecord, TradeSide};
use crate::indicators::{atr, rolling_high};
use crate::params::StrategyParams;

/// A deterministic rule-set producing a trade log from a bar series.
pub trait TradeRules: Send + Sync {
    fn name(&self) -> &str;

    /// Simulate the rule-set over the full series. Must be pure.
    fn simulate(&self, series: &BarSeries, costs: &CostModel) -> Vec<TradeRecord>;
}

/// Displacement-reclaim breakout rules.
#[derive(Debug, Clone)]
pub struct DisplacementReclaim {
    params: StrategyParams,
}

impl DisplacementReclaim {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    fn entry_hour_allowed(&self, hour: u32) -> bool {
        match &self.params.allowed_entry_hours {
            Some(hours) => hours.contains(&hour),
            None => true,
        }
    }
}

struct OpenPosition {
    entry_index: usize,
    entry_price: f64,
    stop_price: f64,
    target_price: f64,
}

impl TradeRules for DisplacementReclaim {
    fn name(&self) -> &str {
        "displacement_reclaim"
    }

    fn simulate(&self, series: &BarSeries, costs: &CostModel) -> Vec<TradeRecord> {
        let bars = series.bars();
        let p = &self.params;
        let atr_series = atr(bars, p.atr_period);
        let prior_high = rolling_high(bars, p.breakout_lookback);

        let mut trades = Vec::new();
        let mut open: Option<OpenPosition> = None;
        let cost = costs.total_cost();

        for i in 1..bars.len() {
            let bar = &bars[i];

            // Exit logic first: stop takes priority over target within a bar.
            if let Some(pos) = &open {
                let (hit_stop, hit_target) = (
                    bar.low <= pos.stop_price,
                    bar.high >= pos.target_price,
                );
                if hit_stop || hit_target {
                    let exit_price = if hit_stop {
                        pos.stop_price
                    } else {
                        pos.target_price
                    };
                    let gross = exit_price - pos.entry_price;
                    trades.push(TradeRecord {
                        symbol: series.symbol().to_string(),
                        side: TradeSide::Long,
                        entry_ts: bars[pos.entry_index].timestamp,
                        entry_price: pos.entry_price,
                        exit_ts: bar.timestamp,
                        exit_price,
                        stop_price: pos.stop_price,
                        target_price: pos.target_price,
                        gross_pnl: gross,
                        cost,
                        net_pnl: gross - cost,
                        bars_held: i - pos.entry_index,
                        exit_reason: if hit_stop {
                            ExitReason::StopHit
                        } else {
                            ExitReason::TargetHit
                        },
                    });
                    open = None;
                }
            }

            if open.is_some() {
                continue;
            }

            // Entry logic: only when flat.
            let bar_atr = atr_series[i];
            let reference_high = prior_high[i];
            if bar_atr.is_nan() || reference_high.is_nan() || bar_atr <= 0.0 {
                continue;
            }
            if !self.entry_hour_allowed(bar.timestamp.hour()) {
                continue;
            }

            let displaced = bar.close > reference_high + p.displacement_atr_mult * bar_atr;
            let prev = &bars[i - 1];
            let reclaimed = prev.close >= prev.open + p.reclaim_buffer_atr * bar_atr;
            if !(displaced && reclaimed) {
                continue;
            }

            let entry_price = bar.close;
            let stop_price = bar.low - p.stop_buffer_atr * bar_atr;
            if stop_price >= entry_price {
                continue; // degenerate risk distance
            }
            let target_price = entry_price + p.rr_target * (entry_price - stop_price);

            open = Some(OpenPosition {
                entry_index: i,
                entry_price,
                stop_price,
                target_price,
            });
        }

        // A position open at series end closes on the last bar's close.
        if let Some(pos) = open {
            if let Some(last) = bars.last() {
                let gross = last.close - pos.entry_price;
                trades.push(TradeRecord {
                    symbol: series.symbol().to_string(),
                    side: TradeSide::Long,
                    entry_ts: bars[pos.entry_index].timestamp,
                    entry_price: pos.entry_price,
                    exit_ts: last.timestamp,
                    exit_price: last.close,
                    stop_price: pos.stop_price,
                    target_price: pos.target_price,
                    gross_pnl: gross,
                    cost,
                    net_pnl: gross - cost,
                    bars_held: bars.len() - 1 - pos.entry_index,
                    exit_reason: ExitReason::EndOfData,
                });
            }
        }

        trades
    }
}
