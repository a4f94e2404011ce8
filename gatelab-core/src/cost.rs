//! Cost model — per-trade friction in absolute price units.
//!
//! The trade simulator deducts one round-trip cost (fee + slippage) from
//! each trade's gross pnl. `stressed()` produces an amplified copy for
//! robustness testing without mutating the base model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Round-trip transaction cost assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Commission per round trip, in price units.
    pub fee_per_trade: f64,
    /// Expected slippage per round trip, in price units.
    pub slippage_per_trade: f64,
}

/// Errors from cost model validation.
#[derive(Debug, Error)]
pub enum CostError {
    #[error("cost components must be finite and non-negative (fee={fee}, slippage={slippage})")]
    InvalidComponents { fee: f64, slippage: f64 },
}

impl CostModel {
    pub fn new(fee_per_trade: f64, slippage_per_trade: f64) -> Result<Self, CostError> {
        let ok = fee_per_trade.is_finite()
            && slippage_per_trade.is_finite()
            && fee_per_trade >= 0.0
            && slippage_per_trade >= 0.0;
        if !ok {
            return Err(CostError::InvalidComponents {
                fee: fee_per_trade,
                slippage: slippage_per_trade,
            });
        }
        Ok(Self {
            fee_per_trade,
            slippage_per_trade,
        })
    }

    pub fn frictionless() -> Self {
        Self {
            fee_per_trade: 0.0,
            slippage_per_trade: 0.0,
        }
    }

    /// Total cost deducted from one round trip.
    pub fn total_cost(&self) -> f64 {
        self.fee_per_trade + self.slippage_per_trade
    }

    /// A copy with both components multiplied by `factor`.
    pub fn stressed(&self, factor: f64) -> Self {
        Self {
            fee_per_trade: self.fee_per_trade * factor,
            slippage_per_trade: self.slippage_per_trade * factor,
        }
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            fee_per_trade: 0.01,
            slippage_per_trade: 0.04,
        }
    }
}
