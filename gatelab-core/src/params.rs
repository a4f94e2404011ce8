//! Strategy parameters — the serializable configuration of the trade rules.
//!
//! `params_id()` is a content-addressable blake3 hash of the canonical JSON
//! encoding, used to deduplicate challenger candidates and to name champions
//! in the audit trail.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters of the displacement-reclaim rule-set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// ATR smoothing period in bars.
    pub atr_period: usize,
    /// Breakout reference window in bars (prior-high lookback).
    pub breakout_lookback: usize,
    /// Minimum close-above-prior-high distance, in ATR multiples.
    pub displacement_atr_mult: f64,
    /// Reward-to-risk multiple for the profit target.
    pub rr_target: f64,
    /// Minimum prior-bar reclaim (close over open), in ATR multiples.
    pub reclaim_buffer_atr: f64,
    /// Stop distance below the entry bar low, in ATR multiples.
    pub stop_buffer_atr: f64,
    /// UTC hours during which entries are allowed. `None` = any hour.
    pub allowed_entry_hours: Option<Vec<u32>>,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            atr_period: 14,
            breakout_lookback: 20,
            displacement_atr_mult: 1.1,
            rr_target: 2.5,
            reclaim_buffer_atr: 0.03,
            stop_buffer_atr: 0.05,
            allowed_entry_hours: None,
        }
    }
}

/// Errors from parameter validation.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },
    #[error("allowed_entry_hours contains invalid hour {hour} (must be < 24)")]
    InvalidHour { hour: u32 },
}

impl StrategyParams {
    /// Validate once at run start; params are immutable afterwards.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.atr_period == 0 {
            return Err(ParamsError::NonPositive {
                field: "atr_period",
            });
        }
        if self.breakout_lookback == 0 {
            return Err(ParamsError::NonPositive {
                field: "breakout_lookback",
            });
        }
        if self.displacement_atr_mult <= 0.0 {
            return Err(ParamsError::NonPositive {
                field: "displacement_atr_mult",
            });
        }
        if self.rr_target <= 0.0 {
            return Err(ParamsError::NonPositive {
                field: "rr_target",
            });
        }
        if let Some(hours) = &self.allowed_entry_hours {
            for &hour in hours {
                if hour >= 24 {
                    return Err(ParamsError::InvalidHour { hour });
                }
            }
        }
        Ok(())
    }

    /// Deterministic content hash of this parameter set.
    pub fn params_id(&self) -> String {
        let json = serde_json::to_string(self).expect("StrategyParams serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
