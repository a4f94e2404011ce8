//! Promotion gate — fuses universe, rolling, and stress results into a
//! per-symbol pass/fail verdict, then builds the tradable scope.
//!
//! Every check failure is recorded (not just the first), so the attrition
//! funnel in the run report stays diagnosable. Missing upstream results
//! never raise: absent metrics default to worst case and the symbol fails
//! with an explicit `missing_metric` reason.
//!
//! Core safety invariant: the scope is never empty. If no symbol passes,
//! the gate emits exactly the mandated fallback symbol with the fallback
//! flag set — unconditionally, regardless of the fallback symbol's own
//! verdict.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::SymbolMetrics;
use crate::rolling::RollingOutcome;
use crate::stress::StressResult;

// ─── Reason codes ────────────────────────────────────────────────────

/// Machine-readable reason a symbol failed a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCheck {
    /// Fewer trades than the configured minimum.
    MinTradeCount,
    /// Profit factor below the configured floor.
    MinProfitFactor,
    /// Rolling stability score below the configured floor.
    MinStability,
    /// Expectancy retained under cost stress below the configured floor.
    StressDegradation,
    /// Series too short for rolling validation.
    InsufficientData,
    /// An upstream evaluator produced no result for this symbol.
    MissingMetric,
}

impl GateCheck {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MinTradeCount => "min_trade_count",
            Self::MinProfitFactor => "min_profit_factor",
            Self::MinStability => "min_stability",
            Self::StressDegradation => "stress_degradation",
            Self::InsufficientData => "insufficient_data",
            Self::MissingMetric => "missing_metric",
        }
    }
}

impl fmt::Display for GateCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Configuration ───────────────────────────────────────────────────

/// Gate thresholds, validated once at run start and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateThresholds {
    /// Minimum trade count over the full history.
    pub min_trade_count: usize,
    /// Profit factor floor.
    pub min_profit_factor: f64,
    /// Rolling stability floor (fraction of positive folds).
    pub min_stability: f64,
    /// Minimum fraction of base expectancy retained under cost stress.
    pub min_degradation_ratio: f64,
    /// Symbol emitted when nothing passes. Must be in the deploy set.
    pub fallback_symbol: String,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            min_trade_count: 40,
            min_profit_factor: 1.0,
            min_stability: 0.75,
            min_degradation_ratio: 0.25,
            fallback_symbol: "QQQ".into(),
        }
    }
}

/// Errors from gate threshold validation.
#[derive(Debug, Error)]
pub enum GateConfigError {
    #[error("fallback_symbol must be non-empty")]
    EmptyFallback,
    #[error("min_stability must lie in [0, 1] (got {0})")]
    StabilityOutOfRange(f64),
    #[error("min_profit_factor must be finite and non-negative (got {0})")]
    InvalidProfitFactor(f64),
}

impl GateThresholds {
    pub fn validate(&self) -> Result<(), GateConfigError> {
        if self.fallback_symbol.trim().is_empty() {
            return Err(GateConfigError::EmptyFallback);
        }
        if !(0.0..=1.0).contains(&self.min_stability) {
            return Err(GateConfigError::StabilityOutOfRange(self.min_stability));
        }
        if !self.min_profit_factor.is_finite() || self.min_profit_factor < 0.0 {
            return Err(GateConfigError::InvalidProfitFactor(self.min_profit_factor));
        }
        Ok(())
    }
}

// ─── Inputs ──────────────────────────────────────────────────────────

/// Everything the gate knows about one symbol. Any field may be absent —
/// a producer stage that failed to report degrades to a fail decision,
/// never an error.
#[derive(Debug, Clone)]
pub struct SymbolReport {
    pub symbol: String,
    pub universe: Option<SymbolMetrics>,
    pub rolling: Option<RollingOutcome>,
    pub stress: Option<StressResult>,
}

// ─── Verdict ─────────────────────────────────────────────────────────

/// Per-symbol gate decision with every failed check recorded in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateVerdict {
    pub symbol: String,
    pub passed: bool,
    pub reasons: Vec<GateCheck>,
}

impl GateVerdict {
    /// A failing verdict always carries at least one reason.
    fn new(symbol: String, reasons: Vec<GateCheck>) -> Self {
        debug_assert!(
            reasons.iter().all(|r| reasons.iter().filter(|x| *x == r).count() == 1),
            "duplicate reason codes"
        );
        Self {
            symbol,
            passed: reasons.is_empty(),
            reasons,
        }
    }
}

/// The gate's output set: ordered symbols plus the fallback flag.
///
/// Never empty by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradableScope {
    pub symbols: Vec<String>,
    pub is_fallback: bool,
}

// ─── Gate evaluation ─────────────────────────────────────────────────

/// Evaluate the ordered check list for one symbol.
pub fn evaluate_gate(report: &SymbolReport, thresholds: &GateThresholds) -> GateVerdict {
    let mut reasons = Vec::new();

    // Defaulted view of upstream results; absence is recorded once.
    let mut missing = false;

    let metrics = match &report.universe {
        Some(m) => m.clone(),
        None => {
            missing = true;
            SymbolMetrics::neutral()
        }
    };

    let stability = match &report.rolling {
        Some(RollingOutcome::Ok(r)) => r.stability_score,
        Some(RollingOutcome::InsufficientData { .. }) => {
            reasons.push(GateCheck::InsufficientData);
            0.0
        }
        None => {
            missing = true;
            0.0
        }
    };

    let degradation = match &report.stress {
        Some(s) => s.degradation_ratio,
        None => {
            missing = true;
            0.0
        }
    };

    if missing {
        reasons.push(GateCheck::MissingMetric);
    }

    if metrics.trade_count < thresholds.min_trade_count {
        reasons.push(GateCheck::MinTradeCount);
    }
    if metrics.profit_factor < thresholds.min_profit_factor {
        reasons.push(GateCheck::MinProfitFactor);
    }
    if stability < thresholds.min_stability {
        reasons.push(GateCheck::MinStability);
    }
    if degradation < thresholds.min_degradation_ratio {
        reasons.push(GateCheck::StressDegradation);
    }

    GateVerdict::new(report.symbol.clone(), reasons)
}

/// Build the tradable scope from the full verdict set.
///
/// Passed symbols, sorted ascending by identifier so parallel evaluation
/// order cannot leak into the output. When nothing passed, the mandated
/// fallback is emitted unconditionally.
pub fn build_scope(verdicts: &[GateVerdict], thresholds: &GateThresholds) -> TradableScope {
    let mut passed: Vec<String> = verdicts
        .iter()
        .filter(|v| v.passed)
        .map(|v| v.symbol.clone())
        .collect();
    passed.sort();
    passed.dedup();

    if passed.is_empty() {
        return TradableScope {
            symbols: vec![thresholds.fallback_symbol.clone()],
            is_fallback: true,
        };
    }
    TradableScope {
        symbols: passed,
        is_fallback: false,
    }
}
