//! Cost stress testing — re-evaluation under amplified transaction costs.
//!
//! The same rule-set runs with every cost component multiplied by a stress
//! factor; the degradation ratio measures how much of the base expectancy
//! survives. A zero base expectancy defines the ratio as 0 — no division
//! by zero, no exception.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatelab_core::{BarSeries, CostModel, TradeRules};

use crate::metrics::SymbolMetrics;
use crate::universe::evaluate_symbol;

// ─── Configuration ───────────────────────────────────────────────────

/// Configuration for the cost stress tester.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StressConfig {
    /// Multiplier applied to every cost component. Must exceed 1 for the
    /// stress to mean anything.
    pub cost_multiplier: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            cost_multiplier: 3.0,
        }
    }
}

/// Errors from stress configuration validation.
#[derive(Debug, Error)]
pub enum StressConfigError {
    #[error("cost_multiplier must be > 1 (got {0})")]
    MultiplierNotAmplifying(f64),
}

impl StressConfig {
    pub fn validate(&self) -> Result<(), StressConfigError> {
        if !(self.cost_multiplier > 1.0) {
            return Err(StressConfigError::MultiplierNotAmplifying(
                self.cost_multiplier,
            ));
        }
        Ok(())
    }
}

// ─── Result ──────────────────────────────────────────────────────────

/// Metrics under amplified costs plus the degradation ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressResult {
    pub symbol: String,
    pub stressed_metrics: SymbolMetrics,
    /// `stressed_expectancy / base_expectancy`; 0 when the base is 0.
    pub degradation_ratio: f64,
}

/// Re-evaluate a symbol with stressed costs against its base metrics.
pub fn run_stress(
    series: &BarSeries,
    rules: &dyn TradeRules,
    base_costs: &CostModel,
    base_metrics: &SymbolMetrics,
    config: &StressConfig,
) -> StressResult {
    let stressed_costs = base_costs.stressed(config.cost_multiplier);
    let stressed = evaluate_symbol(series, rules, &stressed_costs);
    let degradation_ratio = degradation(base_metrics.expectancy, stressed.metrics.expectancy);

    StressResult {
        symbol: series.symbol().to_string(),
        stressed_metrics: stressed.metrics,
        degradation_ratio,
    }
}

/// Degradation ratio with the zero-base edge case pinned to 0.
pub fn degradation(base_expectancy: f64, stressed_expectancy: f64) -> f64 {
    if base_expectancy == 0.0 {
        return 0.0;
    }
    stressed_expectancy / base_expectancy
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatelab_core::{synthetic, DisplacementReclaim, StrategyParams};

    fn rules() -> DisplacementReclaim {
        DisplacementReclaim::new(StrategyParams::default())
    }

    #[test]
    fn degradation_basic() {
        assert!((degradation(0.10, 0.05) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn degradation_zero_base_is_zero() {
        assert_eq!(degradation(0.0, 0.5), 0.0);
        assert_eq!(degradation(0.0, 0.0), 0.0);
    }

    #[test]
    fn degradation_negative_base_preserves_sign_logic() {
        // Base -0.1, stressed -0.2 → ratio 2.0: costs made the loss worse.
        assert!((degradation(-0.1, -0.2) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn stressed_expectancy_never_exceeds_base() {
        // Per-trade cost is a constant deduction, so amplifying it can only
        // lower expectancy (or leave a zero-trade symbol untouched).
        let series = synthetic::bar_series("QQQ", 800, 21);
        let base_costs = CostModel::default();
        let base = evaluate_symbol(&series, &rules(), &base_costs);
        let result = run_stress(
            &series,
            &rules(),
            &base_costs,
            &base.metrics,
            &StressConfig::default(),
        );
        if base.metrics.trade_count > 0 {
            assert!(result.stressed_metrics.expectancy <= base.metrics.expectancy);
        } else {
            assert_eq!(result.degradation_ratio, 0.0);
        }
    }

    #[test]
    fn stress_is_deterministic() {
        let series = synthetic::bar_series("QQQ", 800, 22);
        let base_costs = CostModel::default();
        let base = evaluate_symbol(&series, &rules(), &base_costs);
        let config = StressConfig::default();
        let a = run_stress(&series, &rules(), &base_costs, &base.metrics, &config);
        let b = run_stress(&series, &rules(), &base_costs, &base.metrics, &config);
        assert_eq!(a.stressed_metrics, b.stressed_metrics);
        assert_eq!(a.degradation_ratio, b.degradation_ratio);
    }

    #[test]
    fn multiplier_at_or_below_one_rejected() {
        assert!(StressConfig {
            cost_multiplier: 1.0
        }
        .validate()
        .is_err());
        assert!(StressConfig {
            cost_multiplier: 0.5
        }
        .validate()
        .is_err());
        assert!(StressConfig::default().validate().is_ok());
    }
}
