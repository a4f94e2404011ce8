//! Rolling validation — time-ordered folds and a cross-fold stability score.
//!
//! The series is partitioned into contiguous index slices; concatenating the
//! folds reproduces the series exactly, and each fold is evaluated on its
//! own sub-series only, so no information crosses a fold boundary. Fold
//! boundaries are positional, not calendar-based, which tolerates missing
//! sessions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatelab_core::{BarSeries, CostModel, TradeRules};

use crate::metrics::SymbolMetrics;
use crate::universe::evaluate_symbol;

// ─── Configuration ───────────────────────────────────────────────────

/// Configuration for rolling validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingConfig {
    /// Number of folds.
    pub n_folds: usize,
    /// Minimum bars each fold must span for the split to be meaningful.
    pub min_bars_per_fold: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            n_folds: 4,
            min_bars_per_fold: 60,
        }
    }
}

/// Errors from rolling configuration validation.
#[derive(Debug, Error)]
pub enum RollingConfigError {
    #[error("n_folds must be >= 1")]
    ZeroFolds,
}

impl RollingConfig {
    pub fn validate(&self) -> Result<(), RollingConfigError> {
        if self.n_folds == 0 {
            return Err(RollingConfigError::ZeroFolds);
        }
        Ok(())
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Per-fold metrics plus the aggregate stability score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingResult {
    pub symbol: String,
    /// `(fold_index, metrics)` in chronological fold order.
    pub fold_metrics: Vec<(usize, SymbolMetrics)>,
    /// Fraction of folds with positive expectancy, clamped to [0, 1].
    pub stability_score: f64,
}

/// Outcome of rolling validation for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RollingOutcome {
    Ok(RollingResult),
    /// Series too short to form the configured folds. The gate fails the
    /// symbol with an explicit reason; it is never silently skipped.
    InsufficientData { symbol: String, bars: usize },
}

impl RollingOutcome {
    pub fn result(&self) -> Option<&RollingResult> {
        match self {
            RollingOutcome::Ok(r) => Some(r),
            RollingOutcome::InsufficientData { .. } => None,
        }
    }
}

// ─── Fold splitting ──────────────────────────────────────────────────

/// Index boundaries `[start, end)` for each fold.
///
/// `fold_size = n / n_folds`; the last fold absorbs the remainder so the
/// folds partition the series exactly.
pub fn fold_bounds(total_bars: usize, n_folds: usize) -> Vec<(usize, usize)> {
    if n_folds == 0 || total_bars == 0 {
        return Vec::new();
    }
    let fold_size = total_bars / n_folds;
    if fold_size == 0 {
        return Vec::new();
    }
    (0..n_folds)
        .map(|i| {
            let start = i * fold_size;
            let end = if i == n_folds - 1 {
                total_bars
            } else {
                (i + 1) * fold_size
            };
            (start, end)
        })
        .collect()
}

// ─── Rolling validation ──────────────────────────────────────────────

/// Run rolling validation for one symbol.
pub fn run_rolling(
    series: &BarSeries,
    rules: &dyn TradeRules,
    costs: &CostModel,
    config: &RollingConfig,
) -> RollingOutcome {
    let n = series.len();
    if n < config.n_folds * config.min_bars_per_fold {
        return RollingOutcome::InsufficientData {
            symbol: series.symbol().to_string(),
            bars: n,
        };
    }

    let bounds = fold_bounds(n, config.n_folds);
    let fold_metrics: Vec<(usize, SymbolMetrics)> = bounds
        .iter()
        .enumerate()
        .map(|(idx, &(start, end))| {
            let fold_series = series.slice(start, end);
            let eval = evaluate_symbol(&fold_series, rules, costs);
            (idx, eval.metrics)
        })
        .collect();

    let stability_score = stability_from_folds(&fold_metrics);

    RollingOutcome::Ok(RollingResult {
        symbol: series.symbol().to_string(),
        fold_metrics,
        stability_score,
    })
}

/// Stability score reproducible from fold metrics alone:
/// positive-expectancy folds / total folds, clamped to [0, 1].
pub fn stability_from_folds(fold_metrics: &[(usize, SymbolMetrics)]) -> f64 {
    if fold_metrics.is_empty() {
        return 0.0;
    }
    let positive = fold_metrics
        .iter()
        .filter(|(_, m)| m.expectancy > 0.0)
        .count();
    (positive as f64 / fold_metrics.len() as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatelab_core::{synthetic, DisplacementReclaim, StrategyParams};

    fn rules() -> DisplacementReclaim {
        DisplacementReclaim::new(StrategyParams::default())
    }

    // ── Fold bounds ──

    #[test]
    fn folds_partition_exactly() {
        let bounds = fold_bounds(1003, 4);
        assert_eq!(bounds.len(), 4);
        assert_eq!(bounds[0], (0, 250));
        assert_eq!(bounds[3], (750, 1003)); // last fold absorbs the remainder
        for pair in bounds.windows(2) {
            assert_eq!(pair[0].1, pair[1].0); // contiguous, no gaps
        }
    }

    #[test]
    fn folds_chronological() {
        let bounds = fold_bounds(400, 4);
        for pair in bounds.windows(2) {
            assert!(pair[0].0 < pair[1].0);
        }
    }

    #[test]
    fn fold_bounds_degenerate_inputs() {
        assert!(fold_bounds(0, 4).is_empty());
        assert!(fold_bounds(100, 0).is_empty());
        assert!(fold_bounds(3, 4).is_empty()); // fold_size would be zero
    }

    // ── Stability score ──

    fn metrics_with_expectancy(e: f64) -> SymbolMetrics {
        SymbolMetrics {
            expectancy: e,
            ..SymbolMetrics::neutral()
        }
    }

    #[test]
    fn stability_counts_positive_folds() {
        let folds = vec![
            (0, metrics_with_expectancy(0.5)),
            (1, metrics_with_expectancy(-0.1)),
            (2, metrics_with_expectancy(0.2)),
            (3, metrics_with_expectancy(0.0)), // zero is not positive
        ];
        assert!((stability_from_folds(&folds) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn stability_empty_folds_is_zero() {
        assert_eq!(stability_from_folds(&[]), 0.0);
    }

    #[test]
    fn stability_bounds() {
        let all_pos = vec![(0, metrics_with_expectancy(1.0)); 4];
        assert_eq!(stability_from_folds(&all_pos), 1.0);
        let all_neg = vec![(0, metrics_with_expectancy(-1.0)); 4];
        assert_eq!(stability_from_folds(&all_neg), 0.0);
    }

    // ── Rolling validation ──

    #[test]
    fn short_series_is_insufficient_data() {
        let series = synthetic::bar_series("QQQ", 100, 7);
        let config = RollingConfig {
            n_folds: 4,
            min_bars_per_fold: 60,
        };
        let outcome = run_rolling(&series, &rules(), &CostModel::default(), &config);
        match outcome {
            RollingOutcome::InsufficientData { symbol, bars } => {
                assert_eq!(symbol, "QQQ");
                assert_eq!(bars, 100);
            }
            RollingOutcome::Ok(_) => panic!("expected insufficient data"),
        }
    }

    #[test]
    fn rolling_produces_one_entry_per_fold() {
        let series = synthetic::bar_series("QQQ", 800, 7);
        let config = RollingConfig::default();
        let outcome = run_rolling(&series, &rules(), &CostModel::default(), &config);
        let result = outcome.result().expect("enough bars");
        assert_eq!(result.fold_metrics.len(), config.n_folds);
        let indices: Vec<_> = result.fold_metrics.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn stability_reproducible_from_fold_metrics() {
        let series = synthetic::bar_series("QQQ", 800, 11);
        let outcome = run_rolling(
            &series,
            &rules(),
            &CostModel::default(),
            &RollingConfig::default(),
        );
        let result = outcome.result().unwrap();
        assert!(
            (result.stability_score - stability_from_folds(&result.fold_metrics)).abs() < 1e-12
        );
        assert!((0.0..=1.0).contains(&result.stability_score));
    }

    #[test]
    fn rolling_is_deterministic() {
        let series = synthetic::bar_series("QQQ", 800, 13);
        let config = RollingConfig::default();
        let a = run_rolling(&series, &rules(), &CostModel::default(), &config);
        let b = run_rolling(&series, &rules(), &CostModel::default(), &config);
        match (a, b) {
            (RollingOutcome::Ok(x), RollingOutcome::Ok(y)) => {
                assert_eq!(x.fold_metrics, y.fold_metrics);
                assert_eq!(x.stability_score, y.stability_score);
            }
            _ => panic!("expected Ok outcomes"),
        }
    }

    #[test]
    fn zero_folds_config_rejected() {
        let config = RollingConfig {
            n_folds: 0,
            min_bars_per_fold: 60,
        };
        assert!(config.validate().is_err());
    }
}
