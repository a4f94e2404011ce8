//! Universe evaluation — full-history metrics per symbol.
//!
//! Each symbol is evaluated independently (no shared mutable state), so the
//! fan-out runs on rayon. Results are always returned sorted by symbol;
//! parallel completion order never reaches a consumer.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use gatelab_core::{BarSeries, CostModel, SeriesStore, TradeRecord, TradeRules};

use crate::metrics::SymbolMetrics;

/// Full-history evaluation of one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolEvaluation {
    pub symbol: String,
    pub metrics: SymbolMetrics,
    pub trades: Vec<TradeRecord>,
}

/// Evaluate one symbol's full history under the given rules and costs.
///
/// Deterministic: identical (series, rules, costs) produce identical output.
/// A zero-trade log yields neutral metrics, never an error.
pub fn evaluate_symbol(
    series: &BarSeries,
    rules: &dyn TradeRules,
    costs: &CostModel,
) -> SymbolEvaluation {
    let trades = rules.simulate(series, costs);
    let metrics = SymbolMetrics::compute(&trades, series.len());
    SymbolEvaluation {
        symbol: series.symbol().to_string(),
        metrics,
        trades,
    }
}

/// Evaluate every requested symbol present in the store, in parallel.
///
/// Symbols with no stored series are skipped here; the gate later fails
/// them with an explicit missing-data reason. Output is sorted by symbol.
pub fn evaluate_universe(
    store: &SeriesStore,
    symbols: &[String],
    rules: &dyn TradeRules,
    costs: &CostModel,
) -> Vec<SymbolEvaluation> {
    let mut evaluations: Vec<SymbolEvaluation> = symbols
        .par_iter()
        .filter_map(|symbol| {
            store
                .get(symbol)
                .map(|series| evaluate_symbol(series, rules, costs))
        })
        .collect();
    evaluations.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    info!(
        evaluated = evaluations.len(),
        requested = symbols.len(),
        "universe evaluation complete"
    );
    evaluations
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatelab_core::{synthetic, DisplacementReclaim, StrategyParams};

    fn rules() -> DisplacementReclaim {
        DisplacementReclaim::new(StrategyParams::default())
    }

    fn store_with(symbols: &[&str]) -> SeriesStore {
        let mut store = SeriesStore::new();
        for (i, symbol) in symbols.iter().enumerate() {
            store.insert(synthetic::bar_series(symbol, 600, 40 + i as u64));
        }
        store
    }

    #[test]
    fn evaluation_is_deterministic() {
        let series = synthetic::bar_series("QQQ", 600, 42);
        let costs = CostModel::default();
        let a = evaluate_symbol(&series, &rules(), &costs);
        let b = evaluate_symbol(&series, &rules(), &costs);
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.trades, b.trades);
    }

    #[test]
    fn empty_series_yields_neutral_metrics() {
        let series = BarSeries::new("QQQ", vec![]).unwrap();
        let eval = evaluate_symbol(&series, &rules(), &CostModel::default());
        assert_eq!(eval.metrics, SymbolMetrics::neutral());
        assert!(eval.trades.is_empty());
    }

    #[test]
    fn universe_output_sorted_by_symbol() {
        let store = store_with(&["SPY", "AAPL", "QQQ"]);
        let symbols = vec!["SPY".into(), "AAPL".into(), "QQQ".into()];
        let evals = evaluate_universe(&store, &symbols, &rules(), &CostModel::default());
        let names: Vec<_> = evals.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(names, vec!["AAPL", "QQQ", "SPY"]);
    }

    #[test]
    fn missing_symbol_skipped_not_fatal() {
        let store = store_with(&["QQQ"]);
        let symbols = vec!["QQQ".into(), "IWM".into()];
        let evals = evaluate_universe(&store, &symbols, &rules(), &CostModel::default());
        assert_eq!(evals.len(), 1);
        assert_eq!(evals[0].symbol, "QQQ");
    }

    #[test]
    fn parallel_matches_serial_per_symbol() {
        let store = store_with(&["AAPL", "IWM", "QQQ", "SPY"]);
        let symbols: Vec<String> =
            ["AAPL", "IWM", "QQQ", "SPY"].iter().map(|s| s.to_string()).collect();
        let costs = CostModel::default();
        let parallel = evaluate_universe(&store, &symbols, &rules(), &costs);
        for eval in &parallel {
            let serial = evaluate_symbol(store.get(&eval.symbol).unwrap(), &rules(), &costs);
            assert_eq!(eval.metrics, serial.metrics);
        }
    }
}
