//! Challenger search — deterministic parameter grid, scored leaderboard.
//!
//! Every candidate runs through the same evaluators the gate uses (full
//! history, rolling folds, cost stress), so champion and challengers are
//! always compared on identical metric dimensions. The leaderboard is
//! regenerated whole each run and ranked by a total order: score
//! descending, tie-broken by `(symbol, params_id)` so output is
//! reproducible regardless of evaluation order.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use gatelab_core::{BarSeries, CostModel, SeriesStore, StrategyParams, DisplacementReclaim};

use crate::metrics::SymbolMetrics;
use crate::rolling::{run_rolling, RollingConfig, RollingOutcome};
use crate::stress::{run_stress, StressConfig};
use crate::universe::evaluate_symbol;

// ─── Search grid ─────────────────────────────────────────────────────

/// Parameter grid explored by the search. Axes multiply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchGrid {
    pub displacement_atr_mult: Vec<f64>,
    pub rr_target: Vec<f64>,
    pub reclaim_buffer_atr: Vec<f64>,
}

impl Default for SearchGrid {
    fn default() -> Self {
        Self {
            displacement_atr_mult: vec![1.0, 1.1, 1.2, 1.3],
            rr_target: vec![2.0, 2.5, 3.0],
            reclaim_buffer_atr: vec![0.02, 0.03, 0.04],
        }
    }
}

impl SearchGrid {
    /// Expand the grid over a base parameter set, in axis order.
    pub fn candidates(&self, base: &StrategyParams) -> Vec<StrategyParams> {
        let mut out = Vec::new();
        for &disp in &self.displacement_atr_mult {
            for &rr in &self.rr_target {
                for &reclaim in &self.reclaim_buffer_atr {
                    out.push(StrategyParams {
                        displacement_atr_mult: disp,
                        rr_target: rr,
                        reclaim_buffer_atr: reclaim,
                        ..base.clone()
                    });
                }
            }
        }
        out
    }
}

// ─── Scoring ─────────────────────────────────────────────────────────

/// Weights of the composite candidate score.
///
/// The formula is configuration, not contract: any weighting works as long
/// as the resulting ranking stays total-ordered and deterministically
/// tie-broken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub expectancy: f64,
    pub stressed_expectancy: f64,
    pub mean_fold_expectancy: f64,
    pub stability: f64,
    pub win_rate: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            expectancy: 0.40,
            stressed_expectancy: 0.25,
            mean_fold_expectancy: 0.20,
            stability: 0.10,
            win_rate: 0.05,
        }
    }
}

// ─── Candidates ──────────────────────────────────────────────────────

/// One evaluated challenger: parameters plus every metric dimension the
/// refresh comparison uses. Ephemeral — persisted only inside the
/// leaderboard artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengerCandidate {
    pub symbol: String,
    pub params: StrategyParams,
    pub metrics: SymbolMetrics,
    pub stressed_expectancy: f64,
    pub mean_fold_expectancy: f64,
    pub stability_score: f64,
    pub score: f64,
}

impl ChallengerCandidate {
    pub fn params_id(&self) -> String {
        self.params.params_id()
    }
}

/// Evaluate one candidate parameter set on one symbol's series.
fn evaluate_candidate(
    series: &BarSeries,
    params: StrategyParams,
    costs: &CostModel,
    rolling_config: &RollingConfig,
    stress_config: &StressConfig,
    weights: &ScoreWeights,
) -> ChallengerCandidate {
    let rules = DisplacementReclaim::new(params.clone());
    let eval = evaluate_symbol(series, &rules, costs);

    let (mean_fold_expectancy, stability_score) =
        match run_rolling(series, &rules, costs, rolling_config) {
            RollingOutcome::Ok(r) => {
                let mean = if r.fold_metrics.is_empty() {
                    0.0
                } else {
                    r.fold_metrics.iter().map(|(_, m)| m.expectancy).sum::<f64>()
                        / r.fold_metrics.len() as f64
                };
                (mean, r.stability_score)
            }
            RollingOutcome::InsufficientData { .. } => (0.0, 0.0),
        };

    let stress = run_stress(series, &rules, costs, &eval.metrics, stress_config);

    let score = weights.expectancy * eval.metrics.expectancy
        + weights.stressed_expectancy * stress.stressed_metrics.expectancy
        + weights.mean_fold_expectancy * mean_fold_expectancy
        + weights.stability * stability_score
        + weights.win_rate * eval.metrics.win_rate;

    ChallengerCandidate {
        symbol: series.symbol().to_string(),
        params,
        metrics: eval.metrics,
        stressed_expectancy: stress.stressed_metrics.expectancy,
        mean_fold_expectancy,
        stability_score,
        score,
    }
}

// ─── Leaderboard ─────────────────────────────────────────────────────

/// Ranked candidate table, regenerated whole each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    entries: Vec<ChallengerCandidate>,
}

impl Leaderboard {
    /// Rank candidates: score descending, ties broken by
    /// `(symbol, params_id)` ascending.
    pub fn from_candidates(mut candidates: Vec<ChallengerCandidate>) -> Self {
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.symbol.cmp(&b.symbol))
                .then_with(|| a.params_id().cmp(&b.params_id()))
        });
        Self {
            entries: candidates,
        }
    }

    pub fn entries(&self) -> &[ChallengerCandidate] {
        &self.entries
    }

    pub fn top(&self) -> Option<&ChallengerCandidate> {
        self.entries.first()
    }

    /// Best-ranked candidate for a specific symbol.
    pub fn top_for_symbol(&self, symbol: &str) -> Option<&ChallengerCandidate> {
        self.entries.iter().find(|c| c.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the artifact CSV, best first. The file is replaced, never
    /// appended.
    pub fn write_csv(&self, path: &Path) -> Result<(), csv::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(csv::Error::from)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for (rank, entry) in self.entries.iter().enumerate() {
            writer.serialize(LeaderboardRow::from_entry(rank + 1, entry))?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

/// Flattened CSV row of one leaderboard entry.
#[derive(Debug, Serialize)]
struct LeaderboardRow {
    rank: usize,
    symbol: String,
    params_id: String,
    displacement_atr_mult: f64,
    rr_target: f64,
    reclaim_buffer_atr: f64,
    trades: usize,
    win_rate: f64,
    expectancy: f64,
    stressed_expectancy: f64,
    mean_fold_expectancy: f64,
    stability_score: f64,
    score: f64,
}

impl LeaderboardRow {
    fn from_entry(rank: usize, entry: &ChallengerCandidate) -> Self {
        Self {
            rank,
            symbol: entry.symbol.clone(),
            params_id: entry.params_id(),
            displacement_atr_mult: entry.params.displacement_atr_mult,
            rr_target: entry.params.rr_target,
            reclaim_buffer_atr: entry.params.reclaim_buffer_atr,
            trades: entry.metrics.trade_count,
            win_rate: entry.metrics.win_rate,
            expectancy: entry.metrics.expectancy,
            stressed_expectancy: entry.stressed_expectancy,
            mean_fold_expectancy: entry.mean_fold_expectancy,
            stability_score: entry.stability_score,
            score: entry.score,
        }
    }
}

// ─── Search orchestration ────────────────────────────────────────────

/// Run the grid search over every symbol with stored history.
#[allow(clippy::too_many_arguments)]
pub fn run_search(
    store: &SeriesStore,
    symbols: &[String],
    base_params: &StrategyParams,
    grid: &SearchGrid,
    costs: &CostModel,
    rolling_config: &RollingConfig,
    stress_config: &StressConfig,
    weights: &ScoreWeights,
) -> Leaderboard {
    let candidates: Vec<ChallengerCandidate> = symbols
        .iter()
        .filter_map(|symbol| store.get(symbol))
        .flat_map(|series| {
            grid.candidates(base_params)
                .into_par_iter()
                .map(|params| {
                    evaluate_candidate(
                        series,
                        params,
                        costs,
                        rolling_config,
                        stress_config,
                        weights,
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect();

    info!(candidates = candidates.len(), "challenger search complete");
    Leaderboard::from_candidates(candidates)
}
