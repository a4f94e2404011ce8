//! Pipeline orchestration — one run, end to end.
//!
//! Order: refresh stored series (fail-closed) → per-symbol evaluation fan
//! out (universe, rolling, stress) → promotion gate → tradable scope →
//! deploy-scope validation → challenger search → refresh engine.
//!
//! A deploy-scope violation aborts before the champion store or audit log
//! is touched. Everything upstream of the gate is parallel per symbol and
//! combined in symbol order, so two runs over frozen inputs produce
//! identical summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use gatelab_core::{BarSeriesSource, DisplacementReclaim, RefreshStatus, SeriesStore};

use crate::audit::AuditLog;
use crate::challenger::{run_search, Leaderboard};
use crate::champion::ChampionStore;
use crate::config::{ConfigError, RunConfig};
use crate::deploy::{validate_scope, DeployScopeViolation};
use crate::gate::{build_scope, evaluate_gate, GateCheck, GateVerdict, SymbolReport, TradableScope};
use crate::refresh::{RefreshEngine, RefreshError, RefreshOutcome};
use crate::report::{attrition_funnel, build_matrix, write_matrix, write_scope, MatrixRow};
use crate::rolling::run_rolling;
use crate::stress::run_stress;
use crate::universe::evaluate_symbol;

/// Everything one run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub refresh_statuses: Vec<(String, RefreshStatus)>,
    pub reports: Vec<SymbolReport>,
    pub verdicts: Vec<GateVerdict>,
    pub scope: TradableScope,
    pub deploy_message: String,
    pub matrix: Vec<MatrixRow>,
    pub funnel: BTreeMap<GateCheck, usize>,
    pub leaderboard: Leaderboard,
    pub refresh: RefreshOutcome,
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Fatal policy breach — distinct from every gate-level outcome.
    #[error(transparent)]
    DeployScope(#[from] DeployScopeViolation),
    #[error(transparent)]
    Refresh(#[from] RefreshError),
    #[error("artifact write error: {0}")]
    Artifact(#[from] csv::Error),
}

/// Execute one full pipeline run.
pub fn run_pipeline(
    config: &RunConfig,
    source: &dyn BarSeriesSource,
    store: &mut SeriesStore,
    run_ts: DateTime<Utc>,
) -> Result<RunSummary, PipelineError> {
    config.validate()?;

    // ── Series refresh: fail closed, never shrink stored history ──
    let refresh_statuses = store.refresh_all(source, &config.universe);

    // ── Per-symbol evaluation fan-out ──
    let rules = DisplacementReclaim::new(config.strategy.clone());
    let mut reports: Vec<SymbolReport> = config
        .universe
        .par_iter()
        .map(|symbol| match store.get(symbol) {
            Some(series) => {
                let eval = evaluate_symbol(series, &rules, &config.costs);
                let rolling = run_rolling(series, &rules, &config.costs, &config.rolling);
                let stress = run_stress(
                    series,
                    &rules,
                    &config.costs,
                    &eval.metrics,
                    &config.stress,
                );
                SymbolReport {
                    symbol: symbol.clone(),
                    universe: Some(eval.metrics),
                    rolling: Some(rolling),
                    stress: Some(stress),
                }
            }
            None => {
                warn!(symbol = %symbol, "no stored series; symbol will fail the gate");
                SymbolReport {
                    symbol: symbol.clone(),
                    universe: None,
                    rolling: None,
                    stress: None,
                }
            }
        })
        .collect();
    reports.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    // ── Gate and scope ──
    let verdicts: Vec<GateVerdict> = reports
        .iter()
        .map(|report| evaluate_gate(report, &config.gate))
        .collect();
    let scope = build_scope(&verdicts, &config.gate);
    info!(scope = ?scope.symbols, fallback = scope.is_fallback, "tradable scope resolved");

    let matrix = build_matrix(&reports, &verdicts);
    write_matrix(&matrix, &config.artifacts.promotion_matrix)?;
    write_scope(&scope, &config.artifacts.tradable_scope)?;
    let funnel = attrition_funnel(&verdicts);

    // ── Deploy-scope validation: fatal before any champion/audit write ──
    let deploy_message = validate_scope(&scope, &config.deploy)?;
    info!("{deploy_message}");

    // ── Challenger search over the mandated symbol + gate-eligible set ──
    let mut search_symbols: Vec<String> = if scope.is_fallback {
        Vec::new()
    } else {
        scope.symbols.clone()
    };
    if !search_symbols.contains(&config.deploy.mandated_symbol) {
        search_symbols.push(config.deploy.mandated_symbol.clone());
    }
    search_symbols.sort();

    let leaderboard = run_search(
        store,
        &search_symbols,
        &config.strategy,
        &config.search.grid,
        &config.costs,
        &config.rolling,
        &config.stress,
        &config.search.weights,
    );
    leaderboard.write_csv(&config.artifacts.leaderboard)?;

    // ── Refresh engine: one audit append per run ──
    let engine = RefreshEngine::new(
        ChampionStore::new(&config.artifacts.champion),
        AuditLog::new(&config.artifacts.audit_log),
        config.refresh,
    );
    let champion_verdict = verdicts
        .iter()
        .find(|v| v.symbol == config.deploy.mandated_symbol);
    let board = leaderboard.clone();
    let refresh = engine.run(
        move || board,
        &config.deploy,
        champion_verdict,
        &config.strategy,
        run_ts,
    )?;

    Ok(RunSummary {
        refresh_statuses,
        reports,
        verdicts,
        scope,
        deploy_message,
        matrix,
        funnel,
        leaderboard,
        refresh,
    })
}
