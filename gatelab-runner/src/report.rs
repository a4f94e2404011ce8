//! Run report artifacts — promotion matrix and attrition funnel.
//!
//! The matrix is one CSV row per symbol: every metric dimension the gate
//! consumed, the pass flag, and the `|`-joined reason codes. The funnel
//! counts failures per reason code across the universe, which makes a
//! "where did my symbols die" question answerable from the artifact alone.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::gate::{GateCheck, GateVerdict, SymbolReport, TradableScope};
use crate::metrics::SymbolMetrics;
use crate::rolling::RollingOutcome;

/// One row of the promotion matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixRow {
    pub symbol: String,
    pub trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub expectancy: f64,
    pub max_drawdown: f64,
    pub stability_score: f64,
    pub degradation_ratio: f64,
    pub passed: bool,
    /// `|`-joined reason codes; empty when passed.
    pub reasons: String,
}

/// Build matrix rows by joining per-symbol reports with their verdicts.
///
/// Reports and verdicts are matched by symbol; rows come out in verdict
/// order (already sorted by the pipeline).
pub fn build_matrix(reports: &[SymbolReport], verdicts: &[GateVerdict]) -> Vec<MatrixRow> {
    verdicts
        .iter()
        .map(|verdict| {
            let report = reports.iter().find(|r| r.symbol == verdict.symbol);
            let metrics = report
                .and_then(|r| r.universe.clone())
                .unwrap_or_else(SymbolMetrics::neutral);
            let stability = report
                .and_then(|r| r.rolling.as_ref())
                .and_then(|o| match o {
                    RollingOutcome::Ok(res) => Some(res.stability_score),
                    RollingOutcome::InsufficientData { .. } => None,
                })
                .unwrap_or(0.0);
            let degradation = report
                .and_then(|r| r.stress.as_ref())
                .map(|s| s.degradation_ratio)
                .unwrap_or(0.0);

            MatrixRow {
                symbol: verdict.symbol.clone(),
                trades: metrics.trade_count,
                win_rate: metrics.win_rate,
                profit_factor: metrics.profit_factor,
                expectancy: metrics.expectancy,
                max_drawdown: metrics.max_drawdown,
                stability_score: stability,
                degradation_ratio: degradation,
                passed: verdict.passed,
                reasons: verdict
                    .reasons
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join("|"),
            }
        })
        .collect()
}

/// Failure counts per reason code across the whole verdict set.
pub fn attrition_funnel(verdicts: &[GateVerdict]) -> BTreeMap<GateCheck, usize> {
    let mut funnel = BTreeMap::new();
    for verdict in verdicts {
        for reason in &verdict.reasons {
            *funnel.entry(*reason).or_insert(0) += 1;
        }
    }
    funnel
}

/// Write the matrix CSV, replacing any previous artifact.
pub fn write_matrix(rows: &[MatrixRow], path: &Path) -> Result<(), csv::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(csv::Error::from)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// One row of the tradable scope artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeRow {
    pub symbol: String,
    pub is_fallback: bool,
}

/// Write the scope listing, replacing any previous artifact.
pub fn write_scope(scope: &TradableScope, path: &Path) -> Result<(), csv::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(csv::Error::from)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for symbol in &scope.symbols {
        writer.serialize(ScopeRow {
            symbol: symbol.clone(),
            is_fallback: scope.is_fallback,
        })?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
