//! Champion/challenger refresh engine.
//!
//! A small state machine: `Idle → Searching → Comparing → Refreshed |
//! Retained`. The engine invokes the challenger search, compares the
//! top-ranked candidate against the persisted champion, and commits the
//! decision — champion write plus exactly one audit append — inside one
//! lock-held read-decide-write unit.
//!
//! Replacement requires strict dominance on the primary metric
//! (expectancy) by more than the improvement margin, and a candidate
//! symbol inside the deploy policy. Re-running with identical inputs after
//! a replace retains: the new champion's own expectancy is now the bar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use gatelab_core::StrategyParams;

use crate::audit::{AuditEntry, AuditError, AuditLog, RefreshDecision};
use crate::challenger::{ChallengerCandidate, Leaderboard};
use crate::champion::{Champion, ChampionError, ChampionStore, StoreGuard};
use crate::deploy::DeployPolicy;
use crate::gate::GateVerdict;

// ─── Configuration ───────────────────────────────────────────────────

/// Refresh engine settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Minimum expectancy improvement a candidate must show over the
    /// champion. Guards against churn from noise-level differences.
    pub min_improvement: f64,
    /// Decision retries after a detected version conflict.
    pub max_conflict_retries: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            min_improvement: 0.01,
            max_conflict_retries: 3,
        }
    }
}

// ─── States and outcome ──────────────────────────────────────────────

/// Engine states. `Refreshed` and `Retained` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshState {
    Idle,
    Searching,
    Comparing,
    Refreshed,
    Retained,
}

impl RefreshState {
    /// Legal forward transitions of the state machine.
    pub fn can_advance_to(self, next: RefreshState) -> bool {
        matches!(
            (self, next),
            (RefreshState::Idle, RefreshState::Searching)
                | (RefreshState::Searching, RefreshState::Comparing)
                | (RefreshState::Comparing, RefreshState::Refreshed)
                | (RefreshState::Comparing, RefreshState::Retained)
        )
    }
}

/// Result of one engine run.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub state: RefreshState,
    pub decision: RefreshDecision,
    /// Champion after the run (unchanged on retain).
    pub champion: Champion,
    pub audit_entry: AuditEntry,
}

/// Errors from the refresh engine.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Champion(#[from] ChampionError),
    #[error(transparent)]
    Audit(#[from] AuditError),
}

// ─── Engine ──────────────────────────────────────────────────────────

/// The only component allowed to mutate the champion record or append to
/// the audit log.
#[derive(Debug)]
pub struct RefreshEngine {
    store: ChampionStore,
    audit: AuditLog,
    config: RefreshConfig,
}

/// What the comparison decided, before persistence.
enum Comparison<'a> {
    Replace(&'a ChallengerCandidate, String),
    Retain(String),
}

impl RefreshEngine {
    pub fn new(store: ChampionStore, audit: AuditLog, config: RefreshConfig) -> Self {
        Self {
            store,
            audit,
            config,
        }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Run one full cycle: search, compare, commit, audit.
    ///
    /// `search` is invoked during the `Searching` state; `bootstrap_params`
    /// seeds a neutral champion when no record exists yet. The champion
    /// symbol's gate verdict feeds the audit rationale.
    pub fn run(
        &self,
        search: impl FnOnce() -> Leaderboard,
        policy: &DeployPolicy,
        champion_verdict: Option<&GateVerdict>,
        bootstrap_params: &StrategyParams,
        run_ts: DateTime<Utc>,
    ) -> Result<RefreshOutcome, RefreshError> {
        let mut state = RefreshState::Idle;

        state = Self::advance(state, RefreshState::Searching);
        let leaderboard = search();

        state = Self::advance(state, RefreshState::Comparing);
        let guard = self.store.lock()?;

        let mut attempts = 0;
        loop {
            let champion = self.store.load_or_bootstrap(
                &guard,
                &policy.mandated_symbol,
                bootstrap_params,
                run_ts,
            )?;

            let comparison = self.compare(&leaderboard, &champion, policy, champion_verdict);

            match self.commit(&guard, comparison, &champion, run_ts) {
                Ok((outcome_state, decision, new_champion, audit_entry)) => {
                    let final_state = Self::advance(state, outcome_state);
                    info!(
                        decision = ?decision,
                        champion = %new_champion.identity(),
                        "refresh cycle complete"
                    );
                    return Ok(RefreshOutcome {
                        state: final_state,
                        decision,
                        champion: new_champion,
                        audit_entry,
                    });
                }
                Err(RefreshError::Champion(ChampionError::VersionConflict { .. }))
                    if attempts < self.config.max_conflict_retries =>
                {
                    // Another run committed first: re-decide against the
                    // freshly committed champion, never overwrite it.
                    attempts += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn advance(from: RefreshState, to: RefreshState) -> RefreshState {
        debug_assert!(from.can_advance_to(to), "illegal transition {from:?} -> {to:?}");
        to
    }

    /// Compare the top-ranked candidate against the champion.
    fn compare<'a>(
        &self,
        leaderboard: &'a Leaderboard,
        champion: &Champion,
        policy: &DeployPolicy,
        champion_verdict: Option<&GateVerdict>,
    ) -> Comparison<'a> {
        let gate_note = match champion_verdict {
            Some(v) if !v.passed => {
                let reasons: Vec<&str> = v.reasons.iter().map(|r| r.as_str()).collect();
                format!("; champion gate: failed ({})", reasons.join("|"))
            }
            Some(_) => "; champion gate: passed".to_string(),
            None => String::new(),
        };

        let candidate = match leaderboard.top() {
            Some(c) => c,
            None => return Comparison::Retain(format!("no candidates evaluated{gate_note}")),
        };

        if !policy.contains(&candidate.symbol) {
            return Comparison::Retain(format!(
                "top candidate {} outside deploy policy{gate_note}",
                candidate.symbol
            ));
        }

        let improvement = candidate.metrics.expectancy - champion.metrics.expectancy;
        if improvement <= self.config.min_improvement {
            return Comparison::Retain(format!(
                "improvement {:.6} within margin {:.6}{gate_note}",
                improvement, self.config.min_improvement
            ));
        }

        Comparison::Replace(
            candidate,
            format!(
                "expectancy {:.6} beats {:.6} by more than margin {:.6}{gate_note}",
                candidate.metrics.expectancy,
                champion.metrics.expectancy,
                self.config.min_improvement
            ),
        )
    }

    /// Persist the decision: champion overwrite (replace only) plus exactly
    /// one audit row.
    fn commit(
        &self,
        guard: &StoreGuard,
        comparison: Comparison<'_>,
        champion: &Champion,
        run_ts: DateTime<Utc>,
    ) -> Result<(RefreshState, RefreshDecision, Champion, AuditEntry), RefreshError> {
        match comparison {
            Comparison::Replace(candidate, rationale) => {
                let replacement = Champion {
                    symbol: candidate.symbol.clone(),
                    params: candidate.params.clone(),
                    metrics: candidate.metrics.clone(),
                    score: candidate.score,
                    version: champion.version, // assigned by commit
                    updated_at: run_ts,
                };
                let committed = self.store.commit(guard, replacement, champion.version)?;
                let entry = AuditEntry {
                    run_ts,
                    decision: RefreshDecision::Replace,
                    champion_before: champion.identity(),
                    champion_after: committed.identity(),
                    rationale,
                };
                self.audit.append(&entry)?;
                Ok((RefreshState::Refreshed, RefreshDecision::Replace, committed, entry))
            }
            Comparison::Retain(rationale) => {
                let entry = AuditEntry {
                    run_ts,
                    decision: RefreshDecision::Retain,
                    champion_before: champion.identity(),
                    champion_after: champion.identity(),
                    rationale,
                };
                self.audit.append(&entry)?;
                Ok((
                    RefreshState::Retained,
                    RefreshDecision::Retain,
                    champion.clone(),
                    entry,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenger::ChallengerCandidate;
    use crate::metrics::SymbolMetrics;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn run_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 21, 0, 0).unwrap()
    }

    fn engine_in(tmp: &TempDir) -> RefreshEngine {
        RefreshEngine::new(
            ChampionStore::new(tmp.path().join("champion.json")),
            AuditLog::new(tmp.path().join("audit.csv")),
            RefreshConfig::default(),
        )
    }

    fn candidate(symbol: &str, expectancy: f64, rr: f64) -> ChallengerCandidate {
        ChallengerCandidate {
            symbol: symbol.into(),
            params: StrategyParams {
                rr_target: rr,
                ..Default::default()
            },
            metrics: SymbolMetrics {
                trade_count: 60,
                expectancy,
                win_rate: 0.5,
                profit_factor: 1.4,
                max_drawdown: -1.0,
                exposure_time: 0.2,
            },
            stressed_expectancy: expectancy * 0.6,
            mean_fold_expectancy: expectancy * 0.8,
            stability_score: 0.75,
            score: expectancy,
        }
    }

    fn board(candidates: Vec<ChallengerCandidate>) -> Leaderboard {
        Leaderboard::from_candidates(candidates)
    }

    #[test]
    fn state_machine_legal_transitions() {
        assert!(RefreshState::Idle.can_advance_to(RefreshState::Searching));
        assert!(RefreshState::Searching.can_advance_to(RefreshState::Comparing));
        assert!(RefreshState::Comparing.can_advance_to(RefreshState::Refreshed));
        assert!(RefreshState::Comparing.can_advance_to(RefreshState::Retained));
        // Terminal states do not advance; no skipping stages.
        assert!(!RefreshState::Refreshed.can_advance_to(RefreshState::Searching));
        assert!(!RefreshState::Retained.can_advance_to(RefreshState::Comparing));
        assert!(!RefreshState::Idle.can_advance_to(RefreshState::Refreshed));
    }

    #[test]
    fn dominant_candidate_replaces_champion() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp);
        let policy = DeployPolicy::single("QQQ");

        let outcome = engine
            .run(
                || board(vec![candidate("QQQ", 0.30, 3.0)]),
                &policy,
                None,
                &StrategyParams::default(),
                run_ts(),
            )
            .unwrap();

        assert_eq!(outcome.state, RefreshState::Refreshed);
        assert_eq!(outcome.decision, RefreshDecision::Replace);
        assert_eq!(outcome.champion.symbol, "QQQ");
        assert!((outcome.champion.metrics.expectancy - 0.30).abs() < 1e-12);
        assert_eq!(outcome.champion.version, 1);
    }

    #[test]
    fn below_margin_improvement_retains() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp);
        let policy = DeployPolicy::single("QQQ");

        // Bootstrap champion has expectancy 0; improvement 0.005 < 0.01.
        let outcome = engine
            .run(
                || board(vec![candidate("QQQ", 0.005, 3.0)]),
                &policy,
                None,
                &StrategyParams::default(),
                run_ts(),
            )
            .unwrap();

        assert_eq!(outcome.state, RefreshState::Retained);
        assert_eq!(outcome.decision, RefreshDecision::Retain);
        assert_eq!(outcome.champion.version, 0);
        assert!(outcome.audit_entry.rationale.contains("margin"));
    }

    #[test]
    fn candidate_outside_policy_retains() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp);
        let policy = DeployPolicy::single("QQQ");

        let outcome = engine
            .run(
                || board(vec![candidate("SPY", 0.50, 3.0)]),
                &policy,
                None,
                &StrategyParams::default(),
                run_ts(),
            )
            .unwrap();

        assert_eq!(outcome.decision, RefreshDecision::Retain);
        assert!(outcome.audit_entry.rationale.contains("outside deploy policy"));
    }

    #[test]
    fn empty_leaderboard_retains() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp);
        let policy = DeployPolicy::single("QQQ");

        let outcome = engine
            .run(
                || board(vec![]),
                &policy,
                None,
                &StrategyParams::default(),
                run_ts(),
            )
            .unwrap();

        assert_eq!(outcome.decision, RefreshDecision::Retain);
        assert!(outcome.audit_entry.rationale.contains("no candidates"));
    }

    #[test]
    fn rerun_after_replace_retains() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp);
        let policy = DeployPolicy::single("QQQ");
        let make_board = || board(vec![candidate("QQQ", 0.30, 3.0)]);

        let first = engine
            .run(make_board, &policy, None, &StrategyParams::default(), run_ts())
            .unwrap();
        assert_eq!(first.decision, RefreshDecision::Replace);

        // Identical inputs again: the new champion's expectancy is the bar.
        let second = engine
            .run(make_board, &policy, None, &StrategyParams::default(), run_ts())
            .unwrap();
        assert_eq!(second.decision, RefreshDecision::Retain);
        assert_eq!(second.champion, first.champion);

        // Exactly one replace entry in the log.
        let entries = engine.audit().read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].decision, RefreshDecision::Replace);
        assert_eq!(entries[1].decision, RefreshDecision::Retain);
    }

    #[test]
    fn every_run_appends_exactly_one_entry() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp);
        let policy = DeployPolicy::single("QQQ");

        for _ in 0..4 {
            engine
                .run(
                    || board(vec![]),
                    &policy,
                    None,
                    &StrategyParams::default(),
                    run_ts(),
                )
                .unwrap();
        }
        assert_eq!(engine.audit().read_all().unwrap().len(), 4);
    }

    #[test]
    fn gate_verdict_lands_in_rationale() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp);
        let policy = DeployPolicy::single("QQQ");
        let verdict = GateVerdict {
            symbol: "QQQ".into(),
            passed: false,
            reasons: vec![crate::gate::GateCheck::MinTradeCount],
        };

        let outcome = engine
            .run(
                || board(vec![]),
                &policy,
                Some(&verdict),
                &StrategyParams::default(),
                run_ts(),
            )
            .unwrap();
        assert!(outcome.audit_entry.rationale.contains("min_trade_count"));
    }

    #[test]
    fn replace_is_atomic_record_overwrite() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_in(&tmp);
        let policy = DeployPolicy::single("QQQ");

        let outcome = engine
            .run(
                || board(vec![candidate("QQQ", 0.30, 3.0)]),
                &policy,
                None,
                &StrategyParams::default(),
                run_ts(),
            )
            .unwrap();

        // Every field of the persisted record matches the committed value:
        // symbol, params, metrics, score, timestamp moved together.
        let store = ChampionStore::new(tmp.path().join("champion.json"));
        let on_disk = store.load().unwrap().unwrap();
        assert_eq!(on_disk, outcome.champion);
        assert_eq!(on_disk.updated_at, run_ts());
        assert!((on_disk.params.rr_target - 3.0).abs() < 1e-12);
    }
}
