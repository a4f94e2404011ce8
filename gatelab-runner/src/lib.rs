//! GateLab Runner — the research pipeline built on `gatelab-core`.
//!
//! This crate decides, each run, which symbols may enter the deploy scope
//! and whether the standing champion configuration should be replaced:
//! - Universe evaluation (full-history metrics per symbol)
//! - Rolling validation (time-ordered folds, stability score)
//! - Cost stress testing (amplified friction, degradation ratio)
//! - Promotion gate with mandatory non-empty fallback scope
//! - Deploy-scope validation (fatal on policy breach)
//! - Challenger search, leaderboard, champion store, refresh engine
//! - Append-only audit log and promotion-matrix artifacts

pub mod audit;
pub mod challenger;
pub mod champion;
pub mod config;
pub mod deploy;
pub mod gate;
pub mod metrics;
pub mod pipeline;
pub mod refresh;
pub mod report;
pub mod rolling;
pub mod stress;
pub mod universe;

pub use audit::{AuditEntry, AuditError, AuditLog, RefreshDecision};
pub use challenger::{
    ChallengerCandidate, Leaderboard, ScoreWeights, SearchGrid, run_search,
};
pub use champion::{Champion, ChampionError, ChampionStore};
pub use config::{ArtifactPaths, ConfigError, RunConfig, SearchSettings};
pub use deploy::{validate_scope, DeployPolicy, DeployScopeViolation, PolicyError};
pub use gate::{
    build_scope, evaluate_gate, GateCheck, GateThresholds, GateVerdict, SymbolReport,
    TradableScope,
};
pub use metrics::SymbolMetrics;
pub use pipeline::{run_pipeline, PipelineError, RunSummary};
pub use refresh::{RefreshConfig, RefreshEngine, RefreshError, RefreshOutcome, RefreshState};
pub use report::{attrition_funnel, build_matrix, write_matrix, write_scope, MatrixRow, ScopeRow};
pub use rolling::{fold_bounds, run_rolling, RollingConfig, RollingOutcome, RollingResult};
pub use stress::{run_stress, StressConfig, StressResult};
pub use universe::{evaluate_symbol, evaluate_universe, SymbolEvaluation};
