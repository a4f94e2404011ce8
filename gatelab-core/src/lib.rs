//! GateLab Core — domain types, bar series access, trade rules, cost model.
//!
//! This crate contains the deterministic building blocks of the research
//! pipeline:
//! - Domain types (bars, validated series, trade records)
//! - Bar series source trait and last-known-good store
//! - Rolling indicators (true range, ATR, prior-high)
//! - The displacement-reclaim rule-set behind the `TradeRules` trait
//! - Cost model with stress amplification
//! - Seeded synthetic data for demos and tests
//!
//! Nothing here performs network or file I/O; sources are injected and the
//! evaluation path is a pure function of its inputs.

pub mod cost;
pub mod domain;
pub mod indicators;
pub mod params;
pub mod rules;
pub mod series;
pub mod synthetic;

pub use cost::{CostError, CostModel};
pub use domain::{Bar, BarSeries, ExitReason, SeriesError, TradeRecord, TradeSide};
pub use params::{ParamsError, StrategyParams};
pub use rules::{DisplacementReclaim, TradeRules};
pub use series::{
    BarSeriesSource, FetchOutcome, InMemorySource, RefreshStatus, SeriesStore, SourceError,
};
pub use synthetic::SyntheticSource;
