//! Bar series access — source trait and last-known-good store.
//!
//! The `BarSeriesSource` trait abstracts over upstream feeds so the pipeline
//! can be fed from memory, fixtures, or a real provider living outside this
//! workspace. An empty fetch is an explicit outcome, distinct from an error.
//!
//! `SeriesStore` keeps the last-known-good series per symbol and fails
//! closed: only a verified non-empty fetch replaces stored state. An empty
//! or failed fetch retains the prior series, so a reader never observes a
//! symbol's history shrinking.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

use crate::domain::BarSeries;

/// Outcome of a successful fetch: bars, or an explicit empty result.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Bars(BarSeries),
    /// The source responded but had nothing new for this symbol.
    Empty,
}

/// Errors from an upstream source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("symbol not known to source: {symbol}")]
    UnknownSymbol { symbol: String },
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// An upstream feed of bar series, one symbol at a time.
pub trait BarSeriesSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str) -> Result<FetchOutcome, SourceError>;
}

/// In-memory source backed by a fixed map. Symbols absent from the map
/// produce `FetchOutcome::Empty`.
#[derive(Debug, Default)]
pub struct InMemorySource {
    series: BTreeMap<String, BarSeries>,
}

impl InMemorySource {
    pub fn new(series: impl IntoIterator<Item = BarSeries>) -> Self {
        Self {
            series: series
                .into_iter()
                .map(|s| (s.symbol().to_string(), s))
                .collect(),
        }
    }
}

impl BarSeriesSource for InMemorySource {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch(&self, symbol: &str) -> Result<FetchOutcome, SourceError> {
        match self.series.get(symbol) {
            Some(series) => Ok(FetchOutcome::Bars(series.clone())),
            None => Ok(FetchOutcome::Empty),
        }
    }
}

/// What happened to a symbol's stored series during a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// A non-empty fetch replaced the stored series.
    Updated,
    /// Empty fetch or source error: prior state retained.
    Retained,
}

/// Last-known-good series per symbol.
#[derive(Debug, Default)]
pub struct SeriesStore {
    series: BTreeMap<String, BarSeries>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an initial series (e.g., loaded history).
    pub fn insert(&mut self, series: BarSeries) {
        self.series.insert(series.symbol().to_string(), series);
    }

    pub fn get(&self, symbol: &str) -> Option<&BarSeries> {
        self.series.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Refresh one symbol from the source, failing closed on anything but a
    /// verified non-empty result.
    pub fn refresh(&mut self, source: &dyn BarSeriesSource, symbol: &str) -> RefreshStatus {
        match source.fetch(symbol) {
            Ok(FetchOutcome::Bars(series)) if !series.is_empty() => {
                self.series.insert(symbol.to_string(), series);
                RefreshStatus::Updated
            }
            Ok(FetchOutcome::Bars(_)) | Ok(FetchOutcome::Empty) => {
                warn!(symbol, source = source.name(), "empty fetch, retaining prior series");
                RefreshStatus::Retained
            }
            Err(e) => {
                warn!(symbol, source = source.name(), error = %e, "fetch failed, retaining prior series");
                RefreshStatus::Retained
            }
        }
    }

    /// Refresh every symbol in `symbols`, in the given order.
    pub fn refresh_all(
        &mut self,
        source: &dyn BarSeriesSource,
        symbols: &[String],
    ) -> Vec<(String, RefreshStatus)> {
        symbols
            .iter()
            .map(|s| (s.clone(), self.refresh(source, s)))
            .collect()
    }
}
