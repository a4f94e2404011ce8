//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single symbol over one aggregation interval.
///
/// Timestamps are tz-aware UTC instants; the source feed is intraday, so a
/// calendar date alone is not enough to identify a bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// OHLCV sanity check: low <= min(open, close), max(open, close) <= high,
    /// volume >= 0, all fields finite.
    pub fn is_sane(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
            && self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
            && self.volume >= 0.0
    }
}

/// Errors raised while constructing a [`BarSeries`].
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("bar at {timestamp} violates OHLCV invariants")]
    InsaneBar { timestamp: DateTime<Utc> },
}

/// A validated bar series for one symbol.
///
/// Construction sorts by timestamp and deduplicates (last write wins), so
/// the invariant — strictly increasing timestamps, every bar sane — holds
/// for the lifetime of the value. Unsorted or duplicated input is normal
/// (feeds re-deliver bars); an individually malformed bar is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series from raw bars: sort, dedup by timestamp (last wins),
    /// then validate each surviving bar.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self, SeriesError> {
        bars.sort_by_key(|b| b.timestamp);
        // Last-write-wins dedup: keep the later of two equal-timestamp bars.
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
                _ => deduped.push(bar),
            }
        }
        for bar in &deduped {
            if !bar.is_sane() {
                return Err(SeriesError::InsaneBar {
                    timestamp: bar.timestamp,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars: deduped,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Sub-series over a bar index range [start, end), clamped to bounds.
    pub fn slice(&self, start: usize, end: usize) -> BarSeries {
        let end = end.min(self.bars.len());
        let start = start.min(end);
        BarSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[start..end].to_vec(),
        }
    }
}
