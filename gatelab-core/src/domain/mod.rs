//! Domain types: bars, series, trades.

pub mod bar;
pub mod trade;

pub use bar::{Bar, BarSeries, SeriesError};
pub use trade::{ExitReason, TradeRecord, TradeSide};
