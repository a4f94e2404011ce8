//! TradeRecord — a completed round-trip trade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Long,
    Short,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopHit,
    TargetHit,
    /// Position still open when the series ran out; closed at the last close.
    EndOfData,
}

/// A complete round-trip trade record: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: TradeSide,

    pub entry_ts: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_ts: DateTime<Utc>,
    pub exit_price: f64,

    pub stop_price: f64,
    pub target_price: f64,

    pub gross_pnl: f64,
    /// Round-trip cost (fee + slippage) deducted from gross pnl.
    pub cost: f64,
    pub net_pnl: f64,

    pub bars_held: usize,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    /// Pnl expressed as a multiple of the initial risk (entry − stop).
    /// Zero when the risk distance is degenerate.
    pub fn r_multiple(&self) -> f64 {
        let risk = (self.entry_price - self.stop_price).abs();
        if risk <= f64::EPSILON {
            return 0.0;
        }
        self.net_pnl / risk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade() -> TradeRecord {
        TradeRecord {
            symbol: "QQQ".into(),
            side: TradeSide::Long,
            entry_ts: Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap(),
            entry_price: 100.0,
            exit_ts: Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap(),
            exit_price: 102.0,
            stop_price: 99.0,
            target_price: 102.0,
            gross_pnl: 2.0,
            cost: 0.05,
            net_pnl: 1.95,
            bars_held: 10,
            exit_reason: ExitReason::TargetHit,
        }
    }

    #[test]
    fn winner_detection() {
        assert!(sample_trade().is_winner());
        let mut loser = sample_trade();
        loser.net_pnl = -1.0;
        assert!(!loser.is_winner());
    }

    #[test]
    fn r_multiple_from_risk_distance() {
        let trade = sample_trade();
        // risk = 1.0, net = 1.95
        assert!((trade.r_multiple() - 1.95).abs() < 1e-12);
    }

    #[test]
    fn r_multiple_degenerate_risk_is_zero() {
        let mut trade = sample_trade();
        trade.stop_price = trade.entry_price;
        assert_eq!(trade.r_multiple(), 0.0);
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let deser: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
