//! Property tests for series construction and the simulator contract.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use gatelab_core::{synthetic, Bar, BarSeries, CostModel, DisplacementReclaim, StrategyParams,
    TradeRules};

fn arb_bar(minute_offset: i64, base: f64) -> Bar {
    Bar {
        timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap()
            + chrono::Duration::minutes(minute_offset),
        open: base,
        high: base + 1.0,
        low: base - 1.0,
        close: base + 0.5,
        volume: 1000.0,
    }
}

proptest! {
    /// Construction sorts and dedups: timestamps come out strictly
    /// increasing no matter how the input is shuffled or duplicated.
    #[test]
    fn series_timestamps_strictly_increasing(
        offsets in proptest::collection::vec(0i64..200, 0..60),
    ) {
        let bars: Vec<Bar> = offsets.iter().map(|&o| arb_bar(o, 100.0)).collect();
        let series = BarSeries::new("QQQ", bars).unwrap();
        for pair in series.bars().windows(2) {
            prop_assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    /// Rebuilding an already-clean series is the identity.
    #[test]
    fn series_construction_idempotent(
        offsets in proptest::collection::vec(0i64..200, 0..60),
    ) {
        let bars: Vec<Bar> = offsets.iter().map(|&o| arb_bar(o, 100.0)).collect();
        let once = BarSeries::new("QQQ", bars).unwrap();
        let twice = BarSeries::new("QQQ", once.bars().to_vec()).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Synthetic series always satisfy the OHLC invariants.
    #[test]
    fn synthetic_series_sane(n in 0usize..300, seed in any::<u64>()) {
        let series = synthetic::bar_series("QQQ", n, seed);
        prop_assert_eq!(series.len(), n);
        prop_assert!(series.bars().iter().all(|b| b.is_sane()));
    }

    /// The simulator is a pure function: repeated runs agree bit for bit.
    #[test]
    fn simulation_deterministic(seed in any::<u64>()) {
        let series = synthetic::bar_series("QQQ", 400, seed);
        let rules = DisplacementReclaim::new(StrategyParams::default());
        let costs = CostModel::default();
        let a = rules.simulate(&series, &costs);
        let b = rules.simulate(&series, &costs);
        prop_assert_eq!(a, b);
    }

    /// Net pnl is always gross minus the round-trip cost.
    #[test]
    fn net_pnl_accounts_for_costs(seed in any::<u64>()) {
        let series = synthetic::bar_series("QQQ", 400, seed);
        let rules = DisplacementReclaim::new(StrategyParams::default());
        let costs = CostModel::default();
        for trade in rules.simulate(&series, &costs) {
            prop_assert!((trade.net_pnl - (trade.gross_pnl - costs.total_cost())).abs() < 1e-9);
        }
    }
}
