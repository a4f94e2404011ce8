//! Rolling indicators used by the trade rules.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR uses Wilder smoothing (EMA with alpha = 1/period); positions before
//! the smoothing window has formed are NaN.

use crate::domain::Bar;

/// True Range series. TR[0] has no previous close and is marked NaN so the
/// Wilder seed starts from TR[1].
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];
    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Average True Range with Wilder smoothing.
///
/// Seed: mean of TR[1..=period]. ATR[i] is NaN for i <= period.
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    let n = bars.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let tr = true_range(bars);
    let seed: f64 = tr[1..=period].iter().sum::<f64>() / period as f64;
    out[period] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in (period + 1)..n {
        let smoothed = alpha * tr[i] + (1.0 - alpha) * prev;
        out[i] = smoothed;
        prev = smoothed;
    }
    out
}

/// Rolling maximum of `high` over the previous `lookback` bars, exclusive of
/// the current bar. NaN until `lookback` prior bars exist.
pub fn rolling_high(bars: &[Bar], lookback: usize) -> Vec<f64> {
    let n = bars.len();
    let mut out = vec![f64::NAN; n];
    if lookback == 0 {
        return out;
    }
    for i in lookback..n {
        out[i] = bars[i - lookback..i]
            .iter()
            .map(|b| b.high)
            .fold(f64::MIN, f64::max);
    }
    out
}
