//! Indicator snapshot at the latest bar.
//!
//! Runs every configured indicator over a pair's history and collects the
//! values at the last bar. The snapshot exists only when every lookback is
//! satisfied; a short or malformed series yields `None` and the caller must
//! treat the pair as "insufficient data".

use crate::domain::indicator::{calculate_ema, calculate_macd, calculate_rsi, calculate_sma};
use crate::domain::ohlcv::{is_well_formed, OhlcvBar};

pub const SMA_SHORT_PERIOD: usize = 50;
pub const SMA_LONG_PERIOD: usize = 200;
pub const EMA_FAST_PERIOD: usize = 20;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Derived values at the latest bar of a pair's history.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub sma_short: f64,
    pub sma_long: f64,
    pub ema_fast: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
}

/// Bars required before every field of the snapshot is defined.
pub fn min_bars_required() -> usize {
    SMA_LONG_PERIOD
        .max(SMA_SHORT_PERIOD)
        .max(EMA_FAST_PERIOD)
        .max(RSI_PERIOD + 1)
        .max(MACD_SLOW + MACD_SIGNAL - 1)
}

pub fn compute_snapshot(bars: &[OhlcvBar]) -> Option<IndicatorSnapshot> {
    if bars.len() < min_bars_required() || !is_well_formed(bars) {
        return None;
    }

    let sma_short = calculate_sma(bars, SMA_SHORT_PERIOD).latest_simple()?;
    let sma_long = calculate_sma(bars, SMA_LONG_PERIOD).latest_simple()?;
    let ema_fast = calculate_ema(bars, EMA_FAST_PERIOD).latest_simple()?;
    let rsi = calculate_rsi(bars, RSI_PERIOD).latest_simple()?;
    let (macd, macd_signal) =
        calculate_macd(bars, MACD_FAST, MACD_SLOW, MACD_SIGNAL).latest_macd()?;

    Some(IndicatorSnapshot {
        sma_short,
        sma_long,
        ema_fast,
        rsi,
        macd,
        macd_signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_bars(count: usize) -> Vec<OhlcvBar> {
        (0..count)
            .map(|i| {
                // mild oscillation so gains and losses both occur
                let close = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.01;
                OhlcvBar {
                    symbol: "BTCUSDT".into(),
                    timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                        + chrono::Duration::hours(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    #[test]
    fn min_bars_is_long_sma() {
        assert_eq!(min_bars_required(), 200);
    }

    #[test]
    fn short_series_yields_none() {
        let bars = make_bars(199);
        assert!(compute_snapshot(&bars).is_none());
    }

    #[test]
    fn empty_series_yields_none() {
        assert!(compute_snapshot(&[]).is_none());
    }

    #[test]
    fn full_series_yields_snapshot() {
        let bars = make_bars(200);
        let snap = compute_snapshot(&bars).expect("200 bars should be enough");

        assert!(snap.rsi >= 0.0 && snap.rsi <= 100.0);
        assert!(snap.sma_short > 0.0);
        assert!(snap.sma_long > 0.0);
        assert!(snap.ema_fast > 0.0);
    }

    #[test]
    fn malformed_series_yields_none() {
        let mut bars = make_bars(200);
        bars[10].timestamp = bars[9].timestamp;
        assert!(compute_snapshot(&bars).is_none());
    }

    #[test]
    fn snapshot_uses_latest_bar() {
        let mut bars = make_bars(250);
        // jack the last close far above the window; short SMA must move more
        // than the long SMA
        let last = bars.len() - 1;
        bars[last].close = 500.0;
        let snap = compute_snapshot(&bars).unwrap();
        assert!(snap.sma_short > snap.sma_long);
    }
}
