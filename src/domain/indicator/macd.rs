//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars for the defaults.

use crate::domain::indicator::{
    calculate_ema, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    if bars.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Macd {
                fast,
                slow,
                signal: signal_period,
            },
            values: Vec::new(),
        };
    }

    let ema_fast = ema_raw_values(bars, fast);
    let ema_slow = ema_raw_values(bars, slow);

    let mut macd_line: Vec<f64> = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        macd_line.push(ema_fast[i] - ema_slow[i]);
    }

    let k = 2.0 / (signal_period as f64 + 1.0);
    let mut signal_line: Vec<f64> = vec![0.0; bars.len()];
    let macd_warmup = slow - 1;

    if bars.len() > macd_warmup && macd_warmup + signal_period <= bars.len() {
        let seed: f64 = macd_line[macd_warmup..macd_warmup + signal_period]
            .iter()
            .sum::<f64>()
            / signal_period as f64;

        let mut signal_ema = seed;
        signal_line[macd_warmup + signal_period - 1] = signal_ema;

        for i in (macd_warmup + signal_period)..bars.len() {
            signal_ema = macd_line[i] * k + signal_ema * (1.0 - k);
            signal_line[i] = signal_ema;
        }
    }

    let signal_warmup = slow - 1 + signal_period - 1;

    let mut values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let valid = i >= signal_warmup;
        let macd = macd_line[i];
        let signal = signal_line[i];

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value: IndicatorValue::Macd {
                line: macd,
                signal,
                histogram: macd - signal,
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Macd {
            fast,
            slow,
            signal: signal_period,
        },
        values,
    }
}

pub fn calculate_macd_default(bars: &[OhlcvBar]) -> IndicatorSeries {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

/// Extract raw f64 values from the EMA module, using 0.0 for warmup bars.
fn ema_raw_values(bars: &[OhlcvBar], period: usize) -> Vec<f64> {
    let series = calculate_ema(bars, period);
    series
        .values
        .iter()
        .map(|p| match p.value {
            IndicatorValue::Simple(v) => v,
            _ => 0.0,
        })
        .collect()
}
