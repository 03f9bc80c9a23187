//! Simple Moving Average indicator.
//!
//! SMA[i] = mean of the last n closes. Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut window_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        window_sum += bar.close;
        if i >= period {
            window_sum -= bars[i - period].close;
        }

        if i < period - 1 {
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
        } else {
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: IndicatorValue::Simple(window_sum / period as f64),
            });
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
