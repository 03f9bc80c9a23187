//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n bars
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes to compute initial average).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        let values: Vec<IndicatorPoint> = bars
            .iter()
            .map(|b| IndicatorPoint {
                timestamp: b.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            })
            .collect();

        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint {
        timestamp: bars[0].timestamp,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    });

    let mut gains: Vec<f64> = Vec::new();
    let mut losses: Vec<f64> = Vec::new();

    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        let gain_idx = i - 1;

        if gain_idx < period - 1 {
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
        } else {
            if gain_idx == period - 1 {
                avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
                avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
            } else {
                avg_gain = (avg_gain * (period - 1) as f64 + gains[gain_idx]) / period as f64;
                avg_loss = (avg_loss * (period - 1) as f64 + losses[gain_idx]) / period as f64;
            }
            let rsi = if avg_loss == 0.0 {
                100.0
            } else {
                100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
            };
            values.push(IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: IndicatorValue::Simple(rsi),
            });
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                symbol: "BTCUSDT".into(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::hours(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn rsi_empty_bars() {
        let series = calculate_rsi(&[], 14);
        assert_eq!(series.values.len(), 0);
    }

    #[test]
    fn rsi_single_bar() {
        let bars = make_bars(&[100.0]);
        let series = calculate_rsi(&bars, 14);
        assert_eq!(series.values.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);

        assert_eq!(series.values.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
        }
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);

        if let IndicatorValue::Simple(rsi) = series.values[14].value {
            assert!(
                (rsi - 100.0).abs() < f64::EPSILON,
                "RSI should be 100 when all gains"
            );
        } else {
            panic!("Expected Simple value");
        }
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);

        if let IndicatorValue::Simple(rsi) = series.values[14].value {
            assert!(
                (rsi - 0.0).abs() < f64::EPSILON,
                "RSI should be 0 when all losses"
            );
        } else {
            panic!("Expected Simple value");
        }
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0).collect();
        let series = calculate_rsi(&make_bars(&prices), 14);

        for point in &series.values {
            if point.valid {
                if let IndicatorValue::Simple(rsi) = point.value {
                    assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
                }
            }
        }
    }

    #[test]
    fn rsi_zero_period() {
        let bars = make_bars(&[100.0, 101.0]);
        let series = calculate_rsi(&bars, 0);
        assert_eq!(series.values.len(), 2);
        for point in &series.values {
            assert!(!point.valid);
        }
    }

    #[test]
    fn rsi_indicator_type() {
        let bars = make_bars(&[100.0]);
        let series = calculate_rsi(&bars, 14);
        assert_eq!(series.indicator_type, IndicatorType::Rsi(14));
    }
}
