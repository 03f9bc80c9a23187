//! Technical indicator implementations.
//!
//! Each calculator maps a bar series to an [`IndicatorSeries`] of the same
//! length. Warmup bars are present but flagged invalid; downstream code must
//! never read a value whose `valid` flag is false.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use ema::calculate_ema;
pub use macd::{calculate_macd, calculate_macd_default};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Simple value at the last bar, if it is past warmup.
    pub fn latest_simple(&self) -> Option<f64> {
        match self.values.last() {
            Some(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    /// MACD line and signal line at the last bar, if past warmup.
    pub fn latest_macd(&self) -> Option<(f64, f64)> {
        match self.values.last() {
            Some(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Macd { line, signal, .. },
                ..
            }) => Some((*line, *signal)),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}
