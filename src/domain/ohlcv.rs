//! OHLCV candle representation.

use chrono::{DateTime, Utc};

/// One candle of a pair's price history, as returned by the venue.
#[derive(Debug, Clone)]
pub struct OhlcvBar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// True when timestamps strictly increase and no close is negative.
/// A series violating this came from a broken feed and must not be traded on.
pub fn is_well_formed(bars: &[OhlcvBar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp) && bars.iter().all(|b| b.close >= 0.0)
}
