//! Exchange venue port trait and its failure taxonomy.

use crate::domain::ohlcv::OhlcvBar;

/// Failure classes for venue calls.
///
/// `Transient` failures (network, timeout, rate limit, venue 5xx) may be
/// retried. `Rejected` is an order-level refusal (insufficient funds, bad
/// quantity) and is never retried. `Fatal` covers malformed requests and
/// authentication failures; retrying cannot help.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExchangeError {
    #[error("transient venue error: {0}")]
    Transient(String),

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("fatal venue error: {0}")]
    Fatal(String),
}

impl ExchangeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Transient(_))
    }
}

/// Executed market-order fill: average price and filled quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub quantity: f64,
}

/// Synchronous venue capability. Every method is a blocking request/response
/// call; callers own retry policy.
pub trait ExchangePort {
    /// OHLCV history for a pair, oldest bar first.
    fn get_history(
        &self,
        pair: &str,
        interval: &str,
        bar_count: usize,
    ) -> Result<Vec<OhlcvBar>, ExchangeError>;

    /// Last traded price for a pair.
    fn get_price(&self, pair: &str) -> Result<f64, ExchangeError>;

    /// Free (unlocked) balance of an asset.
    fn get_balance(&self, asset: &str) -> Result<f64, ExchangeError>;

    /// Current taker fee as a fraction (0.001 = 0.1%).
    fn get_taker_fee(&self) -> Result<f64, ExchangeError>;

    /// Market-sell `quantity` of the pair's base asset.
    fn market_sell(&self, pair: &str, quantity: f64) -> Result<Fill, ExchangeError>;

    /// Market-buy `quantity` of the pair's base asset.
    fn market_buy(&self, pair: &str, quantity: f64) -> Result<Fill, ExchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classifier() {
        assert!(ExchangeError::Transient("timeout".into()).is_transient());
        assert!(!ExchangeError::Rejected("insufficient funds".into()).is_transient());
        assert!(!ExchangeError::Fatal("bad api key".into()).is_transient());
    }

    #[test]
    fn error_display() {
        let err = ExchangeError::Rejected("insufficient funds".into());
        assert_eq!(err.to_string(), "order rejected: insufficient funds");
    }
}
