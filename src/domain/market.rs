//! Market data access with retry, backoff, and graceful degradation.
//!
//! Wraps the exchange port's read calls. Transient failures are retried with
//! exponential backoff; after the final attempt the call degrades to a safe
//! default (empty series, zero price/balance, default fee) and emits exactly
//! one notification. Fatal failures degrade immediately with a logged error.
//! Callers never see an error: a degraded result always means "no trade this
//! cycle" somewhere downstream.

use log::{error, warn};
use std::time::Duration;

use crate::domain::ohlcv::OhlcvBar;
use crate::ports::exchange_port::{ExchangeError, ExchangePort};
use crate::ports::notifier_port::NotifierPort;

/// Fallback taker fee (0.1%) when the venue cannot be asked.
pub const DEFAULT_TAKER_FEE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt: base * 2^attempt, plus up to one base
    /// of uniform jitter. Capped at five doublings so the per-call wall
    /// clock stays bounded whatever max_attempts says.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = self.base_delay * 2u32.pow(attempt.min(5));
        if self.jitter && !self.base_delay.is_zero() {
            doubled + self.base_delay.mul_f64(rand::random::<f64>())
        } else {
            doubled
        }
    }
}

pub struct MarketClient<'a> {
    exchange: &'a dyn ExchangePort,
    notifier: &'a dyn NotifierPort,
    policy: RetryPolicy,
}

impl<'a> MarketClient<'a> {
    pub fn new(exchange: &'a dyn ExchangePort, notifier: &'a dyn NotifierPort) -> Self {
        MarketClient {
            exchange,
            notifier,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(
        exchange: &'a dyn ExchangePort,
        notifier: &'a dyn NotifierPort,
        policy: RetryPolicy,
    ) -> Self {
        MarketClient {
            exchange,
            notifier,
            policy,
        }
    }

    /// OHLCV history, oldest first. Degrades to an empty series.
    pub fn get_history(&self, pair: &str, interval: &str, bar_count: usize) -> Vec<OhlcvBar> {
        self.with_retry(&format!("history for {pair}"), Vec::new(), || {
            self.exchange.get_history(pair, interval, bar_count)
        })
    }

    /// Last traded price. Degrades to 0.0, which downstream code treats as
    /// "price unavailable".
    pub fn get_price(&self, pair: &str) -> f64 {
        self.with_retry(&format!("price for {pair}"), 0.0, || {
            self.exchange.get_price(pair)
        })
    }

    /// Free balance. Degrades to 0.0.
    pub fn get_balance(&self, asset: &str) -> f64 {
        self.with_retry(&format!("balance for {asset}"), 0.0, || {
            self.exchange.get_balance(asset)
        })
    }

    /// Taker fee fraction. Degrades to [`DEFAULT_TAKER_FEE`].
    pub fn get_taker_fee(&self) -> f64 {
        self.with_retry("taker fee", DEFAULT_TAKER_FEE, || {
            self.exchange.get_taker_fee()
        })
    }

    fn with_retry<T>(
        &self,
        what: &str,
        default: T,
        call: impl Fn() -> Result<T, ExchangeError>,
    ) -> T {
        for attempt in 0..self.policy.max_attempts {
            match call() {
                Ok(value) => return value,
                Err(e) if e.is_transient() => {
                    warn!(
                        "fetching {} failed (attempt {}/{}): {}",
                        what,
                        attempt + 1,
                        self.policy.max_attempts,
                        e
                    );
                    if attempt + 1 < self.policy.max_attempts {
                        std::thread::sleep(self.policy.delay_for(attempt));
                    } else {
                        error!(
                            "fetching {} failed after {} attempts, using default",
                            what, self.policy.max_attempts
                        );
                        self.notifier.notify(&format!(
                            "Failed to fetch {} after {} retries.",
                            what, self.policy.max_attempts
                        ));
                    }
                }
                Err(e) => {
                    error!("fetching {} failed ({}), using default", what, e);
                    return default;
                }
            }
        }
        default
    }
}
