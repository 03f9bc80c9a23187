//! Trade execution: two-leg rotations through the stable asset.
//!
//! Every rotation sells the source asset into the stable asset, then buys
//! the target with the full proceeds. The two legs are not atomic: a failure
//! on the buy leg leaves the capital parked in the stable asset. That state
//! is reported, not rolled back.
//!
//! A stable-asset source skips the sell leg (the free stable balance is the
//! proceeds); a stable-asset target stops after the sell leg.

use log::{error, info};

use crate::domain::market::MarketClient;
use crate::domain::universe::Universe;
use crate::ports::exchange_port::ExchangePort;
use crate::ports::notifier_port::NotifierPort;

pub struct ExecutionEngine<'a> {
    exchange: &'a dyn ExchangePort,
    notifier: &'a dyn NotifierPort,
    market: &'a MarketClient<'a>,
    universe: &'a Universe,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(
        exchange: &'a dyn ExchangePort,
        notifier: &'a dyn NotifierPort,
        market: &'a MarketClient<'a>,
        universe: &'a Universe,
    ) -> Self {
        ExecutionEngine {
            exchange,
            notifier,
            market,
            universe,
        }
    }

    /// Rotate the full free balance of `from_asset` into `to_asset`.
    ///
    /// Returns true only when every required leg filled. A zero source
    /// balance is a quiet no-op (logged, not alerted). Venue rejections on
    /// either leg are logged and alerted; partial completion is left as-is.
    pub fn execute_rotation(&self, from_asset: &str, to_asset: &str) -> bool {
        let quantity = self.market.get_balance(from_asset);
        if quantity <= 0.0 {
            info!("no {} balance to rotate", from_asset);
            return false;
        }

        let fee = self.market.get_taker_fee();

        let proceeds = if from_asset == self.universe.stable {
            quantity
        } else {
            let sell_pair = self.universe.pair(from_asset);
            let fill = match self.exchange.market_sell(&sell_pair, quantity) {
                Ok(fill) => fill,
                Err(e) => {
                    error!("sell leg {} failed: {}", sell_pair, e);
                    self.notifier.notify(&format!(
                        "Trade failed: {} -> {}. Error: {}",
                        from_asset, to_asset, e
                    ));
                    return false;
                }
            };
            fill.price * quantity * (1.0 - fee)
        };

        if to_asset == self.universe.stable {
            info!(
                "rotated {} {} into {} {}",
                quantity, from_asset, proceeds, to_asset
            );
            self.notifier.notify(&format!(
                "Trade executed: {} -> {}, Amount: {}",
                from_asset, to_asset, proceeds
            ));
            return true;
        }

        let buy_pair = self.universe.pair(to_asset);
        let to_price = self.market.get_price(&buy_pair);
        if to_price <= 0.0 {
            error!(
                "no price for {}, capital parked in {}",
                buy_pair, self.universe.stable
            );
            self.notifier.notify(&format!(
                "Trade failed: {} -> {}. No price for {}; capital left in {}.",
                from_asset, to_asset, buy_pair, self.universe.stable
            ));
            return false;
        }

        let buy_quantity = proceeds / to_price;
        match self.exchange.market_buy(&buy_pair, buy_quantity) {
            Ok(fill) => {
                info!(
                    "rotated {} {} into {} {}",
                    quantity, from_asset, fill.quantity, to_asset
                );
                self.notifier.notify(&format!(
                    "Trade executed: {} -> {}, Amount: {}",
                    from_asset, to_asset, fill.quantity
                ));
                true
            }
            Err(e) => {
                error!(
                    "buy leg {} failed after sell leg filled: {}",
                    buy_pair, e
                );
                self.notifier.notify(&format!(
                    "Trade failed: {} -> {}. Error: {}. Capital left in {}.",
                    from_asset, to_asset, e, self.universe.stable
                ));
                false
            }
        }
    }
}
