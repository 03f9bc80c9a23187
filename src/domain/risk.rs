//! Risk checks: rebalancing, stop-loss, and take-profit sweeps.
//!
//! All three run every cycle, after the signal pass, in the order
//! Rebalance -> StopLoss -> TakeProfit. Each issues corrective rotations
//! through the execution engine. An unavailable (degraded, <= 0) price
//! excludes that asset from the sweep: a missing quote must never force a
//! trade.

use log::{info, warn};
use std::collections::HashMap;

use crate::domain::execution::ExecutionEngine;
use crate::domain::market::MarketClient;
use crate::domain::position::PositionBook;
use crate::domain::universe::Universe;

pub const DEFAULT_STOP_LOSS: f64 = 0.05;
pub const DEFAULT_TAKE_PROFIT: f64 = 0.10;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Tolerance band around each target fraction. 0.0 means any deviation
    /// trades, which oscillates; widen deliberately via config.
    pub rebalance_band: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            stop_loss: DEFAULT_STOP_LOSS,
            take_profit: DEFAULT_TAKE_PROFIT,
            rebalance_band: 0.0,
        }
    }
}

/// A corrective rotation instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    pub from: String,
    pub to: String,
}

/// Decide which rotations bring the portfolio toward the target allocation.
///
/// `values` holds each asset's current value in stable terms; assets without
/// a usable quote must be absent. Below target - band buys (stable -> asset),
/// above target + band sells (asset -> stable); exactly on target does
/// nothing.
pub fn rebalance_plan(
    universe: &Universe,
    allocation: &[(String, f64)],
    values: &HashMap<String, f64>,
    total_value: f64,
    band: f64,
) -> Vec<Rotation> {
    let mut plan = Vec::new();
    if total_value <= 0.0 {
        return plan;
    }

    for (asset, target) in allocation {
        if !universe.contains(asset) {
            continue;
        }
        let Some(value) = values.get(asset) else {
            continue;
        };
        let fraction = value / total_value;

        if fraction < target - band {
            plan.push(Rotation {
                from: universe.stable.clone(),
                to: asset.clone(),
            });
        } else if fraction > target + band {
            plan.push(Rotation {
                from: asset.clone(),
                to: universe.stable.clone(),
            });
        }
    }

    plan
}

pub struct RiskManager<'a> {
    market: &'a MarketClient<'a>,
    execution: &'a ExecutionEngine<'a>,
    universe: &'a Universe,
    config: RiskConfig,
}

impl<'a> RiskManager<'a> {
    pub fn new(
        market: &'a MarketClient<'a>,
        execution: &'a ExecutionEngine<'a>,
        universe: &'a Universe,
        config: RiskConfig,
    ) -> Self {
        RiskManager {
            market,
            execution,
            universe,
            config,
        }
    }

    /// Run all three checks in the required order.
    pub fn run_checks(&self, allocation: &[(String, f64)], book: &PositionBook) {
        self.rebalance(allocation);
        self.check_stop_loss(book);
        self.check_take_profit(book);
    }

    /// Portfolio value per universe asset in stable terms, with the total.
    /// Assets without a usable quote are excluded.
    fn portfolio_values(&self) -> (HashMap<String, f64>, f64) {
        let mut values = HashMap::new();
        let mut total = 0.0;

        for asset in &self.universe.assets {
            let price = self.market.get_price(&self.universe.pair(asset));
            if price <= 0.0 {
                warn!("no usable price for {}, excluded from valuation", asset);
                continue;
            }
            let value = self.market.get_balance(asset) * price;
            values.insert(asset.clone(), value);
            total += value;
        }

        (values, total)
    }

    pub fn rebalance(&self, allocation: &[(String, f64)]) {
        if allocation.is_empty() {
            return;
        }

        let (values, total) = self.portfolio_values();
        if total <= 0.0 {
            warn!("portfolio value is zero or unknown, skipping rebalance");
            return;
        }

        for rotation in rebalance_plan(
            self.universe,
            allocation,
            &values,
            total,
            self.config.rebalance_band,
        ) {
            if rotation.from == self.universe.stable {
                info!("rebalancing: buying more {}", rotation.to);
            } else {
                info!("rebalancing: selling some {}", rotation.from);
            }
            self.execution.execute_rotation(&rotation.from, &rotation.to);
        }
    }

    pub fn check_stop_loss(&self, book: &PositionBook) {
        for position in book.iter_sorted() {
            if !position.has_cost_basis() {
                continue;
            }
            let price = self.market.get_price(&self.universe.pair(&position.asset));
            if price <= 0.0 {
                continue;
            }
            if position.hit_stop_loss(price, self.config.stop_loss) {
                info!(
                    "stop-loss triggered for {} (basis {}, price {})",
                    position.asset, position.purchase_price, price
                );
                self.execution
                    .execute_rotation(&position.asset, &self.universe.stable);
            }
        }
    }

    pub fn check_take_profit(&self, book: &PositionBook) {
        for position in book.iter_sorted() {
            if !position.has_cost_basis() {
                continue;
            }
            let price = self.market.get_price(&self.universe.pair(&position.asset));
            if price <= 0.0 {
                continue;
            }
            if position.hit_take_profit(price, self.config.take_profit) {
                info!(
                    "take-profit triggered for {} (basis {}, price {})",
                    position.asset, position.purchase_price, price
                );
                self.execution
                    .execute_rotation(&position.asset, &self.universe.stable);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> Universe {
        Universe::new(vec!["A".into(), "B".into()], "USDT".into()).unwrap()
    }

    fn values(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn under_allocated_asset_is_bought() {
        let universe = universe();
        let allocation = vec![("A".to_string(), 0.5)];
        let plan = rebalance_plan(
            &universe,
            &allocation,
            &values(&[("A", 300.0), ("B", 700.0)]),
            1000.0,
            0.0,
        );
        assert_eq!(
            plan,
            vec![Rotation {
                from: "USDT".into(),
                to: "A".into()
            }]
        );
    }

    #[test]
    fn over_allocated_asset_is_sold() {
        let universe = universe();
        let allocation = vec![("A".to_string(), 0.5)];
        let plan = rebalance_plan(
            &universe,
            &allocation,
            &values(&[("A", 600.0), ("B", 400.0)]),
            1000.0,
            0.0,
        );
        assert_eq!(
            plan,
            vec![Rotation {
                from: "A".into(),
                to: "USDT".into()
            }]
        );
    }

    #[test]
    fn exact_target_is_left_alone() {
        let universe = universe();
        let allocation = vec![("A".to_string(), 0.5)];
        let plan = rebalance_plan(
            &universe,
            &allocation,
            &values(&[("A", 500.0), ("B", 500.0)]),
            1000.0,
            0.0,
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn band_suppresses_small_deviations() {
        let universe = universe();
        let allocation = vec![("A".to_string(), 0.5)];
        // 48% with a 5% band: inside, no trade
        let plan = rebalance_plan(
            &universe,
            &allocation,
            &values(&[("A", 480.0), ("B", 520.0)]),
            1000.0,
            0.05,
        );
        assert!(plan.is_empty());

        // 40% breaches the band
        let plan = rebalance_plan(
            &universe,
            &allocation,
            &values(&[("A", 400.0), ("B", 600.0)]),
            1000.0,
            0.05,
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].to, "A");
    }

    #[test]
    fn unknown_allocation_assets_are_skipped() {
        let universe = universe();
        let allocation = vec![("DOGE".to_string(), 0.5)];
        let plan = rebalance_plan(&universe, &allocation, &values(&[]), 1000.0, 0.0);
        assert!(plan.is_empty());
    }

    #[test]
    fn unquoted_asset_is_skipped() {
        let universe = universe();
        let allocation = vec![("A".to_string(), 0.5)];
        // A has no entry in values (quote unavailable)
        let plan = rebalance_plan(
            &universe,
            &allocation,
            &values(&[("B", 1000.0)]),
            1000.0,
            0.0,
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn zero_total_plans_nothing() {
        let universe = universe();
        let allocation = vec![("A".to_string(), 0.5)];
        let plan = rebalance_plan(&universe, &allocation, &values(&[]), 0.0, 0.0);
        assert!(plan.is_empty());
    }

    #[test]
    fn multiple_targets_plan_independently() {
        let universe = universe();
        let allocation = vec![("A".to_string(), 0.5), ("B".to_string(), 0.3)];
        let plan = rebalance_plan(
            &universe,
            &allocation,
            &values(&[("A", 300.0), ("B", 700.0)]),
            1000.0,
            0.0,
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].to, "A");
        assert_eq!(plan[1].from, "B");
    }

    #[test]
    fn default_thresholds() {
        let config = RiskConfig::default();
        assert_eq!(config.stop_loss, 0.05);
        assert_eq!(config.take_profit, 0.10);
        assert_eq!(config.rebalance_band, 0.0);
    }
}
