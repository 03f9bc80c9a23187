//! Cost-basis tracking for open positions.
//!
//! The book holds one entry per universe asset for the process lifetime.
//! A purchase price of 0.0 means "no tracked cost basis": the asset was
//! never rotated into, or its price was unavailable at startup. Entries are
//! refreshed only after a successful rotation into the asset.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub asset: String,
    pub purchase_price: f64,
}

impl Position {
    pub fn has_cost_basis(&self) -> bool {
        self.purchase_price > 0.0
    }

    /// Fractional drawdown from the cost basis. Positive when under water.
    pub fn drawdown(&self, current_price: f64) -> f64 {
        (self.purchase_price - current_price) / self.purchase_price
    }

    /// Fractional gain over the cost basis. Positive when in profit.
    pub fn gain(&self, current_price: f64) -> f64 {
        (current_price - self.purchase_price) / self.purchase_price
    }

    /// Boundary inclusive: a drawdown exactly at the threshold triggers.
    pub fn hit_stop_loss(&self, current_price: f64, threshold: f64) -> bool {
        self.has_cost_basis() && self.drawdown(current_price) >= threshold
    }

    /// Boundary inclusive: a gain exactly at the threshold triggers.
    pub fn hit_take_profit(&self, current_price: f64, threshold: f64) -> bool {
        self.has_cost_basis() && self.gain(current_price) >= threshold
    }
}

#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: HashMap<String, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        PositionBook {
            positions: HashMap::new(),
        }
    }

    pub fn set(&mut self, asset: &str, purchase_price: f64) {
        self.positions.insert(
            asset.to_string(),
            Position {
                asset: asset.to_string(),
                purchase_price,
            },
        );
    }

    pub fn get(&self, asset: &str) -> Option<&Position> {
        self.positions.get(asset)
    }

    pub fn purchase_price(&self, asset: &str) -> f64 {
        self.positions.get(asset).map_or(0.0, |p| p.purchase_price)
    }

    /// Positions in deterministic (asset-name) order, for stable sweeps
    /// and log output.
    pub fn iter_sorted(&self) -> Vec<&Position> {
        let mut positions: Vec<&Position> = self.positions.values().collect();
        positions.sort_by(|a, b| a.asset.cmp(&b.asset));
        positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(price: f64) -> Position {
        Position {
            asset: "BTC".into(),
            purchase_price: price,
        }
    }

    #[test]
    fn no_cost_basis_never_triggers() {
        let pos = position(0.0);
        assert!(!pos.has_cost_basis());
        assert!(!pos.hit_stop_loss(0.0, 0.05));
        assert!(!pos.hit_take_profit(1_000_000.0, 0.10));
    }

    #[test]
    fn stop_loss_boundary_inclusive() {
        let pos = position(100.0);
        // exactly 5% down triggers
        assert!(pos.hit_stop_loss(95.0, 0.05));
        // 4.9% down does not
        assert!(!pos.hit_stop_loss(95.1, 0.05));
        // deeper drop triggers
        assert!(pos.hit_stop_loss(94.0, 0.05));
    }

    #[test]
    fn take_profit_boundary_inclusive() {
        let pos = position(100.0);
        assert!(pos.hit_take_profit(110.0, 0.10));
        assert!(!pos.hit_take_profit(109.9, 0.10));
        assert!(pos.hit_take_profit(111.0, 0.10));
    }

    #[test]
    fn drawdown_and_gain_are_signed() {
        let pos = position(100.0);
        assert!((pos.drawdown(94.0) - 0.06).abs() < 1e-12);
        assert!((pos.gain(94.0) + 0.06).abs() < 1e-12);
        assert!((pos.gain(112.0) - 0.12).abs() < 1e-12);
    }

    #[test]
    fn book_set_and_get() {
        let mut book = PositionBook::new();
        assert!(book.is_empty());

        book.set("BTC", 50_000.0);
        book.set("ETH", 3_000.0);
        assert_eq!(book.len(), 2);
        assert_eq!(book.purchase_price("BTC"), 50_000.0);
        assert_eq!(book.purchase_price("DOGE"), 0.0);
        assert_eq!(book.get("ETH").unwrap().asset, "ETH");
    }

    #[test]
    fn book_set_overwrites() {
        let mut book = PositionBook::new();
        book.set("BTC", 50_000.0);
        book.set("BTC", 60_000.0);
        assert_eq!(book.len(), 1);
        assert_eq!(book.purchase_price("BTC"), 60_000.0);
    }

    #[test]
    fn iter_sorted_is_deterministic() {
        let mut book = PositionBook::new();
        book.set("SOL", 1.0);
        book.set("BTC", 2.0);
        book.set("ETH", 3.0);

        let assets: Vec<&str> = book.iter_sorted().iter().map(|p| p.asset.as_str()).collect();
        assert_eq!(assets, vec!["BTC", "ETH", "SOL"]);
    }
}
