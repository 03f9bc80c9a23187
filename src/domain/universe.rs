//! Asset universe: the fixed, ordered set of tradable symbols plus the
//! stable reference asset.
//!
//! Parses asset lists from configuration and precomputes the cyclic
//! rotation table (asset i pairs with asset i+1 mod N) so the pairing can
//! be asserted independent of universe size.

use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Universe {
    pub assets: Vec<String>,
    pub stable: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in asset list")]
    EmptyToken,

    #[error("duplicate asset: {0}")]
    DuplicateAsset(String),

    #[error("stable asset {0} cannot be in the tradable list")]
    StableInList(String),

    #[error("asset list is empty")]
    Empty,
}

impl Universe {
    pub fn new(assets: Vec<String>, stable: String) -> Result<Self, UniverseError> {
        if assets.is_empty() {
            return Err(UniverseError::Empty);
        }
        if assets.iter().any(|a| *a == stable) {
            return Err(UniverseError::StableInList(stable));
        }
        Ok(Universe { assets, stable })
    }

    pub fn count(&self) -> usize {
        self.assets.len()
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.assets.iter().any(|a| a == asset)
    }

    /// Venue pair symbol for an asset against the stable asset, e.g. BTCUSDT.
    pub fn pair(&self, asset: &str) -> String {
        format!("{}{}", asset, self.stable)
    }

    /// The fixed rotation table: each asset paired with its cyclic successor.
    /// Computed from the ordered list, so a one-asset universe rotates into
    /// itself.
    pub fn rotation_pairs(&self) -> Vec<(String, String)> {
        let n = self.assets.len();
        (0..n)
            .map(|i| (self.assets[i].clone(), self.assets[(i + 1) % n].clone()))
            .collect()
    }
}

pub fn parse_assets(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut assets = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let asset = trimmed.to_uppercase();
        if seen.contains(&asset) {
            return Err(UniverseError::DuplicateAsset(asset));
        }
        seen.insert(asset.clone());
        assets.push(asset);
    }

    Ok(assets)
}
