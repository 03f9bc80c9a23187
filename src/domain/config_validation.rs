//! Configuration validation.
//!
//! Validates all config fields before the trading loop starts. The loop
//! itself never re-reads config; a bad value must be caught here.

use crate::domain::error::RotraderError;
use crate::domain::snapshot::min_bars_required;
use crate::domain::universe::parse_assets;
use crate::ports::config_port::ConfigPort;

pub fn validate_trading_config(config: &dyn ConfigPort) -> Result<(), RotraderError> {
    validate_universe_fields(config)?;
    validate_thresholds(config)?;
    validate_loop_timing(config)?;
    validate_history(config)?;
    validate_allocation(config)?;
    Ok(())
}

/// Venue credentials are required only when live orders will be placed.
pub fn validate_credentials(config: &dyn ConfigPort) -> Result<(), RotraderError> {
    for key in ["api_key", "api_secret"] {
        match config.get_string("exchange", key) {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(RotraderError::ConfigMissing {
                    section: "exchange".to_string(),
                    key: key.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn validate_universe_fields(config: &dyn ConfigPort) -> Result<(), RotraderError> {
    let assets = match config.get_string("trading", "assets") {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return Err(RotraderError::ConfigMissing {
                section: "trading".to_string(),
                key: "assets".to_string(),
            });
        }
    };

    parse_assets(&assets).map_err(|e| RotraderError::ConfigInvalid {
        section: "trading".to_string(),
        key: "assets".to_string(),
        reason: e.to_string(),
    })?;

    match config.get_string("trading", "stable_asset") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(RotraderError::ConfigMissing {
            section: "trading".to_string(),
            key: "stable_asset".to_string(),
        }),
    }
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), RotraderError> {
    let invalid = |key: &str, reason: &str| RotraderError::ConfigInvalid {
        section: "trading".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let stop_loss = config.get_double("trading", "stop_loss", 0.05);
    if stop_loss <= 0.0 || stop_loss >= 1.0 {
        return Err(invalid("stop_loss", "stop_loss must be between 0 and 1"));
    }

    let take_profit = config.get_double("trading", "take_profit", 0.10);
    if take_profit <= 0.0 {
        return Err(invalid("take_profit", "take_profit must be positive"));
    }

    let band = config.get_double("trading", "rebalance_band", 0.0);
    if band < 0.0 || band >= 1.0 {
        return Err(invalid(
            "rebalance_band",
            "rebalance_band must be in [0, 1)",
        ));
    }

    Ok(())
}

fn validate_loop_timing(config: &dyn ConfigPort) -> Result<(), RotraderError> {
    let cycle = config.get_int("trading", "cycle_secs", 60);
    if cycle <= 0 {
        return Err(RotraderError::ConfigInvalid {
            section: "trading".to_string(),
            key: "cycle_secs".to_string(),
            reason: "cycle_secs must be positive".to_string(),
        });
    }

    let cooldown = config.get_int("trading", "error_cooldown_secs", 300);
    if cooldown <= 0 {
        return Err(RotraderError::ConfigInvalid {
            section: "trading".to_string(),
            key: "error_cooldown_secs".to_string(),
            reason: "error_cooldown_secs must be positive".to_string(),
        });
    }

    Ok(())
}

fn validate_history(config: &dyn ConfigPort) -> Result<(), RotraderError> {
    let minimum = min_bars_required() as i64;
    let bars = config.get_int("trading", "history_bars", 250);
    if bars < minimum {
        return Err(RotraderError::ConfigInvalid {
            section: "trading".to_string(),
            key: "history_bars".to_string(),
            reason: format!(
                "history_bars must be at least {} or every signal is hold",
                minimum
            ),
        });
    }

    match config.get_string("trading", "interval") {
        Some(s) if s.trim().is_empty() => Err(RotraderError::ConfigInvalid {
            section: "trading".to_string(),
            key: "interval".to_string(),
            reason: "interval must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_allocation(config: &dyn ConfigPort) -> Result<(), RotraderError> {
    for (asset, value) in config.get_section("allocation") {
        let fraction: f64 = value.parse().map_err(|_| RotraderError::ConfigInvalid {
            section: "allocation".to_string(),
            key: asset.clone(),
            reason: format!("target fraction '{}' is not a number", value),
        })?;
        if fraction <= 0.0 || fraction > 1.0 {
            return Err(RotraderError::ConfigInvalid {
                section: "allocation".to_string(),
                key: asset,
                reason: "target fraction must be in (0, 1]".to_string(),
            });
        }
    }
    Ok(())
}
