//! Signal evaluation: indicator snapshot to trade action.

use std::fmt;

use crate::domain::snapshot::IndicatorSnapshot;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// Discrete action for one pair at one point in time. Recomputed every
/// cycle, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "buy"),
            TradeAction::Sell => write!(f, "sell"),
            TradeAction::Hold => write!(f, "hold"),
        }
    }
}

/// First match wins:
/// 1. bullish trend (short SMA above long) + oversold RSI + bullish MACD cross -> Buy
/// 2. overbought RSI + bearish MACD cross -> Sell
/// 3. otherwise -> Hold
///
/// An absent snapshot (insufficient data) is always Hold.
pub fn evaluate_signal(snapshot: Option<&IndicatorSnapshot>) -> TradeAction {
    let Some(snap) = snapshot else {
        return TradeAction::Hold;
    };

    if snap.sma_short > snap.sma_long
        && snap.rsi < RSI_OVERSOLD
        && snap.macd > snap.macd_signal
    {
        TradeAction::Buy
    } else if snap.rsi > RSI_OVERBOUGHT && snap.macd < snap.macd_signal {
        TradeAction::Sell
    } else {
        TradeAction::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snap(
        sma_short: f64,
        sma_long: f64,
        rsi: f64,
        macd: f64,
        macd_signal: f64,
    ) -> IndicatorSnapshot {
        IndicatorSnapshot {
            sma_short,
            sma_long,
            ema_fast: 0.0,
            rsi,
            macd,
            macd_signal,
        }
    }

    #[test]
    fn bullish_trend_oversold_cross_is_buy() {
        let s = snap(110.0, 100.0, 25.0, 1.2, 0.8);
        assert_eq!(evaluate_signal(Some(&s)), TradeAction::Buy);
    }

    #[test]
    fn overbought_bearish_cross_is_sell() {
        // trend condition irrelevant for the exit rule
        let s = snap(90.0, 100.0, 75.0, 0.5, 0.9);
        assert_eq!(evaluate_signal(Some(&s)), TradeAction::Sell);
        let s = snap(110.0, 100.0, 75.0, 0.5, 0.9);
        assert_eq!(evaluate_signal(Some(&s)), TradeAction::Sell);
    }

    #[test]
    fn neutral_rsi_is_hold() {
        let s = snap(110.0, 100.0, 50.0, 1.2, 0.8);
        assert_eq!(evaluate_signal(Some(&s)), TradeAction::Hold);
    }

    #[test]
    fn missing_snapshot_is_hold() {
        assert_eq!(evaluate_signal(None), TradeAction::Hold);
    }

    #[test]
    fn buy_requires_all_three_conditions() {
        // bearish trend blocks the buy
        assert_eq!(
            evaluate_signal(Some(&snap(90.0, 100.0, 25.0, 1.2, 0.8))),
            TradeAction::Hold
        );
        // RSI not oversold blocks the buy
        assert_eq!(
            evaluate_signal(Some(&snap(110.0, 100.0, 35.0, 1.2, 0.8))),
            TradeAction::Hold
        );
        // bearish MACD blocks the buy
        assert_eq!(
            evaluate_signal(Some(&snap(110.0, 100.0, 25.0, 0.5, 0.8))),
            TradeAction::Hold
        );
    }

    #[test]
    fn sell_requires_both_conditions() {
        assert_eq!(
            evaluate_signal(Some(&snap(90.0, 100.0, 75.0, 1.2, 0.8))),
            TradeAction::Hold
        );
        assert_eq!(
            evaluate_signal(Some(&snap(90.0, 100.0, 65.0, 0.5, 0.9))),
            TradeAction::Hold
        );
    }

    #[test]
    fn thresholds_are_exclusive() {
        // rsi exactly at a threshold satisfies neither strict inequality
        assert_eq!(
            evaluate_signal(Some(&snap(110.0, 100.0, 30.0, 1.2, 0.8))),
            TradeAction::Hold
        );
        assert_eq!(
            evaluate_signal(Some(&snap(90.0, 100.0, 70.0, 0.5, 0.9))),
            TradeAction::Hold
        );
    }

    proptest! {
        // the evaluator is total: any snapshot maps to exactly one action,
        // and buy/sell never fire together
        #[test]
        fn evaluator_is_total(
            sma_short in 0.0f64..1000.0,
            sma_long in 0.0f64..1000.0,
            rsi in 0.0f64..100.0,
            macd in -10.0f64..10.0,
            macd_signal in -10.0f64..10.0,
        ) {
            let s = snap(sma_short, sma_long, rsi, macd, macd_signal);
            let action = evaluate_signal(Some(&s));
            if action == TradeAction::Buy {
                prop_assert!(rsi < RSI_OVERSOLD);
            }
            if action == TradeAction::Sell {
                prop_assert!(rsi > RSI_OVERBOUGHT);
            }
        }
    }
}
