//! The trading loop: signal pass, gated execution, risk checks, sleep.
//!
//! Single-threaded and strictly sequential: assets are processed in universe
//! order within a cycle, cycles follow each other with a fixed delay, and
//! the risk checks of cycle N always complete before cycle N+1 starts.
//! Anything that escapes a cycle is contained here: logged, alerted, and
//! followed by an extended cooldown. Only an external shutdown request ends
//! the loop.

use log::{error, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::execution::ExecutionEngine;
use crate::domain::market::{MarketClient, RetryPolicy};
use crate::domain::position::PositionBook;
use crate::domain::risk::{RiskConfig, RiskManager};
use crate::domain::signal::{evaluate_signal, TradeAction};
use crate::domain::snapshot::compute_snapshot;
use crate::domain::universe::Universe;
use crate::ports::exchange_port::ExchangePort;
use crate::ports::gate_port::{consult_gates, TradeContext, TradeGate};
use crate::ports::notifier_port::NotifierPort;

pub const DEFAULT_CYCLE_DELAY: Duration = Duration::from_secs(60);
pub const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_secs(300);
pub const DEFAULT_HISTORY_BARS: usize = 250;
pub const DEFAULT_INTERVAL: &str = "1h";

/// Cooperative shutdown request, set from a signal handler and polled
/// between iterations and during sleeps, never mid-trade.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        ShutdownFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub interval: String,
    pub history_bars: usize,
    pub cycle_delay: Duration,
    pub error_cooldown: Duration,
    /// Stop after this many cycles. None runs until shutdown.
    pub max_cycles: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            interval: DEFAULT_INTERVAL.to_string(),
            history_bars: DEFAULT_HISTORY_BARS,
            cycle_delay: DEFAULT_CYCLE_DELAY,
            error_cooldown: DEFAULT_ERROR_COOLDOWN,
            max_cycles: None,
        }
    }
}

pub struct TradeEngine<'a> {
    exchange: &'a dyn ExchangePort,
    notifier: &'a dyn NotifierPort,
    gates: Vec<Box<dyn TradeGate>>,
    universe: Universe,
    allocation: Vec<(String, f64)>,
    config: EngineConfig,
    risk: RiskConfig,
    retry: RetryPolicy,
}

impl<'a> TradeEngine<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        exchange: &'a dyn ExchangePort,
        notifier: &'a dyn NotifierPort,
        gates: Vec<Box<dyn TradeGate>>,
        universe: Universe,
        allocation: Vec<(String, f64)>,
        config: EngineConfig,
        risk: RiskConfig,
        retry: RetryPolicy,
    ) -> Self {
        TradeEngine {
            exchange,
            notifier,
            gates,
            universe,
            allocation,
            config,
            risk,
            retry,
        }
    }

    /// Seed the position book with live prices for every universe asset.
    /// A degraded price records "no tracked cost basis" for that asset.
    pub fn init_positions(&self, market: &MarketClient) -> PositionBook {
        let mut book = PositionBook::new();
        for asset in &self.universe.assets {
            let price = market.get_price(&self.universe.pair(asset));
            book.set(asset, price);
        }
        book
    }

    /// One full pass: signal sweep over the rotation table, then the three
    /// risk checks.
    pub fn run_cycle(
        &self,
        market: &MarketClient,
        execution: &ExecutionEngine,
        risk: &RiskManager,
        book: &mut PositionBook,
    ) {
        for (from_asset, to_asset) in self.universe.rotation_pairs() {
            let balance = market.get_balance(&from_asset);
            if balance <= 0.0 {
                info!("no balance in {}, skipping", from_asset);
                continue;
            }

            let pair = self.universe.pair(&from_asset);
            let bars = market.get_history(&pair, &self.config.interval, self.config.history_bars);
            let snapshot = compute_snapshot(&bars);
            let action = evaluate_signal(snapshot.as_ref());

            match action {
                TradeAction::Buy => {
                    let price = market.get_price(&pair);
                    let context = TradeContext {
                        from_asset: from_asset.clone(),
                        to_asset: to_asset.clone(),
                        pair: pair.clone(),
                        action,
                        balance,
                        price,
                        snapshot,
                    };
                    if let Some(gate) = consult_gates(&self.gates, &context) {
                        info!("{} gate held the {} rotation for {}", gate, action, pair);
                        self.notifier.notify(&format!(
                            "Trade held by {} gate: {} -> {}",
                            gate, from_asset, to_asset
                        ));
                        continue;
                    }
                    if execution.execute_rotation(&from_asset, &to_asset) {
                        let to_price = market.get_price(&self.universe.pair(&to_asset));
                        book.set(&to_asset, to_price);
                    }
                }
                TradeAction::Sell => {
                    info!("holding {}, strategy indicates sell", from_asset);
                }
                TradeAction::Hold => {
                    info!("holding {}, no trade signals", from_asset);
                }
            }
        }

        risk.run_checks(&self.allocation, book);
    }

    /// Run until shutdown (or max_cycles). Every cycle is wrapped in a
    /// panic boundary: an unexpected error is logged, alerted, and followed
    /// by the extended cooldown; the loop itself never dies.
    pub fn run(&self, shutdown: &ShutdownFlag) {
        let market = MarketClient::with_policy(self.exchange, self.notifier, self.retry.clone());
        let execution =
            ExecutionEngine::new(self.exchange, self.notifier, &market, &self.universe);
        let risk = RiskManager::new(&market, &execution, &self.universe, self.risk.clone());

        info!(
            "starting trading loop over {} assets (stable {})",
            self.universe.count(),
            self.universe.stable
        );
        self.notifier.notify("Trading bot started.");

        let mut book = self.init_positions(&market);
        let mut cycles: u64 = 0;

        while !shutdown.is_set() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.run_cycle(&market, &execution, &risk, &mut book)
            }));

            cycles += 1;
            match outcome {
                Ok(()) => sleep_interruptible(self.config.cycle_delay, shutdown),
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    error!("unexpected error in cycle {}: {}", cycles, reason);
                    self.notifier.notify(&format!(
                        "Trading bot encountered an unexpected error: {}",
                        reason
                    ));
                    sleep_interruptible(self.config.error_cooldown, shutdown);
                }
            }

            if let Some(max) = self.config.max_cycles {
                if cycles >= max {
                    break;
                }
            }
        }

        info!("trading loop stopped after {} cycles", cycles);
        self.notifier.notify("Trading bot shutting down.");
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Sleep in short slices so a shutdown request lands promptly.
fn sleep_interruptible(duration: Duration, shutdown: &ShutdownFlag) {
    let slice = Duration::from_millis(250);
    let mut remaining = duration;
    while !remaining.is_zero() && !shutdown.is_set() {
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining -= step;
    }
}
