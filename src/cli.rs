//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::advisor_adapter::{AdvisorConfig, AdvisorGate};
use crate::adapters::binance_adapter::BinanceAdapter;
use crate::adapters::confirm_adapter::ConfirmGate;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::telegram_adapter::{LogNotifier, TelegramNotifier};
use crate::domain::config_validation::{validate_credentials, validate_trading_config};
use crate::domain::engine::{EngineConfig, ShutdownFlag, TradeEngine};
use crate::domain::error::RotraderError;
use crate::domain::market::{MarketClient, RetryPolicy};
use crate::domain::risk::RiskConfig;
use crate::domain::signal::evaluate_signal;
use crate::domain::snapshot::compute_snapshot;
use crate::domain::universe::{parse_assets, Universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::gate_port::TradeGate;
use crate::ports::notifier_port::NotifierPort;

#[derive(Parser, Debug)]
#[command(name = "rotrader", about = "Autonomous portfolio-rotation trading bot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the trading loop
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Stop after this many cycles instead of running until interrupted
        #[arg(long)]
        max_cycles: Option<u64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Compute and print the current signal for one asset
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        asset: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run { config, max_cycles } => run_bot(&config, max_cycles),
        Command::Validate { config } => run_validate(&config),
        Command::Signal { config, asset } => run_signal(&config, &asset),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = RotraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_bot(config_path: &PathBuf, max_cycles: Option<u64>) -> ExitCode {
    // Stage 1: load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_trading_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_credentials(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 2: assemble domain configuration
    let universe = match build_universe(&adapter) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let allocation = build_allocation(&adapter);
    let mut engine_config = build_engine_config(&adapter);
    engine_config.max_cycles = max_cycles;
    let risk_config = build_risk_config(&adapter);

    eprintln!(
        "Universe: {} assets against {}",
        universe.count(),
        universe.stable
    );

    // Stage 3: wire adapters
    let api_key = adapter.get_string("exchange", "api_key").unwrap_or_default();
    let api_secret = adapter
        .get_string("exchange", "api_secret")
        .unwrap_or_default();
    let exchange = match build_exchange(&adapter, &api_key, &api_secret) {
        Ok(e) => e,
        Err(code) => return code,
    };
    let notifier = build_notifier(&adapter);
    let gates = build_gates(&adapter);

    // Stage 4: shutdown wiring, then the loop
    let shutdown = ShutdownFlag::new();
    let handler_flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.request()) {
        eprintln!("warning: could not install interrupt handler: {e}");
    }

    let engine = TradeEngine::new(
        &exchange,
        notifier.as_ref(),
        gates,
        universe,
        allocation,
        engine_config,
        risk_config,
        RetryPolicy::default(),
    );
    engine.run(&shutdown);

    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_trading_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_credentials(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    println!("Config OK");
    ExitCode::SUCCESS
}

fn run_signal(config_path: &PathBuf, asset: &str) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_trading_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let universe = match build_universe(&adapter) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let asset = asset.to_uppercase();
    if !universe.contains(&asset) {
        let err = RotraderError::ConfigInvalid {
            section: "trading".to_string(),
            key: "assets".to_string(),
            reason: format!("{} is not in the configured universe", asset),
        };
        eprintln!("error: {err}");
        return (&err).into();
    }

    // public endpoints only: credentials not required here
    let exchange = match build_exchange(&adapter, "", "") {
        Ok(e) => e,
        Err(code) => return code,
    };
    let notifier = LogNotifier;
    let market = MarketClient::new(&exchange, &notifier);
    let engine_config = build_engine_config(&adapter);

    let pair = universe.pair(&asset);
    let bars = market.get_history(&pair, &engine_config.interval, engine_config.history_bars);
    let snapshot = compute_snapshot(&bars);
    let action = evaluate_signal(snapshot.as_ref());

    match &snapshot {
        Some(s) => {
            println!("{pair}: {} bars", bars.len());
            println!(
                "  sma50={:.4} sma200={:.4} ema20={:.4} rsi={:.2} macd={:.4} signal={:.4}",
                s.sma_short, s.sma_long, s.ema_fast, s.rsi, s.macd, s.macd_signal
            );
        }
        None => println!("{pair}: insufficient data ({} bars)", bars.len()),
    }
    println!("  action: {action}");
    ExitCode::SUCCESS
}

fn build_universe(config: &dyn ConfigPort) -> Result<Universe, RotraderError> {
    let assets = config.get_string("trading", "assets").unwrap_or_default();
    let stable = config
        .get_string("trading", "stable_asset")
        .unwrap_or_default()
        .to_uppercase();
    let assets = parse_assets(&assets)?;
    Ok(Universe::new(assets, stable)?)
}

fn build_allocation(config: &dyn ConfigPort) -> Vec<(String, f64)> {
    config
        .get_section("allocation")
        .into_iter()
        .filter_map(|(asset, value)| {
            value
                .parse::<f64>()
                .ok()
                .map(|fraction| (asset.to_uppercase(), fraction))
        })
        .collect()
}

fn build_engine_config(config: &dyn ConfigPort) -> EngineConfig {
    let defaults = EngineConfig::default();
    EngineConfig {
        interval: config
            .get_string("trading", "interval")
            .unwrap_or(defaults.interval),
        history_bars: config.get_int("trading", "history_bars", defaults.history_bars as i64)
            as usize,
        cycle_delay: Duration::from_secs(
            config.get_int("trading", "cycle_secs", defaults.cycle_delay.as_secs() as i64) as u64,
        ),
        error_cooldown: Duration::from_secs(config.get_int(
            "trading",
            "error_cooldown_secs",
            defaults.error_cooldown.as_secs() as i64,
        ) as u64),
        max_cycles: None,
    }
}

fn build_risk_config(config: &dyn ConfigPort) -> RiskConfig {
    let defaults = RiskConfig::default();
    RiskConfig {
        stop_loss: config.get_double("trading", "stop_loss", defaults.stop_loss),
        take_profit: config.get_double("trading", "take_profit", defaults.take_profit),
        rebalance_band: config.get_double("trading", "rebalance_band", defaults.rebalance_band),
    }
}

fn build_exchange(
    config: &dyn ConfigPort,
    api_key: &str,
    api_secret: &str,
) -> Result<BinanceAdapter, ExitCode> {
    let result = match config.get_string("exchange", "base_url") {
        Some(url) => BinanceAdapter::with_base_url(&url, api_key, api_secret),
        None => BinanceAdapter::new(api_key, api_secret),
    };
    result.map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::FAILURE
    })
}

fn build_notifier(config: &dyn ConfigPort) -> Box<dyn NotifierPort> {
    let token = config.get_string("telegram", "bot_token");
    let chat_id = config.get_string("telegram", "chat_id");
    match (token, chat_id) {
        (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
            Box::new(TelegramNotifier::new(&token, &chat_id))
        }
        _ => {
            eprintln!("No telegram channel configured, notifications go to the log");
            Box::new(LogNotifier)
        }
    }
}

fn build_gates(config: &dyn ConfigPort) -> Vec<Box<dyn TradeGate>> {
    let mut gates: Vec<Box<dyn TradeGate>> = Vec::new();

    if config.get_bool("gates", "advisor", false) {
        let advisor = AdvisorConfig {
            endpoint: config
                .get_string("advisor", "endpoint")
                .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string()),
            api_key: config.get_string("advisor", "api_key").unwrap_or_default(),
            model: config
                .get_string("advisor", "model")
                .unwrap_or_else(|| "gpt-4".to_string()),
        };
        gates.push(Box::new(AdvisorGate::new(advisor)));
    }

    if config.get_bool("gates", "confirm", false) {
        gates.push(Box::new(ConfirmGate::new()));
    }

    gates
}
