//! LLM advisory gate.
//!
//! Sends a snapshot of the proposed trade to an OpenAI-compatible chat
//! completion endpoint and proceeds only on an affirmative answer. Any
//! transport failure, unexpected payload, or non-affirmative reply holds
//! the trade; the advisor can only veto, never force.

use log::{info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::gate_port::{GateDecision, TradeContext, TradeGate};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

pub struct AdvisorGate {
    client: Option<Client>,
    config: AdvisorConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl AdvisorGate {
    pub fn new(config: AdvisorConfig) -> Self {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build();
        if client.is_err() {
            warn!("advisor client init failed, advisor will hold every trade");
        }
        AdvisorGate {
            client: client.ok(),
            config,
        }
    }

    fn build_prompt(context: &TradeContext) -> String {
        let indicators = match &context.snapshot {
            Some(s) => format!(
                "sma_short={:.4} sma_long={:.4} ema_fast={:.4} rsi={:.2} macd={:.4} macd_signal={:.4}",
                s.sma_short, s.sma_long, s.ema_fast, s.rsi, s.macd, s.macd_signal
            ),
            None => "unavailable".to_string(),
        };
        format!(
            "You are a trading assistant. Proposed trade:\n\
             Pair: {}\n\
             From: {}\n\
             To: {}\n\
             Suggested action: {}\n\
             Current balance: {}\n\
             Price: {}\n\
             Indicators: {}\n\n\
             Should the bot proceed with the trade? Answer with exactly \
             'proceed' or 'hold off'.",
            context.pair,
            context.from_asset,
            context.to_asset,
            context.action,
            context.balance,
            context.price,
            indicators
        )
    }

    /// Affirmative only when the reply starts with "proceed".
    fn decide_from(reply: &str) -> GateDecision {
        if reply.trim().to_lowercase().starts_with("proceed") {
            GateDecision::Proceed
        } else {
            GateDecision::Hold
        }
    }

    fn ask(&self, prompt: &str) -> Option<String> {
        let client = self.client.as_ref()?;
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a helpful assistant for trading decisions.",
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .map_err(|e| warn!("advisor request failed: {}", e))
            .ok()?;

        if !response.status().is_success() {
            warn!("advisor returned HTTP {}", response.status());
            return None;
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| warn!("advisor response unparsable: {}", e))
            .ok()?;
        parsed.choices.into_iter().next().map(|c| c.message.content)
    }
}

impl TradeGate for AdvisorGate {
    fn name(&self) -> &str {
        "advisor"
    }

    fn review(&self, context: &TradeContext) -> GateDecision {
        let prompt = Self::build_prompt(context);
        match self.ask(&prompt) {
            Some(reply) => {
                info!("advisor reply for {}: {}", context.pair, reply.trim());
                Self::decide_from(&reply)
            }
            None => {
                warn!("advisor unavailable, holding {}", context.pair);
                GateDecision::Hold
            }
        }
    }
}
