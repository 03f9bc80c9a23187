//! Telegram notification adapter.
//!
//! Delivery is strictly best-effort: any failure is logged at warn level
//! and dropped. The trading loop must never notice a dead channel.

use log::{info, warn};
use reqwest::blocking::Client;
use std::time::Duration;

use crate::ports::notifier_port::NotifierPort;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TelegramNotifier {
    client: Option<Client>,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self::with_base_url("https://api.telegram.org", bot_token, chat_id)
    }

    pub fn with_base_url(base_url: &str, bot_token: &str, chat_id: &str) -> Self {
        let client = Client::builder().timeout(SEND_TIMEOUT).build();
        if client.is_err() {
            warn!("telegram client init failed, notifications disabled");
        }
        TelegramNotifier {
            client: client.ok(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }
}

impl NotifierPort for TelegramNotifier {
    fn notify(&self, text: &str) {
        let Some(client) = &self.client else {
            return;
        };
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let params = [("chat_id", self.chat_id.as_str()), ("text", text)];

        match client.post(&url).form(&params).send() {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => warn!("telegram send failed: HTTP {}", response.status()),
            Err(e) => warn!("telegram send failed: {}", e),
        }
    }
}

/// Fallback notifier when no Telegram channel is configured: messages go to
/// the log stream instead.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotifierPort for LogNotifier {
    fn notify(&self, text: &str) {
        info!("[notify] {}", text);
    }
}
