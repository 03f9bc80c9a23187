//! Binance REST adapter for the exchange port.
//!
//! Blocking HTTP client against the spot API. Public market-data endpoints
//! are unsigned; account and order endpoints carry an HMAC-SHA256 signature
//! over the query string plus the `X-MBX-APIKEY` header.
//!
//! Error mapping: transport failures and HTTP 418/429/5xx are `Transient`;
//! other non-success statuses are `Fatal` for data endpoints and `Rejected`
//! for order endpoints.

use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;

use crate::domain::ohlcv::OhlcvBar;
use crate::ports::exchange_port::{ExchangeError, ExchangePort, Fill};

const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const RECV_WINDOW_MS: u64 = 5000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BinanceAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    balances: Vec<AccountBalance>,
}

#[derive(Debug, Deserialize)]
struct AccountBalance {
    asset: String,
    free: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeFeeEntry {
    #[allow(dead_code)]
    symbol: String,
    taker_commission: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    executed_qty: String,
    fills: Vec<OrderFill>,
}

#[derive(Debug, Deserialize)]
struct OrderFill {
    price: String,
}

impl BinanceAdapter {
    pub fn new(api_key: &str, api_secret: &str) -> Result<Self, ExchangeError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, api_secret)
    }

    /// Custom base URL, for the testnet or a local stub.
    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        api_secret: &str,
    ) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::Fatal(format!("http client init failed: {e}")))?;

        Ok(BinanceAdapter {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    fn sign(&self, query: &str) -> Result<String, ExchangeError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| ExchangeError::Fatal(format!("invalid api secret: {e}")))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn signed_query(&self, params: &str) -> Result<String, ExchangeError> {
        let timestamp = Utc::now().timestamp_millis();
        let query = if params.is_empty() {
            format!("timestamp={timestamp}&recvWindow={RECV_WINDOW_MS}")
        } else {
            format!("{params}&timestamp={timestamp}&recvWindow={RECV_WINDOW_MS}")
        };
        let signature = self.sign(&query)?;
        Ok(format!("{query}&signature={signature}"))
    }

    fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &str,
        signed: bool,
    ) -> Result<T, ExchangeError> {
        let query = if signed {
            self.signed_query(query)?
        } else {
            query.to_string()
        };
        let url = if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        };
        debug!("GET {}", path);

        let mut request = self.client.get(&url);
        if signed {
            request = request.header("X-MBX-APIKEY", &self.api_key);
        }
        let response = request
            .send()
            .map_err(|e| ExchangeError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, &body, false));
        }

        response
            .json()
            .map_err(|e| ExchangeError::Transient(format!("bad response body: {e}")))
    }

    fn place_order(&self, pair: &str, side: &str, quantity: f64) -> Result<Fill, ExchangeError> {
        let params = format!("symbol={pair}&side={side}&type=MARKET&quantity={quantity}");
        let query = self.signed_query(&params)?;
        let url = format!("{}/api/v3/order?{}", self.base_url, query);
        debug!("POST /api/v3/order {} {} {}", side, pair, quantity);

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .map_err(|e| ExchangeError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, &body, true));
        }

        let order: OrderResponse = response
            .json()
            .map_err(|e| ExchangeError::Transient(format!("bad response body: {e}")))?;

        let price = order
            .fills
            .first()
            .ok_or_else(|| ExchangeError::Rejected("order filled with no fills".into()))?
            .price
            .parse()
            .map_err(|_| ExchangeError::Rejected("unparsable fill price".into()))?;
        let quantity = order
            .executed_qty
            .parse()
            .map_err(|_| ExchangeError::Rejected("unparsable executed quantity".into()))?;

        Ok(Fill { price, quantity })
    }
}

impl ExchangePort for BinanceAdapter {
    fn get_history(
        &self,
        pair: &str,
        interval: &str,
        bar_count: usize,
    ) -> Result<Vec<OhlcvBar>, ExchangeError> {
        let query = format!("symbol={pair}&interval={interval}&limit={bar_count}");
        let raw: Vec<Vec<serde_json::Value>> =
            self.get_json("/api/v3/klines", &query, false)?;
        parse_klines(pair, &raw)
    }

    fn get_price(&self, pair: &str) -> Result<f64, ExchangeError> {
        let ticker: TickerPrice =
            self.get_json("/api/v3/ticker/price", &format!("symbol={pair}"), false)?;
        ticker
            .price
            .parse()
            .map_err(|_| ExchangeError::Fatal(format!("unparsable price '{}'", ticker.price)))
    }

    fn get_balance(&self, asset: &str) -> Result<f64, ExchangeError> {
        let account: AccountInfo = self.get_json("/api/v3/account", "", true)?;
        let free = account
            .balances
            .iter()
            .find(|b| b.asset == asset)
            .map(|b| b.free.as_str())
            .unwrap_or("0");
        free.parse()
            .map_err(|_| ExchangeError::Fatal(format!("unparsable balance '{free}'")))
    }

    fn get_taker_fee(&self) -> Result<f64, ExchangeError> {
        let fees: Vec<TradeFeeEntry> = self.get_json("/sapi/v1/asset/tradeFee", "", true)?;
        let entry = fees
            .first()
            .ok_or_else(|| ExchangeError::Fatal("empty trade fee response".into()))?;
        entry
            .taker_commission
            .parse()
            .map_err(|_| ExchangeError::Fatal("unparsable taker fee".into()))
    }

    fn market_sell(&self, pair: &str, quantity: f64) -> Result<Fill, ExchangeError> {
        self.place_order(pair, "SELL", quantity)
    }

    fn market_buy(&self, pair: &str, quantity: f64) -> Result<Fill, ExchangeError> {
        self.place_order(pair, "BUY", quantity)
    }
}

fn classify_status(status: StatusCode, body: &str, order: bool) -> ExchangeError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    if status.as_u16() == 429 || status.as_u16() == 418 || status.is_server_error() {
        ExchangeError::Transient(detail)
    } else if order {
        ExchangeError::Rejected(detail)
    } else {
        ExchangeError::Fatal(detail)
    }
}

/// Kline rows are heterogenous arrays: open time in ms, then OHLCV as
/// strings. Rows shorter than six fields mean a broken feed.
fn parse_klines(
    pair: &str,
    rows: &[Vec<serde_json::Value>],
) -> Result<Vec<OhlcvBar>, ExchangeError> {
    let mut bars = Vec::with_capacity(rows.len());

    for row in rows {
        if row.len() < 6 {
            return Err(ExchangeError::Fatal(format!(
                "kline row with {} fields for {}",
                row.len(),
                pair
            )));
        }
        let millis = row[0]
            .as_i64()
            .ok_or_else(|| ExchangeError::Fatal("non-numeric kline open time".into()))?;
        let timestamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| ExchangeError::Fatal("out-of-range kline open time".into()))?;

        bars.push(OhlcvBar {
            symbol: pair.to_string(),
            timestamp,
            open: field_f64(&row[1])?,
            high: field_f64(&row[2])?,
            low: field_f64(&row[3])?,
            close: field_f64(&row[4])?,
            volume: field_f64(&row[5])?,
        });
    }

    Ok(bars)
}

fn field_f64(value: &serde_json::Value) -> Result<f64, ExchangeError> {
    match value {
        serde_json::Value::String(s) => s
            .parse()
            .map_err(|_| ExchangeError::Fatal(format!("unparsable kline field '{s}'"))),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ExchangeError::Fatal("non-finite kline field".into())),
        other => Err(ExchangeError::Fatal(format!(
            "unexpected kline field {other}"
        ))),
    }
}
