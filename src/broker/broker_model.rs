//! Typed request/response shapes for the broker's session REST API.
//!
//! The upstream payloads are loosely-keyed dictionaries; everything is
//! validated once here at the boundary and typed from then on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standard broker response envelope: a status flag, a message on failure
/// and an optional data payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errorcode: String,
    pub data: Option<T>,
}

/// Session and feed tokens returned by a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionTokens {
    #[serde(rename = "jwtToken")]
    pub jwt_token: String,
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: String,
    #[serde(rename = "feedToken", default)]
    pub feed_token: String,
}

/// Quote retrieval mode: FULL carries OHLC and volume, LTP is the
/// lightweight last-traded-price-only variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    Full,
    Ltp,
}

impl QuoteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteMode::Full => "FULL",
            QuoteMode::Ltp => "LTP",
        }
    }
}

/// Payload for the batched quote endpoint.
#[derive(Debug, Serialize)]
pub struct QuoteRequest {
    pub mode: String,
    #[serde(rename = "exchangeTokens")]
    pub exchange_tokens: HashMap<String, Vec<String>>,
}

/// One instrument quote from the batched quote endpoint. LTP-mode responses
/// carry only the identity fields and `ltp`; the rest default to zero.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FullQuote {
    #[serde(rename = "exchange", default)]
    pub exchange: String,
    #[serde(rename = "tradingSymbol", default)]
    pub trading_symbol: String,
    #[serde(rename = "symbolToken", default)]
    pub symbol_token: String,
    #[serde(default)]
    pub ltp: f64,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    #[serde(default)]
    pub close: f64,
    #[serde(rename = "tradeVolume", default)]
    pub trade_volume: i64,
    #[serde(rename = "52WeekHigh", default)]
    pub year_high: f64,
    #[serde(rename = "52WeekLow", default)]
    pub year_low: f64,
    #[serde(rename = "totBuyQuan", default)]
    pub total_buy_quantity: i64,
    #[serde(rename = "totSellQuan", default)]
    pub total_sell_quantity: i64,
}

/// Data payload of the batched quote endpoint: quotes that were served and
/// tokens the broker could not serve.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteData {
    #[serde(default)]
    pub fetched: Vec<FullQuote>,
    #[serde(default)]
    pub unfetched: Vec<UnfetchedQuote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnfetchedQuote {
    #[serde(rename = "symbolToken", default)]
    pub symbol_token: String,
    #[serde(default)]
    pub message: String,
}
