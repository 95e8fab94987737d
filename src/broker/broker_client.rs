//! Session-based REST client for the broker quote API.
//!
//! Login is an ordered fallback chain: the broker has shipped several login
//! method shapes across API versions, so each is tried in turn and all
//! failures are aggregated into a single diagnostic.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::json;
use tokio::sync::RwLock;

use crate::broker::broker_model::{
    ApiEnvelope, FullQuote, QuoteData, QuoteMode, QuoteRequest, SessionTokens,
};
use crate::broker::BrokerError;
use crate::constants::QUOTE_BATCH_SIZE;

const BROKER_BASE_URL: &str = "https://apiconnect.angelbroking.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Broker API credentials. The one-time code is derived from the account's
/// TOTP secret by the caller.
#[derive(Debug, Clone, Default)]
pub struct BrokerCredentials {
    pub api_key: String,
    pub client_code: String,
    pub pin: String,
    pub totp_code: Option<String>,
}

impl BrokerCredentials {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("BROKER_API_KEY").unwrap_or_default(),
            client_code: std::env::var("BROKER_CLIENT_CODE").unwrap_or_default(),
            pin: std::env::var("BROKER_PIN").unwrap_or_default(),
            totp_code: std::env::var("BROKER_TOTP_CODE").ok(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.client_code.is_empty() && !self.pin.is_empty()
    }
}

/// One login method shape. Tried in declaration order.
struct LoginStrategy {
    name: &'static str,
    path: &'static str,
    build_payload: fn(&BrokerCredentials) -> serde_json::Value,
}

const LOGIN_STRATEGIES: &[LoginStrategy] = &[
    LoginStrategy {
        name: "password-login",
        path: "/rest/auth/angelbroking/user/v1/loginByPassword",
        build_payload: |creds| {
            json!({
                "clientcode": creds.client_code,
                "password": creds.pin,
                "totp": creds.totp_code,
            })
        },
    },
    LoginStrategy {
        name: "mpin-login",
        path: "/rest/auth/angelbroking/user/v1/loginByMPIN",
        build_payload: |creds| {
            json!({
                "clientcode": creds.client_code,
                "mpin": creds.pin,
                "totp": creds.totp_code,
            })
        },
    },
];

/// Quote provider seam: authentication plus batched full/LTP quotes.
#[async_trait]
pub trait QuoteProviderTrait: Send + Sync {
    async fn is_authenticated(&self) -> bool;

    /// Exchanges credentials for session tokens. `Ok(false)` means the
    /// credentials are incomplete or were rejected; `Err` aggregates the
    /// failures of every login strategy attempted.
    async fn authenticate(&self) -> Result<bool, BrokerError>;

    /// Fetches quotes for a token batch, chunking below the per-call limit.
    /// Returns `BrokerError::Unavailable` when the feed yields no data at all;
    /// tokens missing from the returned map are per-item failures.
    async fn get_batch_quotes(
        &self,
        exchange: &str,
        tokens: &[String],
        mode: QuoteMode,
    ) -> Result<HashMap<String, FullQuote>, BrokerError>;
}

pub struct SmartBrokerClient {
    http: Client,
    base_url: String,
    credentials: BrokerCredentials,
    session: RwLock<Option<SessionTokens>>,
}

impl SmartBrokerClient {
    pub fn new(credentials: BrokerCredentials) -> Self {
        Self::with_base_url(credentials, BROKER_BASE_URL)
    }

    pub fn with_base_url(credentials: BrokerCredentials, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            base_url: base_url.into(),
            credentials,
            session: RwLock::new(None),
        }
    }

    fn common_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("X-UserType", HeaderValue::from_static("USER"));
        headers.insert("X-SourceID", HeaderValue::from_static("WEB"));
        if let Ok(value) = HeaderValue::from_str(&self.credentials.api_key) {
            headers.insert("X-PrivateKey", value);
        }
        headers
    }

    async fn try_login(&self, strategy: &LoginStrategy) -> Result<SessionTokens, String> {
        let url = format!("{}{}", self.base_url, strategy.path);
        let payload = (strategy.build_payload)(&self.credentials);

        let response = self
            .http
            .post(&url)
            .headers(self.common_headers())
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("{}: {}", strategy.name, e))?;

        let envelope: ApiEnvelope<SessionTokens> = response
            .json()
            .await
            .map_err(|e| format!("{}: malformed response: {}", strategy.name, e))?;

        if envelope.status {
            envelope
                .data
                .ok_or_else(|| format!("{}: success without session tokens", strategy.name))
        } else {
            Err(format!(
                "{}: {} ({})",
                strategy.name, envelope.message, envelope.errorcode
            ))
        }
    }

    /// Treats broker error codes for invalid/expired tokens as session loss.
    fn is_session_error(errorcode: &str) -> bool {
        matches!(errorcode, "AG8001" | "AG8002" | "AG8003" | "AB8050" | "AB8051")
    }

    async fn fetch_quote_chunk(
        &self,
        jwt_token: &str,
        exchange: &str,
        tokens: &[String],
        mode: QuoteMode,
    ) -> Result<QuoteData, BrokerError> {
        let url = format!("{}/rest/secure/angelbroking/market/v1/quote/", self.base_url);
        let request = QuoteRequest {
            mode: mode.as_str().to_string(),
            exchange_tokens: HashMap::from([(exchange.to_string(), tokens.to_vec())]),
        };

        let response = self
            .http
            .post(&url)
            .headers(self.common_headers())
            .bearer_auth(jwt_token)
            .json(&request)
            .send()
            .await?;

        let envelope: ApiEnvelope<QuoteData> = response
            .json()
            .await
            .map_err(|e| BrokerError::InvalidResponse(e.to_string()))?;

        if !envelope.status {
            if Self::is_session_error(&envelope.errorcode) {
                // Drop the session; the next call re-authenticates lazily.
                *self.session.write().await = None;
                warn!("Broker session invalid ({}), cleared", envelope.errorcode);
                return Err(BrokerError::SessionExpired);
            }
            return Err(BrokerError::Unavailable(format!(
                "{} ({})",
                envelope.message, envelope.errorcode
            )));
        }

        envelope
            .data
            .ok_or_else(|| BrokerError::InvalidResponse("success without quote data".to_string()))
    }
}

#[async_trait]
impl QuoteProviderTrait for SmartBrokerClient {
    async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    async fn authenticate(&self) -> Result<bool, BrokerError> {
        if !self.credentials.is_complete() {
            error!("Broker API credentials not configured properly");
            return Ok(false);
        }

        let mut attempts = Vec::new();
        for strategy in LOGIN_STRATEGIES {
            match self.try_login(strategy).await {
                Ok(tokens) => {
                    info!("Authenticated with broker via {}", strategy.name);
                    *self.session.write().await = Some(tokens);
                    return Ok(true);
                }
                Err(reason) => {
                    debug!("Login attempt failed: {}", reason);
                    attempts.push(reason);
                }
            }
        }

        Err(BrokerError::AuthenticationFailed(attempts.join("; ")))
    }

    async fn get_batch_quotes(
        &self,
        exchange: &str,
        tokens: &[String],
        mode: QuoteMode,
    ) -> Result<HashMap<String, FullQuote>, BrokerError> {
        if tokens.is_empty() {
            return Ok(HashMap::new());
        }

        if self.session.read().await.is_none() && !self.authenticate().await? {
            return Err(BrokerError::Unavailable(
                "not authenticated with broker".to_string(),
            ));
        }

        let jwt_token = match self.session.read().await.as_ref() {
            Some(session) => session.jwt_token.clone(),
            None => return Err(BrokerError::SessionExpired),
        };

        let mut quotes = HashMap::new();
        for chunk in tokens.chunks(QUOTE_BATCH_SIZE) {
            let data = self
                .fetch_quote_chunk(&jwt_token, exchange, chunk, mode)
                .await?;
            for unfetched in &data.unfetched {
                debug!(
                    "Broker returned no quote for token {}: {}",
                    unfetched.symbol_token, unfetched.message
                );
            }
            for quote in data.fetched {
                quotes.insert(quote.symbol_token.clone(), quote);
            }
        }

        if quotes.is_empty() {
            return Err(BrokerError::Unavailable(
                "no quote data returned for any token".to_string(),
            ));
        }

        Ok(quotes)
    }
}
