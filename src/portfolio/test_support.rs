//! Shared hand-rolled mocks for the portfolio service tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::broker::{BrokerError, FullQuote, QuoteMode, QuoteProviderTrait};
use crate::cache::{CacheError, CacheStoreTrait, InMemoryCacheStore};
use crate::errors::{Error, Result};
use crate::holdings::ingestion::MergePlan;
use crate::holdings::{
    Holding, HoldingEdit, HoldingsRepositoryTrait, MarketFieldsUpdate, MarketUpdateOutcome,
    ParsedHoldingRow,
};
use crate::symbols::{SymbolEntry, SymbolError, SymbolResolverTrait};

pub fn make_holding(name: &str, isin: &str, quantity: i64, invested: f64) -> Holding {
    let now = Utc::now().naive_utc();
    ParsedHoldingRow {
        client_id: None,
        company_name: name.to_string(),
        isin: isin.to_string(),
        sector: Some("Energy".to_string()),
        market_cap: None,
        total_quantity: quantity,
        avg_trading_price: invested / quantity as f64,
        ltp: invested / quantity as f64,
        invested_value: invested,
        market_value: invested,
        overall_gain_loss: 0.0,
        stcg_quantity: None,
        stcg_value: None,
    }
    .into_new_holding("user-1", now)
}

pub fn make_quote(token: &str, ltp: f64) -> FullQuote {
    FullQuote {
        exchange: "NSE".to_string(),
        trading_symbol: format!("{}-EQ", token),
        symbol_token: token.to_string(),
        ltp,
        open: ltp - 1.0,
        high: ltp + 2.0,
        low: ltp - 2.0,
        close: ltp - 0.5,
        trade_volume: 1_000,
        year_high: ltp * 1.5,
        year_low: ltp * 0.5,
        total_buy_quantity: 10,
        total_sell_quantity: 20,
    }
}

/// In-memory holdings repository with switchable commit failure.
#[derive(Default)]
pub struct MockHoldingsRepository {
    pub holdings: StdMutex<Vec<Holding>>,
    pub fail_commit: AtomicBool,
}

impl MockHoldingsRepository {
    pub fn with_holdings(holdings: Vec<Holding>) -> Self {
        Self {
            holdings: StdMutex::new(holdings),
            fail_commit: AtomicBool::new(false),
        }
    }
}

impl HoldingsRepositoryTrait for MockHoldingsRepository {
    fn get_holdings_by_user(&self, user_id: &str) -> Result<Vec<Holding>> {
        Ok(self
            .holdings
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }

    fn get_holding(&self, user_id: &str, holding_id: &str) -> Result<Option<Holding>> {
        Ok(self
            .holdings
            .lock()
            .unwrap()
            .iter()
            .find(|h| h.user_id == user_id && h.id == holding_id)
            .cloned())
    }

    fn insert_holding(&self, holding: Holding) -> Result<Holding> {
        self.holdings.lock().unwrap().push(holding.clone());
        Ok(holding)
    }

    fn update_quantities(
        &self,
        user_id: &str,
        holding_id: &str,
        edit: &HoldingEdit,
    ) -> Result<Option<Holding>> {
        let mut holdings = self.holdings.lock().unwrap();
        let Some(holding) = holdings
            .iter_mut()
            .find(|h| h.user_id == user_id && h.id == holding_id)
        else {
            return Ok(None);
        };
        if let Some(quantity) = edit.total_quantity {
            holding.total_quantity = quantity;
        }
        if let Some(price) = edit.avg_trading_price {
            holding.avg_trading_price = price;
        }
        if let Some(invested) = edit.invested_value {
            holding.invested_value = invested;
        }
        holding.market_value = holding.total_quantity as f64 * holding.ltp;
        holding.overall_gain_loss = holding.market_value - holding.invested_value;
        Ok(Some(holding.clone()))
    }

    fn delete_holding(&self, user_id: &str, holding_id: &str) -> Result<bool> {
        let mut holdings = self.holdings.lock().unwrap();
        let before = holdings.len();
        holdings.retain(|h| !(h.user_id == user_id && h.id == holding_id));
        Ok(holdings.len() < before)
    }

    fn apply_merge_plan(&self, plan: &MergePlan) -> Result<()> {
        let mut holdings = self.holdings.lock().unwrap();
        holdings.extend(plan.creates.iter().cloned());
        for update in &plan.updates {
            if let Some(holding) = holdings.iter_mut().find(|h| h.id == update.holding_id) {
                holding.company_name = update.row.company_name.clone();
                holding.total_quantity = update.row.total_quantity;
                holding.avg_trading_price = update.row.avg_trading_price;
                holding.ltp = update.row.ltp;
                holding.invested_value = update.row.invested_value;
                holding.market_value = update.row.market_value;
                holding.overall_gain_loss = update.row.overall_gain_loss;
            }
        }
        Ok(())
    }

    fn apply_market_updates(&self, updates: &[MarketFieldsUpdate]) -> Result<MarketUpdateOutcome> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(Error::Unexpected("simulated commit failure".to_string()));
        }
        let mut holdings = self.holdings.lock().unwrap();
        let mut outcome = MarketUpdateOutcome::default();
        for update in updates {
            match holdings.iter_mut().find(|h| h.id == update.holding_id) {
                Some(holding) => {
                    holding.ltp = update.ltp;
                    holding.market_value = update.market_value;
                    holding.overall_gain_loss = update.overall_gain_loss;
                    holding.close_price = Some(update.close_price);
                    outcome.applied += 1;
                }
                None => outcome
                    .failures
                    .push(format!("{}: holding row no longer exists", update.company_name)),
            }
        }
        Ok(outcome)
    }
}

/// Static name table resolver that records every lookup.
#[derive(Default)]
pub struct MockResolver {
    pub entries: HashMap<String, SymbolEntry>,
    pub error_names: HashSet<String>,
    pub calls: StdMutex<Vec<String>>,
}

impl MockResolver {
    pub fn with_entry(mut self, name: &str, token: &str) -> Self {
        self.entries.insert(
            name.to_string(),
            SymbolEntry {
                token: token.to_string(),
                symbol: format!("{}-EQ", token),
                exchange: "NSE".to_string(),
            },
        );
        self
    }

    pub fn with_error(mut self, name: &str) -> Self {
        self.error_names.insert(name.to_string());
        self
    }
}

#[async_trait]
impl SymbolResolverTrait for MockResolver {
    async fn resolve(&self, company_name: &str) -> std::result::Result<Option<SymbolEntry>, SymbolError> {
        self.calls.lock().unwrap().push(company_name.to_string());
        if self.error_names.contains(company_name) {
            return Err(SymbolError::Fetch("simulated lookup failure".to_string()));
        }
        Ok(self.entries.get(company_name).cloned())
    }
}

/// Quote provider with scripted authentication and quote responses.
pub struct MockQuoteProvider {
    pub authenticated: AtomicBool,
    pub auth_allowed: bool,
    pub auth_error: Option<String>,
    pub quotes: HashMap<String, FullQuote>,
    pub feed_error: Option<String>,
    pub requested_tokens: StdMutex<Vec<Vec<String>>>,
}

impl Default for MockQuoteProvider {
    fn default() -> Self {
        Self {
            authenticated: AtomicBool::new(false),
            auth_allowed: true,
            auth_error: None,
            quotes: HashMap::new(),
            feed_error: None,
            requested_tokens: StdMutex::new(Vec::new()),
        }
    }
}

impl MockQuoteProvider {
    pub fn with_quote(mut self, token: &str, ltp: f64) -> Self {
        self.quotes.insert(token.to_string(), make_quote(token, ltp));
        self
    }
}

#[async_trait]
impl QuoteProviderTrait for MockQuoteProvider {
    async fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn authenticate(&self) -> std::result::Result<bool, BrokerError> {
        if let Some(reason) = &self.auth_error {
            return Err(BrokerError::AuthenticationFailed(reason.clone()));
        }
        if self.auth_allowed {
            self.authenticated.store(true, Ordering::SeqCst);
        }
        Ok(self.auth_allowed)
    }

    async fn get_batch_quotes(
        &self,
        _exchange: &str,
        tokens: &[String],
        _mode: QuoteMode,
    ) -> std::result::Result<HashMap<String, FullQuote>, BrokerError> {
        self.requested_tokens.lock().unwrap().push(tokens.to_vec());
        if let Some(reason) = &self.feed_error {
            return Err(BrokerError::Unavailable(reason.clone()));
        }
        Ok(tokens
            .iter()
            .filter_map(|t| self.quotes.get(t).map(|q| (t.clone(), q.clone())))
            .collect())
    }
}

/// Cache store wrapper that records invalidations.
#[derive(Default)]
pub struct RecordingCacheStore {
    inner: InMemoryCacheStore,
    pub deletes: StdMutex<Vec<String>>,
}

#[async_trait]
impl CacheStoreTrait for RecordingCacheStore {
    async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> std::result::Result<(), CacheError> {
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> std::result::Result<(), CacheError> {
        self.deletes.lock().unwrap().push(key.to_string());
        self.inner.delete(key).await
    }
}
