//! Portfolio refresh orchestration: resolve holdings to instrument tokens,
//! fetch quotes in batches, and commit the market fields atomically.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{error, info, warn};
use tokio::sync::{Mutex, RwLock};

use crate::broker::{QuoteMode, QuoteProviderTrait};
use crate::cache::CacheStoreTrait;
use crate::constants::{dashboard_cache_key, EQUITY_EXCHANGE, MAX_REPORTED_FAILURES};
use crate::errors::Result;
use crate::holdings::{HoldingsRepositoryTrait, MarketFieldsUpdate};
use crate::portfolio::refresh_model::{RefreshOutcome, RefreshStatus};
use crate::symbols::{SymbolEntry, SymbolResolverTrait};

pub struct PortfolioRefreshService {
    holdings_repository: Arc<dyn HoldingsRepositoryTrait>,
    resolver: Arc<dyn SymbolResolverTrait>,
    quote_provider: Arc<dyn QuoteProviderTrait>,
    cache: Arc<dyn CacheStoreTrait>,
    // One in-flight refresh per user; concurrent callers queue behind it.
    user_guards: DashMap<String, Arc<Mutex<()>>>,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
}

impl PortfolioRefreshService {
    pub fn new(
        holdings_repository: Arc<dyn HoldingsRepositoryTrait>,
        resolver: Arc<dyn SymbolResolverTrait>,
        quote_provider: Arc<dyn QuoteProviderTrait>,
        cache: Arc<dyn CacheStoreTrait>,
    ) -> Self {
        Self {
            holdings_repository,
            resolver,
            quote_provider,
            cache,
            user_guards: DashMap::new(),
            last_refresh: RwLock::new(None),
        }
    }

    /// Refreshes the market fields of every holding the user owns.
    ///
    /// Serialized per user: a second call while one is in flight waits and
    /// then runs against the freshly committed state. Per-holding problems
    /// never abort the run; they are reported in the outcome.
    pub async fn refresh_all_holdings(&self, user_id: &str) -> RefreshOutcome {
        let guard = self
            .user_guards
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let in_flight = guard.lock().await;

        let outcome = match self.run_refresh(user_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Portfolio refresh failed for {}: {}", user_id, e);
                self.failure_outcome(format!("Refresh failed: {}", e), 0)
                    .await
            }
        };

        drop(in_flight);
        // Drop the guard entry once nobody else holds it, so the map stays
        // bounded by in-flight users rather than all users ever seen.
        self.user_guards
            .remove_if(user_id, |_, entry| Arc::strong_count(entry) <= 2);

        outcome
    }

    #[cfg(test)]
    pub(crate) fn guard_count(&self) -> usize {
        self.user_guards.len()
    }

    async fn failure_outcome(&self, message: impl Into<String>, total: usize) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::failure(message, total);
        outcome.last_updated = *self.last_refresh.read().await;
        outcome
    }

    pub async fn refresh_status(&self) -> RefreshStatus {
        RefreshStatus {
            last_updated: *self.last_refresh.read().await,
            is_authenticated: self.quote_provider.is_authenticated().await,
        }
    }

    async fn run_refresh(&self, user_id: &str) -> Result<RefreshOutcome> {
        let holdings = self.holdings_repository.get_holdings_by_user(user_id)?;
        let total = holdings.len();

        if holdings.is_empty() {
            return Ok(RefreshOutcome {
                success: true,
                message: "No holdings to refresh".to_string(),
                updated_count: 0,
                failed_count: 0,
                failures: Vec::new(),
                total_holdings: 0,
                last_updated: *self.last_refresh.read().await,
            });
        }

        if !self.quote_provider.is_authenticated().await {
            match self.quote_provider.authenticate().await {
                Ok(true) => {}
                Ok(false) => {
                    return Ok(self
                        .failure_outcome("Could not connect to market data provider", total)
                        .await);
                }
                Err(e) => {
                    warn!("Broker authentication failed: {}", e);
                    return Ok(self
                        .failure_outcome("Could not connect to market data provider", total)
                        .await);
                }
            }
        }

        let mut failures: Vec<String> = Vec::new();

        // Resolve each distinct company name once, in encounter order.
        let mut resolved: HashMap<String, SymbolEntry> = HashMap::new();
        let mut seen_names: HashSet<String> = HashSet::new();
        for holding in &holdings {
            if !seen_names.insert(holding.company_name.clone()) {
                continue;
            }
            match self.resolver.resolve(&holding.company_name).await {
                Ok(Some(entry)) => {
                    resolved.insert(holding.company_name.clone(), entry);
                }
                Ok(None) => {
                    failures.push(format!(
                        "{}: no matching symbol found",
                        holding.company_name
                    ));
                }
                Err(e) => {
                    failures.push(format!(
                        "{}: symbol lookup failed: {}",
                        holding.company_name, e
                    ));
                }
            }
        }

        let mut tokens: Vec<String> = Vec::new();
        let mut seen_tokens: HashSet<&str> = HashSet::new();
        for holding in &holdings {
            if let Some(entry) = resolved.get(&holding.company_name) {
                if seen_tokens.insert(entry.token.as_str()) {
                    tokens.push(entry.token.clone());
                }
            }
        }

        if tokens.is_empty() {
            let mut outcome = self
                .failure_outcome("No holdings could be matched to a traded symbol", total)
                .await;
            failures.truncate(MAX_REPORTED_FAILURES);
            outcome.failures = failures;
            return Ok(outcome);
        }

        let quotes = match self
            .quote_provider
            .get_batch_quotes(EQUITY_EXCHANGE, &tokens, QuoteMode::Full)
            .await
        {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("Quote fetch failed for {}: {}", user_id, e);
                return Ok(self
                    .failure_outcome(format!("Market data feed unavailable: {}", e), total)
                    .await);
            }
        };

        let mut updates: Vec<MarketFieldsUpdate> = Vec::new();
        for holding in &holdings {
            let Some(entry) = resolved.get(&holding.company_name) else {
                continue;
            };
            match quotes.get(&entry.token) {
                Some(quote) if quote.ltp > 0.0 => {
                    updates.push(MarketFieldsUpdate::from_quote(holding, quote));
                }
                Some(_) => {
                    failures.push(format!("{}: quote has no valid price", holding.company_name));
                }
                None => {
                    failures.push(format!("{}: no quote returned", holding.company_name));
                }
            }
        }

        let commit = match self.holdings_repository.apply_market_updates(&updates) {
            Ok(commit) => commit,
            Err(e) => {
                error!("Failed to commit market updates for {}: {}", user_id, e);
                return Ok(self
                    .failure_outcome("Failed to save refreshed market data", total)
                    .await);
            }
        };
        failures.extend(commit.failures);

        let now = Utc::now();
        if commit.applied > 0 {
            let key = dashboard_cache_key(user_id);
            if let Err(e) = self.cache.delete(&key).await {
                warn!("Failed to invalidate dashboard cache for {}: {}", user_id, e);
            }
            *self.last_refresh.write().await = Some(now);
        }

        info!(
            "Refreshed {} of {} holdings for {} ({} failures)",
            commit.applied,
            total,
            user_id,
            failures.len()
        );

        failures.truncate(MAX_REPORTED_FAILURES);
        Ok(RefreshOutcome {
            success: commit.applied > 0,
            message: if commit.applied > 0 {
                format!("Refreshed {} of {} holdings", commit.applied, total)
            } else {
                "No holdings could be refreshed".to_string()
            },
            updated_count: commit.applied,
            failed_count: total - commit.applied,
            failures,
            total_holdings: total,
            last_updated: *self.last_refresh.read().await,
        })
    }
}
