use std::sync::Arc;

use chrono::Utc;
use log::warn;
use uuid::Uuid;

use crate::cache::CacheStoreTrait;
use crate::constants::dashboard_cache_key;
use crate::errors::{Error, Result};
use crate::holdings::holdings_errors::HoldingError;
use crate::holdings::holdings_model::{composite_key, Holding, HoldingEdit, NewHoldingInput};
use crate::holdings::holdings_repository::HoldingsRepositoryTrait;

/// CRUD over a user's holdings. Bulk upload lives in `IngestionService`;
/// market fields are written only by the refresh orchestrator.
pub struct HoldingsService {
    repository: Arc<dyn HoldingsRepositoryTrait>,
    cache: Arc<dyn CacheStoreTrait>,
}

impl HoldingsService {
    pub fn new(
        repository: Arc<dyn HoldingsRepositoryTrait>,
        cache: Arc<dyn CacheStoreTrait>,
    ) -> Self {
        Self { repository, cache }
    }

    async fn invalidate_dashboard(&self, user_id: &str) {
        let key = dashboard_cache_key(user_id);
        if let Err(e) = self.cache.delete(&key).await {
            warn!("Failed to invalidate dashboard cache for {}: {}", user_id, e);
        }
    }

    pub fn get_holdings(&self, user_id: &str) -> Result<Vec<Holding>> {
        self.repository.get_holdings_by_user(user_id)
    }

    pub fn get_holding(&self, user_id: &str, holding_id: &str) -> Result<Holding> {
        self.repository
            .get_holding(user_id, holding_id)?
            .ok_or_else(|| Error::Holding(HoldingError::NotFound(holding_id.to_string())))
    }

    /// Creates a single holding from the manual-entry form. Market fields
    /// start from the purchase price until the next refresh overwrites them.
    pub async fn add_holding(&self, user_id: &str, input: NewHoldingInput) -> Result<Holding> {
        if input.isin.trim().is_empty() {
            return Err(Error::Holding(HoldingError::InvalidData(
                "ISIN is required".to_string(),
            )));
        }
        if input.company_name.trim().is_empty() {
            return Err(Error::Holding(HoldingError::InvalidData(
                "company name is required".to_string(),
            )));
        }
        if input.total_quantity <= 0 {
            return Err(Error::Holding(HoldingError::InvalidData(format!(
                "quantity must be positive, got {}",
                input.total_quantity
            ))));
        }

        let key = composite_key(&input.isin, input.client_id.as_deref());
        let existing = self.repository.get_holdings_by_user(user_id)?;
        if existing.iter().any(|h| h.composite_key() == key) {
            return Err(Error::Holding(HoldingError::InvalidData(format!(
                "holding already exists for ISIN {}",
                input.isin.trim()
            ))));
        }

        let now = Utc::now().naive_utc();
        let invested_value = input.total_quantity as f64 * input.avg_trading_price;
        let holding = Holding {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            client_id: input.client_id,
            company_name: input.company_name,
            isin: input.isin,
            sector: input.sector,
            market_cap: None,
            total_quantity: input.total_quantity,
            avg_trading_price: input.avg_trading_price,
            ltp: input.avg_trading_price,
            invested_value,
            market_value: invested_value,
            overall_gain_loss: 0.0,
            stcg_quantity: None,
            stcg_value: None,
            open_price: None,
            high_price: None,
            low_price: None,
            close_price: None,
            trade_volume: None,
            year_high: None,
            year_low: None,
            total_buy_quantity: None,
            total_sell_quantity: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.repository.insert_holding(holding)?;
        self.invalidate_dashboard(user_id).await;
        Ok(created)
    }

    pub async fn update_holding(
        &self,
        user_id: &str,
        holding_id: &str,
        edit: HoldingEdit,
    ) -> Result<Holding> {
        if let Some(quantity) = edit.total_quantity {
            if quantity <= 0 {
                return Err(Error::Holding(HoldingError::InvalidData(format!(
                    "quantity must be positive, got {}",
                    quantity
                ))));
            }
        }

        let updated = self
            .repository
            .update_quantities(user_id, holding_id, &edit)?
            .ok_or_else(|| Error::Holding(HoldingError::NotFound(holding_id.to_string())))?;

        self.invalidate_dashboard(user_id).await;
        Ok(updated)
    }

    pub async fn delete_holding(&self, user_id: &str, holding_id: &str) -> Result<()> {
        if !self.repository.delete_holding(user_id, holding_id)? {
            return Err(Error::Holding(HoldingError::NotFound(
                holding_id.to_string(),
            )));
        }
        self.invalidate_dashboard(user_id).await;
        Ok(())
    }
}
