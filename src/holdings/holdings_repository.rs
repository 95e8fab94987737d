use chrono::Utc;
use diesel::prelude::*;
use log::debug;
use std::sync::Arc;

use crate::db::{DbConnection, DbPool};
use crate::errors::{Error, Result};
use crate::holdings::ingestion::MergePlan;
use crate::holdings::{Holding, HoldingEdit, MarketFieldsUpdate};
use crate::schema::holdings;

/// Result of an atomic market-field commit: rows updated plus per-row
/// failures that did not abort the batch.
#[derive(Debug, Clone, Default)]
pub struct MarketUpdateOutcome {
    pub applied: usize,
    pub failures: Vec<String>,
}

pub trait HoldingsRepositoryTrait: Send + Sync {
    fn get_holdings_by_user(&self, user_id: &str) -> Result<Vec<Holding>>;
    fn get_holding(&self, user_id: &str, holding_id: &str) -> Result<Option<Holding>>;
    fn insert_holding(&self, holding: Holding) -> Result<Holding>;
    fn update_quantities(
        &self,
        user_id: &str,
        holding_id: &str,
        edit: &HoldingEdit,
    ) -> Result<Option<Holding>>;
    fn delete_holding(&self, user_id: &str, holding_id: &str) -> Result<bool>;
    /// Applies an ingestion merge plan as one transaction (all-or-nothing).
    fn apply_merge_plan(&self, plan: &MergePlan) -> Result<()>;
    /// Persists market-refresh fields for many holdings in one transaction.
    /// Individual row failures are recorded and skipped; a commit failure
    /// rolls the whole batch back.
    fn apply_market_updates(&self, updates: &[MarketFieldsUpdate]) -> Result<MarketUpdateOutcome>;
}

#[derive(Clone)]
pub struct SqliteHoldingsRepository {
    pool: Arc<DbPool>,
}

impl SqliteHoldingsRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    fn connection(&self) -> Result<DbConnection> {
        self.pool.get().map_err(Error::from)
    }
}

impl HoldingsRepositoryTrait for SqliteHoldingsRepository {
    fn get_holdings_by_user(&self, user_id: &str) -> Result<Vec<Holding>> {
        let mut conn = self.connection()?;
        holdings::table
            .filter(holdings::user_id.eq(user_id))
            .order(holdings::created_at.asc())
            .load::<Holding>(&mut conn)
            .map_err(Error::from)
    }

    fn get_holding(&self, user_id: &str, holding_id: &str) -> Result<Option<Holding>> {
        let mut conn = self.connection()?;
        holdings::table
            .filter(holdings::user_id.eq(user_id))
            .filter(holdings::id.eq(holding_id))
            .first::<Holding>(&mut conn)
            .optional()
            .map_err(Error::from)
    }

    fn insert_holding(&self, holding: Holding) -> Result<Holding> {
        let mut conn = self.connection()?;
        diesel::insert_into(holdings::table)
            .values(&holding)
            .execute(&mut conn)?;
        Ok(holding)
    }

    fn update_quantities(
        &self,
        user_id: &str,
        holding_id: &str,
        edit: &HoldingEdit,
    ) -> Result<Option<Holding>> {
        let mut conn = self.connection()?;

        let Some(current) = holdings::table
            .filter(holdings::user_id.eq(user_id))
            .filter(holdings::id.eq(holding_id))
            .first::<Holding>(&mut conn)
            .optional()?
        else {
            return Ok(None);
        };

        let total_quantity = edit.total_quantity.unwrap_or(current.total_quantity);
        let avg_trading_price = edit.avg_trading_price.unwrap_or(current.avg_trading_price);
        let invested_value = edit.invested_value.unwrap_or(current.invested_value);
        // Keep the valuation invariant consistent with the stored LTP.
        let market_value = total_quantity as f64 * current.ltp;
        let overall_gain_loss = market_value - invested_value;

        diesel::update(holdings::table.filter(holdings::id.eq(holding_id)))
            .set((
                holdings::total_quantity.eq(total_quantity),
                holdings::avg_trading_price.eq(avg_trading_price),
                holdings::invested_value.eq(invested_value),
                holdings::market_value.eq(market_value),
                holdings::overall_gain_loss.eq(overall_gain_loss),
                holdings::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;

        holdings::table
            .filter(holdings::id.eq(holding_id))
            .first::<Holding>(&mut conn)
            .optional()
            .map_err(Error::from)
    }

    fn delete_holding(&self, user_id: &str, holding_id: &str) -> Result<bool> {
        let mut conn = self.connection()?;
        let deleted = diesel::delete(
            holdings::table
                .filter(holdings::user_id.eq(user_id))
                .filter(holdings::id.eq(holding_id)),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn apply_merge_plan(&self, plan: &MergePlan) -> Result<()> {
        let mut conn = self.connection()?;
        let now = Utc::now().naive_utc();

        conn.transaction::<_, Error, _>(|conn| {
            if !plan.creates.is_empty() {
                diesel::insert_into(holdings::table)
                    .values(&plan.creates)
                    .execute(conn)?;
            }

            for entry in &plan.updates {
                let row = &entry.row;
                // Ingestion-owned fields only; the key fields (isin,
                // client_id) are never overwritten.
                diesel::update(holdings::table.filter(holdings::id.eq(&entry.holding_id)))
                    .set((
                        holdings::company_name.eq(&row.company_name),
                        holdings::sector.eq(row.sector.as_deref()),
                        holdings::market_cap.eq(row.market_cap),
                        holdings::total_quantity.eq(row.total_quantity),
                        holdings::avg_trading_price.eq(row.avg_trading_price),
                        holdings::ltp.eq(row.ltp),
                        holdings::invested_value.eq(row.invested_value),
                        holdings::market_value.eq(row.market_value),
                        holdings::overall_gain_loss.eq(row.overall_gain_loss),
                        holdings::stcg_quantity.eq(row.stcg_quantity),
                        holdings::stcg_value.eq(row.stcg_value),
                        holdings::updated_at.eq(now),
                    ))
                    .execute(conn)?;
            }

            Ok(())
        })
    }

    fn apply_market_updates(&self, updates: &[MarketFieldsUpdate]) -> Result<MarketUpdateOutcome> {
        let mut conn = self.connection()?;
        let now = Utc::now().naive_utc();
        let mut outcome = MarketUpdateOutcome::default();

        conn.transaction::<_, Error, _>(|conn| {
            for update in updates {
                let result = diesel::update(
                    holdings::table.filter(holdings::id.eq(&update.holding_id)),
                )
                .set((
                    holdings::ltp.eq(update.ltp),
                    holdings::market_value.eq(update.market_value),
                    holdings::overall_gain_loss.eq(update.overall_gain_loss),
                    holdings::open_price.eq(Some(update.open_price)),
                    holdings::high_price.eq(Some(update.high_price)),
                    holdings::low_price.eq(Some(update.low_price)),
                    holdings::close_price.eq(Some(update.close_price)),
                    holdings::trade_volume.eq(Some(update.trade_volume)),
                    holdings::year_high.eq(Some(update.year_high)),
                    holdings::year_low.eq(Some(update.year_low)),
                    holdings::total_buy_quantity.eq(Some(update.total_buy_quantity)),
                    holdings::total_sell_quantity.eq(Some(update.total_sell_quantity)),
                    holdings::updated_at.eq(now),
                ))
                .execute(conn);

                match result {
                    Ok(0) => outcome
                        .failures
                        .push(format!("{}: holding row no longer exists", update.company_name)),
                    Ok(_) => {
                        debug!("Updated {}: LTP {}", update.company_name, update.ltp);
                        outcome.applied += 1;
                    }
                    Err(e) => outcome
                        .failures
                        .push(format!("{}: database update failed: {}", update.company_name, e)),
                }
            }
            Ok(())
        })?;

        Ok(outcome)
    }
}
