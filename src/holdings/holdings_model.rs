use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broker::FullQuote;
use crate::constants::NO_CLIENT_ID;
use crate::schema::holdings;

/// A persisted brokerage holding owned by a user.
///
/// Quantitative fields are written by ingestion or manual edit; the market
/// block (`ltp` through `total_sell_quantity`) is written only by the
/// refresh orchestrator.
#[derive(
    Queryable, Selectable, Identifiable, Insertable, Debug, Clone, PartialEq, Serialize,
)]
#[diesel(table_name = holdings)]
pub struct Holding {
    pub id: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub company_name: String,
    pub isin: String,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
    pub total_quantity: i64,
    pub avg_trading_price: f64,
    pub ltp: f64,
    pub invested_value: f64,
    pub market_value: f64,
    pub overall_gain_loss: f64,
    pub stcg_quantity: Option<i64>,
    pub stcg_value: Option<f64>,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: Option<f64>,
    pub trade_volume: Option<i64>,
    pub year_high: Option<f64>,
    pub year_low: Option<f64>,
    pub total_buy_quantity: Option<i64>,
    pub total_sell_quantity: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Composite natural key for de-duplication. ISIN alone is not unique across
/// brokerage sub-accounts, so the client id participates, defaulting to a
/// sentinel when absent.
pub fn composite_key(isin: &str, client_id: Option<&str>) -> String {
    let client = client_id
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(NO_CLIENT_ID);
    format!("{}_{}", isin.trim().to_uppercase(), client)
}

impl Holding {
    pub fn composite_key(&self) -> String {
        composite_key(&self.isin, self.client_id.as_deref())
    }
}

/// One parsed spreadsheet row. The fields of this struct are the ingestion
/// allow-list: anything else in the uploaded file is dropped at parse time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParsedHoldingRow {
    #[serde(default)]
    pub client_id: Option<String>,
    pub company_name: String,
    pub isin: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    pub total_quantity: i64,
    #[serde(default)]
    pub avg_trading_price: f64,
    #[serde(default)]
    pub ltp: f64,
    #[serde(default)]
    pub invested_value: f64,
    #[serde(default)]
    pub market_value: f64,
    #[serde(default)]
    pub overall_gain_loss: f64,
    #[serde(default)]
    pub stcg_quantity: Option<i64>,
    #[serde(default)]
    pub stcg_value: Option<f64>,
}

impl ParsedHoldingRow {
    pub fn into_new_holding(self, user_id: &str, now: NaiveDateTime) -> Holding {
        Holding {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            client_id: self.client_id,
            company_name: self.company_name,
            isin: self.isin,
            sector: self.sector,
            market_cap: self.market_cap,
            total_quantity: self.total_quantity,
            avg_trading_price: self.avg_trading_price,
            ltp: self.ltp,
            invested_value: self.invested_value,
            market_value: self.market_value,
            overall_gain_loss: self.overall_gain_loss,
            stcg_quantity: self.stcg_quantity,
            stcg_value: self.stcg_value,
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
        }
    }
}

/// Manually created holding (single-entry form, as opposed to bulk upload).
#[derive(Debug, Clone, Deserialize)]
pub struct NewHoldingInput {
    #[serde(default)]
    pub client_id: Option<String>,
    pub company_name: String,
    pub isin: String,
    #[serde(default)]
    pub sector: Option<String>,
    pub total_quantity: i64,
    pub avg_trading_price: f64,
}

/// Manual edit of the quantitative fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoldingEdit {
    pub total_quantity: Option<i64>,
    pub avg_trading_price: Option<f64>,
    pub invested_value: Option<f64>,
}

/// Market-refresh-owned fields for one holding, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketFieldsUpdate {
    pub holding_id: String,
    pub company_name: String,
    pub ltp: f64,
    pub market_value: f64,
    pub overall_gain_loss: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub trade_volume: i64,
    pub year_high: f64,
    pub year_low: f64,
    pub total_buy_quantity: i64,
    pub total_sell_quantity: i64,
}

impl MarketFieldsUpdate {
    /// Recomputes the valuation invariant from a fresh quote:
    /// `market_value = total_quantity * ltp` and
    /// `overall_gain_loss = market_value - invested_value`.
    pub fn from_quote(holding: &Holding, quote: &FullQuote) -> Self {
        let market_value = holding.total_quantity as f64 * quote.ltp;
        Self {
            holding_id: holding.id.clone(),
            company_name: holding.company_name.clone(),
            ltp: quote.ltp,
            market_value,
            overall_gain_loss: market_value - holding.invested_value,
            open_price: quote.open,
            high_price: quote.high,
            low_price: quote.low,
            close_price: quote.close,
            trade_volume: quote.trade_volume,
            year_high: quote.year_high,
            year_low: quote.year_low,
            total_buy_quantity: quote.total_buy_quantity,
            total_sell_quantity: quote.total_sell_quantity,
        }
    }
}
