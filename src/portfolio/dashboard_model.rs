use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::holdings::Holding;

/// Per-holding slice of the dashboard payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldingProjection {
    pub id: String,
    pub company_name: String,
    pub isin: String,
    pub sector: Option<String>,
    pub total_quantity: i64,
    pub avg_trading_price: f64,
    pub ltp: f64,
    pub invested_value: f64,
    pub market_value: f64,
    pub overall_gain_loss: f64,
    pub gain_loss_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldingPerformance {
    pub company_name: String,
    pub gain_loss_percent: f64,
}

/// Aggregated portfolio view served to the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub total_market_value: f64,
    pub total_invested_value: f64,
    pub total_gain_loss: f64,
    pub gain_loss_percent: f64,
    pub holdings_count: usize,
    pub sector_count: usize,
    pub best_performer: Option<HoldingPerformance>,
    pub worst_performer: Option<HoldingPerformance>,
    pub holdings: Vec<HoldingProjection>,
    pub computed_at: DateTime<Utc>,
}

fn percent(gain: f64, invested: f64) -> f64 {
    if invested == 0.0 {
        0.0
    } else {
        gain / invested * 100.0
    }
}

impl DashboardSummary {
    /// Aggregates stored holdings into the dashboard view. Pure function of
    /// its input; no quotes are fetched here.
    pub fn from_holdings(holdings: &[Holding], computed_at: DateTime<Utc>) -> Self {
        let total_market_value: f64 = holdings.iter().map(|h| h.market_value).sum();
        let total_invested_value: f64 = holdings.iter().map(|h| h.invested_value).sum();
        let total_gain_loss = total_market_value - total_invested_value;

        let sectors: HashSet<&str> = holdings
            .iter()
            .filter_map(|h| h.sector.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let projections: Vec<HoldingProjection> = holdings
            .iter()
            .map(|h| HoldingProjection {
                id: h.id.clone(),
                company_name: h.company_name.clone(),
                isin: h.isin.clone(),
                sector: h.sector.clone(),
                total_quantity: h.total_quantity,
                avg_trading_price: h.avg_trading_price,
                ltp: h.ltp,
                invested_value: h.invested_value,
                market_value: h.market_value,
                overall_gain_loss: h.overall_gain_loss,
                gain_loss_percent: percent(h.overall_gain_loss, h.invested_value),
            })
            .collect();

        // Strict comparisons: on a tie the first holding encountered wins.
        let mut best: Option<&HoldingProjection> = None;
        let mut worst: Option<&HoldingProjection> = None;
        for projection in &projections {
            if best.map_or(true, |b| projection.gain_loss_percent > b.gain_loss_percent) {
                best = Some(projection);
            }
            if worst.map_or(true, |w| projection.gain_loss_percent < w.gain_loss_percent) {
                worst = Some(projection);
            }
        }
        let to_performance = |p: &HoldingProjection| HoldingPerformance {
            company_name: p.company_name.clone(),
            gain_loss_percent: p.gain_loss_percent,
        };

        Self {
            total_market_value,
            total_invested_value,
            total_gain_loss,
            gain_loss_percent: percent(total_gain_loss, total_invested_value),
            holdings_count: holdings.len(),
            sector_count: sectors.len(),
            best_performer: best.map(to_performance),
            worst_performer: worst.map(to_performance),
            holdings: projections,
            computed_at,
        }
    }
}
