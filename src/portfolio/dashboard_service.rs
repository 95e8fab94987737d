use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};

use crate::cache::CacheStoreTrait;
use crate::constants::{dashboard_cache_key, DASHBOARD_CACHE_TTL_SECS};
use crate::errors::Result;
use crate::holdings::HoldingsRepositoryTrait;
use crate::portfolio::dashboard_model::DashboardSummary;

/// Read-through cache over the dashboard aggregation. Mutations elsewhere
/// invalidate the key; a stale-but-unexpired entry is served as is.
pub struct DashboardService {
    holdings_repository: Arc<dyn HoldingsRepositoryTrait>,
    cache: Arc<dyn CacheStoreTrait>,
}

impl DashboardService {
    pub fn new(
        holdings_repository: Arc<dyn HoldingsRepositoryTrait>,
        cache: Arc<dyn CacheStoreTrait>,
    ) -> Self {
        Self {
            holdings_repository,
            cache,
        }
    }

    pub async fn get_dashboard(&self, user_id: &str) -> Result<DashboardSummary> {
        let key = dashboard_cache_key(user_id);

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<DashboardSummary>(&bytes) {
                Ok(summary) => {
                    debug!("Dashboard cache hit for {}", user_id);
                    return Ok(summary);
                }
                Err(e) => {
                    // A corrupt entry is dropped and recomputed.
                    warn!("Discarding corrupt dashboard cache entry for {}: {}", user_id, e);
                    if let Err(e) = self.cache.delete(&key).await {
                        warn!("Failed to drop corrupt cache entry {}: {}", key, e);
                    }
                }
            },
            Ok(None) => {}
            Err(e) => warn!("Dashboard cache read failed for {}: {}", user_id, e),
        }

        let holdings = self.holdings_repository.get_holdings_by_user(user_id)?;
        let summary = DashboardSummary::from_holdings(&holdings, Utc::now());

        match serde_json::to_vec(&summary) {
            Ok(bytes) => {
                let ttl = Duration::from_secs(DASHBOARD_CACHE_TTL_SECS);
                if let Err(e) = self.cache.set_with_ttl(&key, bytes, ttl).await {
                    warn!("Failed to cache dashboard for {}: {}", user_id, e);
                }
            }
            Err(e) => warn!("Failed to serialize dashboard for {}: {}", user_id, e),
        }

        Ok(summary)
    }
}
