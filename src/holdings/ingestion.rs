//! Bulk holdings upload: merge parsed spreadsheet rows into the stored
//! portfolio keyed by `(isin, client_id)`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde::Serialize;

use crate::cache::CacheStoreTrait;
use crate::constants::{dashboard_cache_key, MAX_REPORTED_FAILURES};
use crate::errors::Result;
use crate::holdings::holdings_model::{composite_key, Holding, ParsedHoldingRow};
use crate::holdings::holdings_repository::HoldingsRepositoryTrait;

/// A row matched to an existing holding. The existing row's id (and key
/// fields) survive; everything else comes from the upload.
#[derive(Debug, Clone)]
pub struct MergeUpdate {
    pub holding_id: String,
    pub row: ParsedHoldingRow,
}

/// Precomputed merge: what to insert, what to overwrite in place, and the
/// rows rejected before touching the database.
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    pub creates: Vec<Holding>,
    pub updates: Vec<MergeUpdate>,
    pub skipped: Vec<String>,
}

/// Outcome summary returned to the uploader.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MergeReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub total_processed: usize,
    pub skip_reasons: Vec<String>,
}

fn validate_row(row: &ParsedHoldingRow, index: usize) -> std::result::Result<(), String> {
    if row.isin.trim().is_empty() {
        return Err(format!("row {}: missing ISIN", index + 1));
    }
    if row.company_name.trim().is_empty() {
        return Err(format!("row {}: missing company name", index + 1));
    }
    if row.total_quantity <= 0 {
        return Err(format!(
            "row {} ({}): quantity must be positive, got {}",
            index + 1,
            row.company_name.trim(),
            row.total_quantity
        ));
    }
    Ok(())
}

/// Builds a merge plan against the user's existing holdings.
///
/// Rows are keyed by `(isin, client_id)`. A key already in the database
/// becomes an update of that row; a new key becomes an insert. When the
/// upload itself repeats a key, the first occurrence wins and the rest are
/// skipped.
pub fn plan_merge(existing: &[Holding], rows: Vec<ParsedHoldingRow>, user_id: &str) -> MergePlan {
    let now = Utc::now().naive_utc();
    let existing_by_key: std::collections::HashMap<String, &Holding> = existing
        .iter()
        .map(|h| (h.composite_key(), h))
        .collect();

    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut plan = MergePlan::default();

    for (index, row) in rows.into_iter().enumerate() {
        if let Err(reason) = validate_row(&row, index) {
            plan.skipped.push(reason);
            continue;
        }

        let key = composite_key(&row.isin, row.client_id.as_deref());
        if !seen_keys.insert(key.clone()) {
            plan.skipped.push(format!(
                "row {} ({}): duplicate of an earlier row in this upload",
                index + 1,
                row.company_name.trim()
            ));
            continue;
        }

        match existing_by_key.get(&key) {
            Some(holding) => plan.updates.push(MergeUpdate {
                holding_id: holding.id.clone(),
                row,
            }),
            None => plan.creates.push(row.into_new_holding(user_id, now)),
        }
    }

    plan
}

pub struct IngestionService {
    repository: Arc<dyn HoldingsRepositoryTrait>,
    cache: Arc<dyn CacheStoreTrait>,
}

impl IngestionService {
    pub fn new(
        repository: Arc<dyn HoldingsRepositoryTrait>,
        cache: Arc<dyn CacheStoreTrait>,
    ) -> Self {
        Self { repository, cache }
    }

    /// Merges uploaded rows into the user's portfolio atomically and
    /// invalidates the dashboard cache when anything changed.
    pub async fn import_holdings(
        &self,
        user_id: &str,
        rows: Vec<ParsedHoldingRow>,
    ) -> Result<MergeReport> {
        let total = rows.len();
        let existing = self.repository.get_holdings_by_user(user_id)?;
        let plan = plan_merge(&existing, rows, user_id);

        let created = plan.creates.len();
        let updated = plan.updates.len();

        if created > 0 || updated > 0 {
            self.repository.apply_merge_plan(&plan)?;

            let key = dashboard_cache_key(user_id);
            if let Err(e) = self.cache.delete(&key).await {
                warn!("Failed to invalidate dashboard cache for {}: {}", user_id, e);
            }
        }

        info!(
            "Imported holdings for {}: {} created, {} updated, {} skipped",
            user_id,
            created,
            updated,
            plan.skipped.len()
        );

        let mut skip_reasons = plan.skipped;
        skip_reasons.truncate(MAX_REPORTED_FAILURES);

        Ok(MergeReport {
            created,
            updated,
            skipped: total - created - updated,
            total_processed: total,
            skip_reasons,
        })
    }
}
