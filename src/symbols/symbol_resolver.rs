//! Maps free-text company names to exchange instrument tokens.
//!
//! Backed by the publisher's scrip master dataset: the raw payload lives in
//! the cache store for 24 hours, the derived name map lives in memory and is
//! rebuilt wholesale whenever it is empty.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};

use crate::cache::CacheStoreTrait;
use crate::constants::{
    EQUITY_EXCHANGE, EQUITY_SYMBOL_SUFFIX, SCRIP_MASTER_CACHE_KEY, SCRIP_MASTER_TTL_SECS,
    SCRIP_MASTER_URL,
};
use crate::symbols::{ScripRecord, SymbolEntry, SymbolError};

const REQUEST_TIMEOUT_SECS: u64 = 30;

lazy_static! {
    static ref PUNCTUATION_RE: Regex = Regex::new(r"[.,&]").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref CORPORATE_SUFFIX_RE: Regex =
        Regex::new(r"\s+(LTD|LIMITED|PVT|PRIVATE|CO|COMPANY|BANK)$").unwrap();
}

/// Normalizes a company name for matching against the scrip master.
///
/// Uppercases, strips punctuation, collapses whitespace and removes trailing
/// corporate suffix tokens until none remain, so the function is idempotent.
pub fn normalize_company_name(name: &str) -> String {
    let upper = name.to_uppercase();
    let no_punct = PUNCTUATION_RE.replace_all(&upper, "");
    let collapsed = WHITESPACE_RE.replace_all(&no_punct, " ");
    let mut result = collapsed.trim().to_string();
    loop {
        let stripped = CORPORATE_SUFFIX_RE.replace(&result, "").into_owned();
        if stripped == result {
            break;
        }
        result = stripped;
    }
    result
}

/// Builds the normalized-name lookup map from raw scrip records, keeping
/// only cash-equity listings on the target exchange.
fn build_name_map(records: &[ScripRecord]) -> HashMap<String, SymbolEntry> {
    let mut map = HashMap::new();
    for record in records {
        if record.exch_seg != EQUITY_EXCHANGE
            || !record.symbol.ends_with(EQUITY_SYMBOL_SUFFIX)
            || record.name.is_empty()
            || record.token.is_empty()
        {
            continue;
        }
        map.insert(
            normalize_company_name(&record.name),
            SymbolEntry {
                token: record.token.clone(),
                symbol: record.symbol.clone(),
                exchange: record.exch_seg.clone(),
            },
        );
    }
    map
}

/// Looks up a normalized name: exact match first, then a prefix match that
/// is accepted only when it is unambiguous.
fn find_in_map<'a>(
    map: &'a HashMap<String, SymbolEntry>,
    normalized: &str,
) -> Option<&'a SymbolEntry> {
    if let Some(entry) = map.get(normalized) {
        return Some(entry);
    }

    let mut candidates = map
        .iter()
        .filter(|(key, _)| key.starts_with(normalized));
    let first = candidates.next();
    if candidates.next().is_some() {
        warn!("Ambiguous prefix match for '{}', treating as not found", normalized);
        return None;
    }
    first.map(|(_, entry)| entry)
}

#[async_trait]
pub trait SymbolResolverTrait: Send + Sync {
    /// Resolves a company name to its instrument identity.
    /// `Ok(None)` means no (unambiguous) match; `Err` is an infrastructure fault.
    async fn resolve(&self, company_name: &str) -> Result<Option<SymbolEntry>, SymbolError>;
}

pub struct SymbolResolver {
    http: Client,
    cache: Arc<dyn CacheStoreTrait>,
    scrip_url: String,
    name_map: RwLock<HashMap<String, SymbolEntry>>,
    rebuild_lock: Mutex<()>,
}

impl SymbolResolver {
    pub fn new(cache: Arc<dyn CacheStoreTrait>) -> Self {
        Self::with_url(cache, SCRIP_MASTER_URL)
    }

    pub fn with_url(cache: Arc<dyn CacheStoreTrait>, scrip_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            cache,
            scrip_url: scrip_url.into(),
            name_map: RwLock::new(HashMap::new()),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Populates the in-memory map if it is empty. Only one rebuild runs at a
    /// time; concurrent callers wait on it instead of starting their own.
    async fn ensure_loaded(&self) -> Result<(), SymbolError> {
        if !self.name_map.read().await.is_empty() {
            return Ok(());
        }

        let _rebuild = self.rebuild_lock.lock().await;
        if !self.name_map.read().await.is_empty() {
            // Another caller finished the rebuild while we waited.
            return Ok(());
        }

        let records = self.load_scrip_master().await?;
        let map = build_name_map(&records);
        info!(
            "Processed {} {} equity scrips into memory",
            map.len(),
            EQUITY_EXCHANGE
        );
        *self.name_map.write().await = map;
        Ok(())
    }

    /// Loads the raw scrip master from the cache store, falling back to a
    /// fresh fetch from the publisher (cached for the TTL window).
    async fn load_scrip_master(&self) -> Result<Vec<ScripRecord>, SymbolError> {
        match self.cache.get(SCRIP_MASTER_CACHE_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<ScripRecord>>(&bytes) {
                Ok(records) => {
                    info!("Loading scrip master from cache");
                    return Ok(records);
                }
                Err(e) => {
                    warn!("Cached scrip master is corrupt, discarding: {}", e);
                    let _ = self.cache.delete(SCRIP_MASTER_CACHE_KEY).await;
                }
            },
            Ok(None) => {}
            Err(e) => warn!("Cache error while fetching scrip master: {}", e),
        }

        info!("Fetching fresh scrip master from {}", self.scrip_url);
        let response = self.http.get(&self.scrip_url).send().await?;
        if !response.status().is_success() {
            return Err(SymbolError::Fetch(format!(
                "Scrip master request failed: {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        let records: Vec<ScripRecord> =
            serde_json::from_slice(&bytes).map_err(|e| SymbolError::Parse(e.to_string()))?;

        if let Err(e) = self
            .cache
            .set_with_ttl(
                SCRIP_MASTER_CACHE_KEY,
                bytes.to_vec(),
                Duration::from_secs(SCRIP_MASTER_TTL_SECS),
            )
            .await
        {
            warn!("Failed to cache scrip master: {}", e);
        }

        Ok(records)
    }
}

#[async_trait]
impl SymbolResolverTrait for SymbolResolver {
    async fn resolve(&self, company_name: &str) -> Result<Option<SymbolEntry>, SymbolError> {
        self.ensure_loaded().await?;

        let normalized = normalize_company_name(company_name);
        if normalized.is_empty() {
            return Ok(None);
        }

        let map = self.name_map.read().await;
        match find_in_map(&map, &normalized) {
            Some(entry) => Ok(Some(entry.clone())),
            None => {
                warn!("No token found for company name: {}", company_name);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use proptest::prelude::*;

    fn scrip(token: &str, symbol: &str, name: &str, exch_seg: &str) -> ScripRecord {
        ScripRecord {
            token: token.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            exch_seg: exch_seg.to_string(),
        }
    }

    #[test]
    fn test_normalize_strips_suffix_and_punctuation() {
        assert_eq!(normalize_company_name("Reliance Industries Ltd."), "RELIANCE INDUSTRIES");
        assert_eq!(normalize_company_name("Tata Motors Limited"), "TATA MOTORS");
        assert_eq!(normalize_company_name("Shree Cement & Co."), "SHREE CEMENT");
        assert_eq!(normalize_company_name("  Infosys   Ltd  "), "INFOSYS");
    }

    #[test]
    fn test_normalize_strips_stacked_suffixes() {
        // Suffix stripping iterates: "X BANK LTD" -> "X BANK" -> "X".
        assert_eq!(normalize_company_name("Axis Bank Ltd"), "AXIS");
        // A lone suffix token is not stripped.
        assert_eq!(normalize_company_name("Bank"), "BANK");
    }

    #[test]
    fn test_normalize_idempotent() {
        for name in [
            "Reliance Industries Ltd.",
            "HDFC Bank Ltd",
            "L&T Finance Company",
            "  spaced   out  pvt  ",
        ] {
            let once = normalize_company_name(name);
            assert_eq!(normalize_company_name(&once), once);
        }
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(name in "[ -~]{0,40}") {
            let once = normalize_company_name(&name);
            prop_assert_eq!(normalize_company_name(&once), once.clone());
        }
    }

    #[test]
    fn test_build_name_map_filters_to_cash_equity() {
        let records = vec![
            scrip("2885", "RELIANCE-EQ", "Reliance Industries", "NSE"),
            scrip("11536", "TCS-EQ", "Tata Consultancy Services", "NSE"),
            scrip("53825", "RELIANCE25SEP", "Reliance Industries", "NFO"),
            scrip("999", "JUNK-BE", "Junk Trades", "NSE"),
            scrip("", "EMPTY-EQ", "Empty Token", "NSE"),
        ];
        let map = build_name_map(&records);
        assert_eq!(map.len(), 2);
        assert_eq!(map["RELIANCE INDUSTRIES"].token, "2885");
        assert_eq!(map["TATA CONSULTANCY SERVICES"].symbol, "TCS-EQ");
    }

    #[test]
    fn test_find_exact_match_wins_over_prefix() {
        let map = build_name_map(&[
            scrip("1", "TATA-EQ", "Tata", "NSE"),
            scrip("2", "TATAMOTORS-EQ", "Tata Motors", "NSE"),
        ]);
        assert_eq!(find_in_map(&map, "TATA").unwrap().token, "1");
    }

    #[test]
    fn test_find_unique_prefix_match() {
        let map = build_name_map(&[
            scrip("1", "INFY-EQ", "Infosys Technologies", "NSE"),
            scrip("2", "WIPRO-EQ", "Wipro", "NSE"),
        ]);
        assert_eq!(find_in_map(&map, "INFOSYS").unwrap().token, "1");
    }

    #[test]
    fn test_ambiguous_prefix_is_not_found() {
        let map = build_name_map(&[
            scrip("1", "TATAMOTORS-EQ", "Tata Motors", "NSE"),
            scrip("2", "TATASTEEL-EQ", "Tata Steel", "NSE"),
        ]);
        assert!(find_in_map(&map, "TATA").is_none());
    }

    #[tokio::test]
    async fn test_resolve_from_cached_scrip_master() {
        let cache = Arc::new(InMemoryCacheStore::new());
        let payload = serde_json::json!([
            {"token": "2885", "symbol": "RELIANCE-EQ", "name": "Reliance Industries", "exch_seg": "NSE"},
            {"token": "11536", "symbol": "TCS-EQ", "name": "Tata Consultancy Services", "exch_seg": "NSE"}
        ]);
        cache
            .set_with_ttl(
                SCRIP_MASTER_CACHE_KEY,
                serde_json::to_vec(&payload).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        // The URL is never hit because the cache satisfies the load.
        let resolver = SymbolResolver::with_url(cache, "http://127.0.0.1:9/unused");

        let entry = resolver.resolve("Reliance Industries Ltd").await.unwrap();
        assert_eq!(entry.unwrap().token, "2885");

        let missing = resolver.resolve("No Such Company").await.unwrap();
        assert!(missing.is_none());
    }
}
