/// Published scrip master reference dataset (all tradable instruments).
pub const SCRIP_MASTER_URL: &str =
    "https://margincalculator.angelbroking.com/OpenAPI_File/files/OpenAPIScripMaster.json";

/// Cache key for the raw scrip master payload.
pub const SCRIP_MASTER_CACHE_KEY: &str = "broker:scrip_master";

/// Scrip master cache TTL in seconds (24 hours).
pub const SCRIP_MASTER_TTL_SECS: u64 = 86_400;

/// Dashboard summary cache TTL in seconds (5 minutes).
pub const DASHBOARD_CACHE_TTL_SECS: u64 = 300;

/// Exchange segment for cash-equity listings.
pub const EQUITY_EXCHANGE: &str = "NSE";

/// Trading symbol suffix marking cash-equity instruments in the scrip master.
pub const EQUITY_SYMBOL_SUFFIX: &str = "-EQ";

/// Maximum tokens per batched quote request.
pub const QUOTE_BATCH_SIZE: usize = 50;

/// Maximum failure reasons carried in a refresh or merge report.
pub const MAX_REPORTED_FAILURES: usize = 5;

/// Sentinel used in the holdings composite key when no client id is present.
pub const NO_CLIENT_ID: &str = "none";

/// Dashboard cache key for a user.
pub fn dashboard_cache_key(user_id: &str) -> String {
    format!("dashboard:{}", user_id)
}
