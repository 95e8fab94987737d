use serde::Deserialize;

/// One instrument record from the published scrip master.
#[derive(Debug, Clone, Deserialize)]
pub struct ScripRecord {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub exch_seg: String,
}

/// Resolved instrument identity for a company name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub token: String,
    pub symbol: String,
    pub exchange: String,
}
